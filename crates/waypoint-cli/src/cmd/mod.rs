pub mod config;
pub mod context;
pub mod decision;
pub mod eval;
pub mod init;
pub mod tree;

use anyhow::Context as _;
use std::path::Path;
use waypoint_core::context::parse_context_entry;
use waypoint_core::tree::{parse_document, Tree};
use waypoint_core::WaypointError;

/// Read a markdown file and parse every decision tree in it.
pub fn load_trees(file: &Path) -> anyhow::Result<Vec<Tree>> {
    let markdown = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    Ok(parse_document(&markdown))
}

/// Select one tree by name, or the only tree when no name is given.
pub fn pick_tree(trees: Vec<Tree>, name: Option<&str>, file: &Path) -> anyhow::Result<Tree> {
    match name {
        Some(n) => trees
            .into_iter()
            .find(|t| t.name == n)
            .ok_or_else(|| WaypointError::TreeNotFound(n.to_string()))
            .with_context(|| format!("failed to select tree from {}", file.display())),
        None => {
            let mut trees = trees;
            match trees.len() {
                0 => anyhow::bail!("no decision trees found in {}", file.display()),
                1 => Ok(trees.remove(0)),
                _ => {
                    let names: Vec<&str> = trees.iter().map(|t| t.name.as_str()).collect();
                    anyhow::bail!(
                        "{} contains {} trees; pick one with --name ({})",
                        file.display(),
                        trees.len(),
                        names.join(", ")
                    )
                }
            }
        }
    }
}

/// Parse repeated `--set key=value` arguments.
pub fn parse_sets(sets: &[String]) -> anyhow::Result<Vec<(String, bool)>> {
    sets.iter()
        .map(|s| parse_context_entry(s).map_err(anyhow::Error::from))
        .collect()
}
