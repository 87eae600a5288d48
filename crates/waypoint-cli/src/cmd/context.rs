use crate::output::{print_json, print_table};
use anyhow::Context as _;
use std::path::Path;
use waypoint_core::config::Config;
use waypoint_core::context::ProjectContext;

/// Detected project context with config overrides and `--set` applied.
pub fn resolve(root: &Path, sets: &[String]) -> anyhow::Result<ProjectContext> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let overrides = super::parse_sets(sets)?;
    Ok(ProjectContext::detect(root, &config.context).with_overrides(overrides))
}

pub fn run(root: &Path, sets: &[String], json: bool) -> anyhow::Result<()> {
    let ctx = resolve(root, sets)?;
    if json {
        return print_json(&ctx.flags);
    }
    let rows = ctx
        .flags
        .iter()
        .map(|(k, v)| vec![k.clone(), v.to_string()])
        .collect();
    print_table(&["FLAG", "VALUE"], rows);
    Ok(())
}
