use super::{load_trees, pick_tree};
use crate::output::{print_json, print_table};
use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use waypoint_core::decision::{DecisionFilter, DecisionPatch, DecisionRecord, DecisionStore, JsonlStore};

#[derive(Subcommand)]
pub enum DecisionSubcommand {
    /// Record the branch chosen in a tree
    Record {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        /// Breadcrumb of the chosen branch, e.g. /SQL/PostgreSQL
        #[arg(long)]
        path: String,
        #[arg(long)]
        rationale: Option<String>,
        /// Context assignment key=true|false (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// List recorded decisions
    List {
        #[arg(long)]
        tree: Option<String>,
        /// Only decisions at or below this breadcrumb
        #[arg(long)]
        prefix: Option<String>,
        /// Only decisions at or after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },

    /// Show one decision
    Show { id: String },

    /// Amend a recorded decision
    Update {
        id: String,
        #[arg(long)]
        rationale: Option<String>,
        #[arg(long)]
        outcome: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: DecisionSubcommand, json: bool) -> anyhow::Result<()> {
    let mut store = JsonlStore::at_root(root);
    match subcmd {
        DecisionSubcommand::Record {
            file,
            name,
            path,
            rationale,
            set,
        } => record(root, &mut store, &file, name.as_deref(), &path, rationale, &set, json),
        DecisionSubcommand::List {
            tree,
            prefix,
            since,
        } => list(
            &store,
            &DecisionFilter {
                tree_name: tree,
                path_prefix: prefix,
                since,
            },
            json,
        ),
        DecisionSubcommand::Show { id } => {
            let record = store.get(&id)?;
            if json {
                return print_json(&record);
            }
            print_record(&record);
            Ok(())
        }
        DecisionSubcommand::Update {
            id,
            rationale,
            outcome,
        } => {
            if rationale.is_none() && outcome.is_none() {
                anyhow::bail!("nothing to update: pass --rationale and/or --outcome");
            }
            let updated = store
                .update(&id, &DecisionPatch { rationale, outcome })
                .context("failed to update decision")?;
            if json {
                return print_json(&updated);
            }
            println!("Updated decision {}.", updated.id);
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn record(
    root: &Path,
    store: &mut JsonlStore,
    file: &Path,
    name: Option<&str>,
    path: &str,
    rationale: Option<String>,
    sets: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let tree = pick_tree(load_trees(file)?, name, file)?;
    let selection = tree
        .select(path)
        .with_context(|| format!("no branch at '{path}' in tree '{}'", tree.name))?;
    let ctx = super::context::resolve(root, sets)?;

    let record = DecisionRecord::from_selection(selection, ctx.flags, rationale);
    store
        .append(record.clone())
        .context("failed to write decision record")?;

    if json {
        return print_json(&record);
    }
    println!("Recorded decision {} ({} {})", record.id, record.tree_name, record.path());
    Ok(())
}

fn list(store: &JsonlStore, filter: &DecisionFilter, json: bool) -> anyhow::Result<()> {
    let records = store.query(filter)?;
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No decisions recorded.");
        return Ok(());
    }
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.id.clone(),
                r.tree_name.clone(),
                r.path(),
                r.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "TREE", "PATH", "WHEN"], rows);
    Ok(())
}

fn print_record(r: &DecisionRecord) {
    println!("ID:        {}", r.id);
    println!("Tree:      {}", r.tree_name);
    println!("Path:      {}", r.path());
    if let Some(o) = &r.outcome {
        println!("Outcome:   {o}");
    }
    if let Some(rationale) = &r.rationale {
        println!("Rationale: {rationale}");
    }
    println!("When:      {}", r.timestamp.to_rfc3339());
    let enabled: Vec<&str> = r
        .context
        .iter()
        .filter(|(_, v)| **v)
        .map(|(k, _)| k.as_str())
        .collect();
    if !enabled.is_empty() {
        println!("Context:   {}", enabled.join(", "));
    }
}
