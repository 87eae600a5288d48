use super::{load_trees, pick_tree};
use crate::output::{print_json, print_report, print_table};
use anyhow::Context as _;
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use waypoint_core::config::Config;
use waypoint_core::tree::diff::{ChangeKind, Patch, TreeDiff};
use waypoint_core::tree::render::{self, ASCII_GLYPHS, BOX_GLYPHS};
use waypoint_core::tree::{filter_tree, lint, try_diff, validate_with, Tree, ValidationReport};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ShowFormat {
    /// Box-drawing tree
    Terminal,
    /// Plain ASCII tree
    Ascii,
    /// Re-parsable `## Decision Tree:` block
    Markdown,
    /// Mermaid flowchart
    Mermaid,
}

#[derive(Subcommand)]
pub enum TreeSubcommand {
    /// List the decision trees in a markdown file
    List { file: PathBuf },

    /// Render one tree
    Show {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum, default_value_t = ShowFormat::Terminal)]
        format: ShowFormat,
    },

    /// Check trees for structural and metadata problems
    Validate {
        file: PathBuf,
        /// Only this tree (default: every tree in the file)
        #[arg(long)]
        name: Option<String>,
        /// Fail on warnings as well as errors
        #[arg(long)]
        strict: bool,
    },

    /// Run best-practice checks over trees
    Lint {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        strict: bool,
    },

    /// Compare two revisions of a tree
    Diff {
        old: PathBuf,
        new: PathBuf,
        #[arg(long)]
        name: Option<String>,
        /// Emit the forward patch instead of the change list
        #[arg(long)]
        patch: bool,
    },

    /// Keep only the branches that apply to the project context
    Filter {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        /// Context assignment key=true|false (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        #[arg(long, value_enum, default_value_t = ShowFormat::Terminal)]
        format: ShowFormat,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: TreeSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TreeSubcommand::List { file } => list(&file, json),
        TreeSubcommand::Show { file, name, format } => show(&file, name.as_deref(), format, json),
        TreeSubcommand::Validate { file, name, strict } => {
            check(root, &file, name.as_deref(), strict, Check::Validate, json)
        }
        TreeSubcommand::Lint { file, name, strict } => {
            check(root, &file, name.as_deref(), strict, Check::Lint, json)
        }
        TreeSubcommand::Diff {
            old,
            new,
            name,
            patch,
        } => diff(&old, &new, name.as_deref(), patch, json),
        TreeSubcommand::Filter {
            file,
            name,
            set,
            format,
        } => filter(root, &file, name.as_deref(), &set, format, json),
    }
}

fn render_as(tree: &Tree, format: ShowFormat) -> String {
    match format {
        ShowFormat::Terminal => render::to_terminal(tree, BOX_GLYPHS),
        ShowFormat::Ascii => render::to_terminal(tree, ASCII_GLYPHS),
        ShowFormat::Markdown => render::to_markdown(tree),
        ShowFormat::Mermaid => render::to_mermaid(tree),
    }
}

// ---------------------------------------------------------------------------
// list / show
// ---------------------------------------------------------------------------

fn list(file: &Path, json: bool) -> anyhow::Result<()> {
    let trees = load_trees(file)?;
    if json {
        let items: Vec<_> = trees
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "root": t.root,
                    "branches": t.branch_count(),
                })
            })
            .collect();
        return print_json(&items);
    }
    if trees.is_empty() {
        println!("No decision trees in {}.", file.display());
        return Ok(());
    }
    let rows = trees
        .iter()
        .map(|t| vec![t.name.clone(), t.root.clone(), t.branch_count().to_string()])
        .collect();
    print_table(&["NAME", "ROOT", "BRANCHES"], rows);
    Ok(())
}

fn show(file: &Path, name: Option<&str>, format: ShowFormat, json: bool) -> anyhow::Result<()> {
    let tree = pick_tree(load_trees(file)?, name, file)?;
    if json {
        return print_json(&tree);
    }
    print!("{}", render_as(&tree, format));
    Ok(())
}

// ---------------------------------------------------------------------------
// validate / lint
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Check {
    Validate,
    Lint,
}

fn check(
    root: &Path,
    file: &Path,
    name: Option<&str>,
    strict: bool,
    kind: Check,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let strict = strict || config.validation.strict;
    let rules = config.validation.rules();

    let trees = load_trees(file)?;
    let trees = match name {
        Some(_) => vec![pick_tree(trees, name, file)?],
        None if trees.is_empty() => anyhow::bail!("no decision trees found in {}", file.display()),
        None => trees,
    };

    let reports: Vec<(String, ValidationReport)> = trees
        .iter()
        .map(|t| {
            let report = match kind {
                Check::Validate => validate_with(t, &rules),
                Check::Lint => lint(t),
            };
            (t.name.clone(), report)
        })
        .collect();
    let failed = reports.iter().filter(|(_, r)| !r.passes(strict)).count();

    if json {
        let items: Vec<_> = reports
            .iter()
            .map(|(name, report)| {
                serde_json::json!({
                    "name": name,
                    "passed": report.passes(strict),
                    "report": report,
                })
            })
            .collect();
        print_json(&items)?;
    } else {
        for (name, report) in &reports {
            print_report(name, report, report.passes(strict));
        }
    }

    if failed > 0 {
        let what = match kind {
            Check::Validate => "validation",
            Check::Lint => "lint",
        };
        anyhow::bail!("{what} failed for {failed} of {} tree(s)", reports.len());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

fn diff(old: &Path, new: &Path, name: Option<&str>, as_patch: bool, json: bool) -> anyhow::Result<()> {
    let (old_tree, new_tree) = match name {
        Some(n) => {
            let find = |trees: Vec<Tree>| trees.into_iter().find(|t| t.name == n);
            (find(load_trees(old)?), find(load_trees(new)?))
        }
        None => (
            Some(pick_tree(load_trees(old)?, None, old)?),
            Some(pick_tree(load_trees(new)?, None, new)?),
        ),
    };
    let result = try_diff(old_tree.as_ref(), new_tree.as_ref())
        .with_context(|| format!("tree '{}'", name.unwrap_or_default()))?;

    if as_patch {
        return print_json(&Patch::from_diff(&result));
    }
    if json {
        return print_json(&result);
    }
    print_diff(&result);
    Ok(())
}

fn print_diff(d: &TreeDiff) {
    if d.is_empty() {
        println!("{}: no changes", d.name);
        return;
    }
    println!("{}:", d.name);
    if d.root_changed {
        println!("  ~ root: {:?} -> {:?}", d.old_root, d.new_root);
    }
    for change in &d.changes {
        let sigil = match change.kind {
            ChangeKind::Removed => '-',
            ChangeKind::Modified => '~',
            ChangeKind::Added => '+',
        };
        println!("  {sigil} {}", change.path);
        for f in &change.fields {
            println!(
                "      {}: {} -> {}",
                f.field,
                f.old_value.as_deref().unwrap_or("(none)"),
                f.new_value.as_deref().unwrap_or("(none)")
            );
        }
    }
    let s = d.stats;
    println!(
        "  {} added, {} removed, {} modified, {} unchanged",
        s.added, s.removed, s.modified, s.unchanged
    );
}

// ---------------------------------------------------------------------------
// filter
// ---------------------------------------------------------------------------

fn filter(
    root: &Path,
    file: &Path,
    name: Option<&str>,
    sets: &[String],
    format: ShowFormat,
    json: bool,
) -> anyhow::Result<()> {
    let tree = pick_tree(load_trees(file)?, name, file)?;
    let ctx = super::context::resolve(root, sets)?;
    let filtered = filter_tree(&tree, &ctx.flags);
    tracing::debug!(
        tree = %tree.name,
        before = tree.branch_count(),
        after = filtered.branch_count(),
        "filtered tree by project context"
    );
    if json {
        return print_json(&filtered);
    }
    print!("{}", render_as(&filtered, format));
    Ok(())
}
