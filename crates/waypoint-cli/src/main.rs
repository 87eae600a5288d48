mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, decision::DecisionSubcommand, tree::TreeSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "waypoint",
    about = "Parse, check, compare and evaluate decision trees written in markdown",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .waypoint/ or .git/)
    #[arg(long, global = true, env = "WAYPOINT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize waypoint in the current project
    Init,

    /// Inspect, check and compare decision trees in a markdown file
    Tree {
        #[command(subcommand)]
        subcommand: TreeSubcommand,
    },

    /// Evaluate a condition expression against the project context
    Eval {
        /// Expression such as "has_api AND NOT legacy"
        expr: String,
        /// Context assignment key=true|false (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Start from the detected project context instead of an empty one
        #[arg(long)]
        detect: bool,
    },

    /// Show the detected project context
    Context {
        /// Context assignment key=true|false (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Record and review decisions taken from trees
    Decision {
        #[command(subcommand)]
        subcommand: DecisionSubcommand,
    },

    /// Inspect the project config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Tree { subcommand } => cmd::tree::run(&root, subcommand, cli.json),
        Commands::Eval { expr, set, detect } => cmd::eval::run(&root, &expr, &set, detect, cli.json),
        Commands::Context { set } => cmd::context::run(&root, &set, cli.json),
        Commands::Decision { subcommand } => cmd::decision::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
