use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use waypoint_core::config::{Config, WarnLevel};

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective config
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    if json {
        return print_json(&config);
    }
    println!("Project:            {}", config.project.name);
    if let Some(desc) = &config.project.description {
        println!("Description:        {desc}");
    }
    println!("Strict validation:  {}", config.validation.strict);
    println!(
        "Weight range:       {}..={}",
        config.validation.min_weight, config.validation.max_weight
    );
    println!(
        "Description files:  {}",
        config.context.description_files.join(", ")
    );
    if !config.context.overrides.is_empty() {
        println!("Context overrides:");
        for (k, v) in &config.context.overrides {
            println!("  {k} = {v}");
        }
    }
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
