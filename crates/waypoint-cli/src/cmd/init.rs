use anyhow::Context;
use std::path::Path;
use waypoint_core::{config::Config, io, paths};

pub fn run(root: &Path) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    println!("Initializing waypoint in: {}", root.display());

    let dir = paths::waypoint_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let created = Config::init(root, &project_name).context("failed to write config.yaml")?;
    let status = if created { "created:" } else { "exists: " };
    println!("  {status} {}", paths::CONFIG_FILE);

    Ok(())
}
