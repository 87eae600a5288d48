use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const WAYPOINT_DIR: &str = ".waypoint";
pub const CONFIG_FILE: &str = ".waypoint/config.yaml";
pub const DECISIONS_FILE: &str = ".waypoint/decisions.jsonl";

/// Project description files scanned by the context loader when the config
/// does not override them.
pub const DEFAULT_DESCRIPTION_FILES: &[&str] = &["README.md", "CLAUDE.md", "PROJECT.md"];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn waypoint_dir(root: &Path) -> PathBuf {
    root.join(WAYPOINT_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn decisions_path(root: &Path) -> PathBuf {
    root.join(DECISIONS_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.waypoint/config.yaml")
        );
        assert_eq!(
            decisions_path(root),
            PathBuf::from("/tmp/proj/.waypoint/decisions.jsonl")
        );
        assert_eq!(waypoint_dir(root), PathBuf::from("/tmp/proj/.waypoint"));
    }
}
