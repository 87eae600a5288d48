use crate::error::{Result, WaypointError};
use crate::paths;
use crate::tree::{is_identifier, ValidationRules};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ValidationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Treat warnings as failures when the CLI is not given `--strict`.
    #[serde(default)]
    pub strict: bool,
    #[serde(default = "default_min_weight")]
    pub min_weight: i64,
    #[serde(default = "default_max_weight")]
    pub max_weight: i64,
}

fn default_min_weight() -> i64 {
    1
}

fn default_max_weight() -> i64 {
    10
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict: false,
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
        }
    }
}

impl ValidationConfig {
    pub fn rules(&self) -> ValidationRules {
        ValidationRules {
            min_weight: self.min_weight,
            max_weight: self.max_weight,
        }
    }
}

// ---------------------------------------------------------------------------
// ContextConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Files scanned for project keywords, relative to the root.
    #[serde(default = "default_description_files")]
    pub description_files: Vec<String>,
    /// Flags forced after detection.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, bool>,
}

fn default_description_files() -> Vec<String> {
    paths::DEFAULT_DESCRIPTION_FILES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            description_files: default_description_files(),
            overrides: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            validation: ValidationConfig::default(),
            context: ContextConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(WaypointError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load the config, or fall back to defaults named after the root
    /// directory when the project was never initialized.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(WaypointError::NotInitialized) => {
                let name = root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "project".to_string());
                Ok(Self::new(name))
            }
            other => other,
        }
    }

    /// Write a default config unless one already exists. Returns true if
    /// a file was written.
    pub fn init(root: &Path, project_name: &str) -> Result<bool> {
        let data = serde_yaml::to_string(&Self::new(project_name))?;
        crate::io::write_if_missing(&paths::config_path(root), data.as_bytes())
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.project.name.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "project.name is empty".to_string(),
            });
        }

        if self.validation.min_weight > self.validation.max_weight {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "validation.min_weight ({}) is greater than validation.max_weight ({})",
                    self.validation.min_weight, self.validation.max_weight
                ),
            });
        }

        for key in self.context.overrides.keys() {
            if !is_identifier(key) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "context override '{key}' is not a valid condition identifier"
                    ),
                });
            }
        }

        if self.context.description_files.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "context.description_files is empty; keyword detection is disabled"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
