//! Project context detection: the boolean flags that decision tree
//! conditions are evaluated against.

use crate::config::ContextConfig;
use crate::error::{Result, WaypointError};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Flag name to value. Ordered so output is stable.
pub type ContextMap = BTreeMap<String, bool>;

/// Every flag [`ProjectContext::detect`] reports, present even when false.
pub const KNOWN_FLAGS: &[&str] = &[
    "has_api",
    "has_auth",
    "has_database",
    "has_docker",
    "has_frontend",
    "has_tests",
    "go",
    "javascript",
    "python",
    "rust",
    "typescript",
];

const TEST_DIRS: &[&str] = &["tests", "test", "__tests__", "spec"];
const DOCKER_FILES: &[&str] = &["Dockerfile", "docker-compose.yml", "docker-compose.yaml", "compose.yaml"];

static KEYWORD_RES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();

fn keyword_res() -> &'static [(&'static str, Regex)] {
    KEYWORD_RES.get_or_init(|| {
        [
            ("has_database", r"(?i)\b(database|postgres(ql)?|mysql|sqlite|mongodb|redis|sql)\b"),
            ("has_api", r"(?i)\b(api|rest|graphql|grpc|endpoint)s?\b"),
            ("has_auth", r"(?i)\b(auth|authentication|authorization|oauth2?|login|jwt)\b"),
            ("has_frontend", r"(?i)\b(frontend|react|vue|svelte|angular|ui)\b"),
        ]
        .into_iter()
        .map(|(flag, pattern)| (flag, Regex::new(pattern).unwrap()))
        .collect()
    })
}

/// Dependency names in a manifest that imply a keyword flag.
const DEPENDENCY_HINTS: &[(&str, &[&str])] = &[
    ("has_database", &["pg", "mysql2", "sqlite3", "mongoose", "prisma", "sqlx", "diesel", "rusqlite", "redb", "sqlalchemy", "psycopg2"]),
    ("has_api", &["express", "fastify", "axum", "actix-web", "warp", "flask", "fastapi", "django"]),
    ("has_auth", &["passport", "jsonwebtoken", "next-auth", "oauth2", "authlib"]),
    ("has_frontend", &["react", "vue", "svelte", "@angular/core", "next", "yew", "leptos"]),
];

// ---------------------------------------------------------------------------
// ProjectContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectContext {
    pub flags: ContextMap,
}

impl ProjectContext {
    /// Scan `root` for description files, manifests and well-known
    /// directories. Unreadable files are logged and skipped.
    pub fn detect(root: &Path, config: &ContextConfig) -> Self {
        let mut flags: ContextMap = KNOWN_FLAGS.iter().map(|f| (f.to_string(), false)).collect();

        for file in &config.description_files {
            if let Some(text) = read_lossy(&root.join(file)) {
                for (flag, re) in keyword_res() {
                    if re.is_match(&text) {
                        flags.insert(flag.to_string(), true);
                    }
                }
            }
        }

        let mut manifests: Vec<(&str, String)> = Vec::new();
        for (lang, file) in [
            ("javascript", "package.json"),
            ("rust", "Cargo.toml"),
            ("python", "requirements.txt"),
            ("python", "pyproject.toml"),
            ("go", "go.mod"),
        ] {
            if let Some(text) = read_lossy(&root.join(file)) {
                flags.insert(lang.to_string(), true);
                manifests.push((file, text));
            }
        }
        if root.join("tsconfig.json").is_file() {
            flags.insert("typescript".to_string(), true);
        }

        for (file, text) in &manifests {
            if *file == "package.json" && mentions_dependency(text, "typescript", true) {
                flags.insert("typescript".to_string(), true);
            }
            for (flag, deps) in DEPENDENCY_HINTS {
                if deps.iter().any(|d| mentions_dependency(text, d, *file == "package.json")) {
                    flags.insert(flag.to_string(), true);
                }
            }
        }

        if TEST_DIRS.iter().any(|d| root.join(d).is_dir()) {
            flags.insert("has_tests".to_string(), true);
        }
        if DOCKER_FILES.iter().any(|f| root.join(f).is_file()) {
            flags.insert("has_docker".to_string(), true);
        }

        for (key, value) in &config.overrides {
            flags.insert(key.clone(), *value);
        }

        tracing::debug!(
            root = %root.display(),
            enabled = flags.values().filter(|v| **v).count(),
            "detected project context"
        );
        Self { flags }
    }

    /// Apply `key=value` assignments on top of the detected flags.
    pub fn with_overrides<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, bool)>,
    {
        self.flags.extend(overrides);
        self
    }

    pub fn get(&self, key: &str) -> bool {
        self.flags.get(key).copied().unwrap_or(false)
    }
}

fn read_lossy(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    match std::fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read context file");
            None
        }
    }
}

/// Whether a manifest names `dep` as a dependency. JSON manifests quote
/// their keys; line-oriented manifests start a line with the name.
fn mentions_dependency(text: &str, dep: &str, quoted: bool) -> bool {
    if quoted {
        return text.contains(&format!("\"{dep}\""));
    }
    text.lines().any(|line| {
        let line = line.trim_start_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'');
        line.strip_prefix(dep).is_some_and(|rest| {
            rest.is_empty()
                || rest.starts_with(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        })
    })
}

/// Parse a CLI assignment such as `has_api=true`. A bare key means `true`.
pub fn parse_context_entry(raw: &str) -> Result<(String, bool)> {
    let invalid = || WaypointError::InvalidContextEntry(raw.to_string());
    let (key, value) = match raw.split_once('=') {
        Some((k, v)) => (k.trim(), v.trim()),
        None => (raw.trim(), "true"),
    };
    if key.is_empty() {
        return Err(invalid());
    }
    let value = match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => return Err(invalid()),
    };
    Ok((key.to_string(), value))
}
