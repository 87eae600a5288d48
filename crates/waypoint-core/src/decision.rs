//! Decision records: which branch of which tree was chosen, under what
//! context, and why.

use crate::context::ContextMap;
use crate::error::{Result, WaypointError};
use crate::io;
use crate::paths;
use crate::tree::{Metadata, Selection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// DecisionRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: String,
    pub tree_name: String,
    pub selected_path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub context: ContextMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn from_selection(selection: Selection, context: ContextMap, rationale: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tree_name: selection.tree_name,
            selected_path: selection.selected_path,
            outcome: selection.outcome,
            metadata: selection.metadata,
            context,
            rationale,
            timestamp: Utc::now(),
        }
    }

    /// Breadcrumb form of the selected path (`/A/B`).
    pub fn path(&self) -> String {
        self.selected_path
            .iter()
            .fold(String::new(), |acc, p| crate::tree::model::breadcrumb(&acc, p))
    }
}

// ---------------------------------------------------------------------------
// DecisionFilter / DecisionPatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct DecisionFilter {
    pub tree_name: Option<String>,
    /// Breadcrumb prefix, matched on whole path segments.
    pub path_prefix: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

impl DecisionFilter {
    pub fn matches(&self, record: &DecisionRecord) -> bool {
        if let Some(name) = &self.tree_name {
            if &record.tree_name != name {
                return false;
            }
        }
        if let Some(prefix) = &self.path_prefix {
            let prefix = prefix.trim_end_matches('/');
            let prefix = if prefix.starts_with('/') || prefix.is_empty() {
                prefix.to_string()
            } else {
                format!("/{prefix}")
            };
            let path = record.path();
            if !(path == prefix || path.starts_with(&format!("{prefix}/"))) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.timestamp < since {
                return false;
            }
        }
        true
    }
}

/// Fields a record may change after it was written. `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default)]
pub struct DecisionPatch {
    pub rationale: Option<String>,
    pub outcome: Option<String>,
}

impl DecisionPatch {
    fn apply(&self, record: &mut DecisionRecord) {
        if let Some(r) = &self.rationale {
            record.rationale = Some(r.clone());
        }
        if let Some(o) = &self.outcome {
            record.outcome = Some(o.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// DecisionStore
// ---------------------------------------------------------------------------

pub trait DecisionStore {
    fn append(&mut self, record: DecisionRecord) -> Result<()>;

    /// Matching records in insertion order.
    fn query(&self, filter: &DecisionFilter) -> Result<Vec<DecisionRecord>>;

    fn update(&mut self, id: &str, patch: &DecisionPatch) -> Result<DecisionRecord>;

    fn get(&self, id: &str) -> Result<DecisionRecord> {
        self.query(&DecisionFilter::default())?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| WaypointError::DecisionNotFound(id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<DecisionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionStore for MemoryStore {
    fn append(&mut self, record: DecisionRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }

    fn query(&self, filter: &DecisionFilter) -> Result<Vec<DecisionRecord>> {
        Ok(self.records.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    fn update(&mut self, id: &str, patch: &DecisionPatch) -> Result<DecisionRecord> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| WaypointError::DecisionNotFound(id.to_string()))?;
        patch.apply(record);
        Ok(record.clone())
    }
}

// ---------------------------------------------------------------------------
// JsonlStore
// ---------------------------------------------------------------------------

/// One JSON record per line. Appends are a single `O_APPEND` write; updates
/// rewrite the whole file atomically. Both hold an exclusive lock on a
/// sidecar `<file>.lock`, so an append never lands between an update's read
/// and its rename. Readers see either the old or the new file.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store at `.waypoint/decisions.jsonl` under `root`.
    pub fn at_root(root: &Path) -> Self {
        Self::new(paths::decisions_path(root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn load(&self) -> Result<Vec<DecisionRecord>> {
        let Some(data) = io::read_optional(&self.path)? else {
            return Ok(Vec::new());
        };
        let mut records = Vec::new();
        for (n, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<DecisionRecord>(line) {
                Ok(r) => records.push(r),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = n + 1,
                    error = %e,
                    "skipping malformed decision record"
                ),
            }
        }
        Ok(records)
    }
}

impl DecisionStore for JsonlStore {
    fn append(&mut self, record: DecisionRecord) -> Result<()> {
        let line = serde_json::to_string(&record)?;
        let mut lock = io::lock_file(&self.lock_path())?;
        let _guard = lock.write()?;
        io::append_line(&self.path, &line)?;
        tracing::debug!(id = %record.id, tree = %record.tree_name, "appended decision record");
        Ok(())
    }

    fn query(&self, filter: &DecisionFilter) -> Result<Vec<DecisionRecord>> {
        Ok(self.load()?.into_iter().filter(|r| filter.matches(r)).collect())
    }

    fn update(&mut self, id: &str, patch: &DecisionPatch) -> Result<DecisionRecord> {
        let mut lock = io::lock_file(&self.lock_path())?;
        let _guard = lock.write()?;
        let mut records = self.load()?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| WaypointError::DecisionNotFound(id.to_string()))?;
        patch.apply(record);
        let updated = record.clone();

        let mut data = String::new();
        for r in &records {
            data.push_str(&serde_json::to_string(r)?);
            data.push('\n');
        }
        io::atomic_write(&self.path, data.as_bytes())?;
        tracing::debug!(id = %id, "updated decision record");
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn record(tree: &str, path: &[&str]) -> DecisionRecord {
        let selection = Selection {
            tree_name: tree.to_string(),
            selected_path: path.iter().map(|s| s.to_string()).collect(),
            outcome: Some("chosen".to_string()),
            metadata: None,
        };
        let mut ctx = ContextMap::new();
        ctx.insert("has_api".to_string(), true);
        DecisionRecord::from_selection(selection, ctx, None)
    }

    fn exercise(store: &mut dyn DecisionStore) {
        let a = record("Database", &["SQL", "PostgreSQL"]);
        let b = record("Database", &["NoSQL"]);
        let c = record("Hosting", &["Cloud"]);
        store.append(a.clone()).unwrap();
        store.append(b.clone()).unwrap();
        store.append(c.clone()).unwrap();

        let all = store.query(&DecisionFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, a.id);

        let db = store
            .query(&DecisionFilter {
                tree_name: Some("Database".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(db.len(), 2);

        let sql = store
            .query(&DecisionFilter {
                path_prefix: Some("SQL".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(sql.len(), 1);
        assert_eq!(sql[0].selected_path, vec!["SQL", "PostgreSQL"]);

        let future = store
            .query(&DecisionFilter {
                since: Some(Utc::now() + Duration::hours(1)),
                ..Default::default()
            })
            .unwrap();
        assert!(future.is_empty());

        let updated = store
            .update(
                &b.id,
                &DecisionPatch {
                    rationale: Some("schema changes weekly".to_string()),
                    outcome: None,
                },
            )
            .unwrap();
        assert_eq!(updated.rationale.as_deref(), Some("schema changes weekly"));
        assert_eq!(updated.outcome.as_deref(), Some("chosen"));
        assert_eq!(
            store.get(&b.id).unwrap().rationale.as_deref(),
            Some("schema changes weekly")
        );

        assert!(matches!(
            store.update("missing", &DecisionPatch::default()),
            Err(WaypointError::DecisionNotFound(_))
        ));
        assert!(store.get("missing").is_err());
    }

    #[test]
    fn memory_store_behaviour() {
        exercise(&mut MemoryStore::new());
    }

    #[test]
    fn jsonl_store_behaviour() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonlStore::at_root(dir.path());
        exercise(&mut store);
        let data = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(data.lines().count(), 3);
    }

    #[test]
    fn jsonl_store_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonlStore::at_root(dir.path());
        store.append(record("T", &["A"])).unwrap();
        io::append_line(store.path(), "{not json").unwrap();
        store.append(record("T", &["B"])).unwrap();
        assert_eq!(store.query(&DecisionFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn appends_racing_updates_are_kept() {
        const APPENDS: usize = 200;
        let dir = TempDir::new().unwrap();
        let mut store = JsonlStore::at_root(dir.path());
        let seed = record("T", &["Seed"]);
        store.append(seed.clone()).unwrap();

        let mut writer = store.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..APPENDS {
                let name = format!("B{i}");
                writer.append(record("T", &[name.as_str()])).unwrap();
            }
        });

        let mut n = 0;
        while !handle.is_finished() {
            store
                .update(
                    &seed.id,
                    &DecisionPatch {
                        rationale: Some(format!("pass {n}")),
                        outcome: None,
                    },
                )
                .unwrap();
            n += 1;
        }
        handle.join().unwrap();

        let all = store.query(&DecisionFilter::default()).unwrap();
        assert_eq!(all.len(), APPENDS + 1);
        assert!(all.iter().any(|r| r.id == seed.id));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonlStore::at_root(dir.path());
        assert!(store.query(&DecisionFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn prefix_matches_whole_segments() {
        let r = record("T", &["SQLite", "Embedded"]);
        let filter = DecisionFilter {
            path_prefix: Some("/SQL".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&r));
        assert_eq!(r.path(), "/SQLite/Embedded");
    }
}
