//! Structural comparison of two revisions of a tree.
//!
//! Branches are matched by breadcrumb path (`/parent/child`), so two
//! siblings with the same text under the same parent collapse into one
//! entry, and a renamed branch shows up as a removal plus an addition.

use super::model::{breadcrumb, Branch, Tree};
use crate::error::{Result, WaypointError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const METADATA_KEYS: &[&str] = &["weight", "priority", "risk", "complexity", "cost", "recommended"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Declaration order is display order: removed, modified, added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Removed,
    Modified,
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub kind: ChangeKind,
    pub path: String,
    /// Shallow copy of the branch before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Branch>,
    /// Shallow copy of the branch after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<Branch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldChange>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    /// Approximate: the larger branch count minus the number of changes.
    pub unchanged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDiff {
    pub name: String,
    pub root_changed: bool,
    pub old_root: String,
    pub new_root: String,
    pub changes: Vec<Change>,
    pub stats: DiffStats,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        !self.root_changed && self.changes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

/// Map every breadcrumb to its branch. A later duplicate path replaces an
/// earlier one.
fn flatten(tree: &Tree) -> BTreeMap<String, &Branch> {
    tree.breadcrumbs().into_iter().collect()
}

/// Field-level differences between two branches at the same path.
pub fn field_changes(old: &Branch, new: &Branch) -> Vec<FieldChange> {
    let mut out = Vec::new();
    let mut push = |field: &str, a: Option<String>, b: Option<String>| {
        if a != b {
            out.push(FieldChange {
                field: field.to_string(),
                old_value: a,
                new_value: b,
            });
        }
    };

    push("text", Some(old.text.clone()), Some(new.text.clone()));
    push("outcome", old.outcome.clone(), new.outcome.clone());
    push("condition", old.condition.clone(), new.condition.clone());

    for key in METADATA_KEYS {
        let a = old.metadata.as_ref().and_then(|m| m.get(key));
        let b = new.metadata.as_ref().and_then(|m| m.get(key));
        push(&format!("metadata.{key}"), a, b);
    }
    out
}

pub fn diff(old: &Tree, new: &Tree) -> TreeDiff {
    let old_map = flatten(old);
    let new_map = flatten(new);
    let paths: BTreeSet<&String> = old_map.keys().chain(new_map.keys()).collect();

    let mut changes = Vec::new();
    for path in paths {
        match (old_map.get(path), new_map.get(path)) {
            (None, Some(b)) => changes.push(Change {
                kind: ChangeKind::Added,
                path: path.clone(),
                old: None,
                new: Some(b.shallow()),
                fields: Vec::new(),
            }),
            (Some(a), None) => changes.push(Change {
                kind: ChangeKind::Removed,
                path: path.clone(),
                old: Some(a.shallow()),
                new: None,
                fields: Vec::new(),
            }),
            (Some(a), Some(b)) => {
                let fields = field_changes(a, b);
                if !fields.is_empty() {
                    changes.push(Change {
                        kind: ChangeKind::Modified,
                        path: path.clone(),
                        old: Some(a.shallow()),
                        new: Some(b.shallow()),
                        fields,
                    });
                }
            }
            (None, None) => {}
        }
    }
    // Paths were visited in lexicographic order; the stable sort keeps it
    // within each kind.
    changes.sort_by_key(|c| c.kind);

    let count = |k: ChangeKind| changes.iter().filter(|c| c.kind == k).count();
    let added = count(ChangeKind::Added);
    let removed = count(ChangeKind::Removed);
    let modified = count(ChangeKind::Modified);
    let unchanged = old
        .branch_count()
        .max(new.branch_count())
        .saturating_sub(added + removed + modified);

    TreeDiff {
        name: new.name.clone(),
        root_changed: old.root != new.root,
        old_root: old.root.clone(),
        new_root: new.root.clone(),
        changes,
        stats: DiffStats {
            added,
            removed,
            modified,
            unchanged,
        },
    }
}

/// Diff two trees that may not have been found. A missing side is an error.
pub fn try_diff(old: Option<&Tree>, new: Option<&Tree>) -> Result<TreeDiff> {
    let old = old.ok_or(WaypointError::MissingTree("old"))?;
    let new = new.ok_or(WaypointError::MissingTree("new"))?;
    Ok(diff(old, new))
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootChange {
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    Add {
        path: String,
        value: Branch,
    },
    Remove {
        path: String,
        old_value: Branch,
    },
    Replace {
        path: String,
        old_value: Branch,
        new_value: Branch,
    },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Remove { path, .. } | PatchOp::Replace { path, .. } => {
                path
            }
        }
    }
}

/// Forward patch turning the old revision of a diff into the new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_change: Option<RootChange>,
    pub operations: Vec<PatchOp>,
}

impl Patch {
    pub fn from_diff(diff: &TreeDiff) -> Self {
        let root_change = diff.root_changed.then(|| RootChange {
            old: diff.old_root.clone(),
            new: diff.new_root.clone(),
        });
        let operations = diff
            .changes
            .iter()
            .filter_map(|c| match (c.kind, &c.old, &c.new) {
                (ChangeKind::Added, _, Some(new)) => Some(PatchOp::Add {
                    path: c.path.clone(),
                    value: new.clone(),
                }),
                (ChangeKind::Removed, Some(old), _) => Some(PatchOp::Remove {
                    path: c.path.clone(),
                    old_value: old.clone(),
                }),
                (ChangeKind::Modified, Some(old), Some(new)) => Some(PatchOp::Replace {
                    path: c.path.clone(),
                    old_value: old.clone(),
                    new_value: new.clone(),
                }),
                _ => None,
            })
            .collect();
        Self {
            root_change,
            operations,
        }
    }
}

fn subtree_contains(branches: &[Branch], parent: &str, target: &str) -> bool {
    branches.iter().any(|b| {
        let path = breadcrumb(parent, &b.text);
        path == target || subtree_contains(&b.children, &path, target)
    })
}

/// The sibling list holding the branch at `target`, and its index.
fn locate<'a>(
    branches: &'a mut Vec<Branch>,
    parent: &str,
    target: &str,
) -> Option<(&'a mut Vec<Branch>, usize)> {
    if let Some(i) = branches
        .iter()
        .position(|b| breadcrumb(parent, &b.text) == target)
    {
        return Some((branches, i));
    }
    let i = branches.iter().position(|b| {
        let path = breadcrumb(parent, &b.text);
        target.starts_with(&format!("{path}/")) && subtree_contains(&b.children, &path, target)
    })?;
    let path = breadcrumb(parent, &branches[i].text);
    locate(&mut branches[i].children, &path, target)
}

/// Apply a patch to a copy of `tree`. Removals run deepest first, then
/// replacements, then additions shallowest first so parents exist before
/// their children. Added branches are appended after existing siblings.
pub fn apply_patch(tree: &Tree, patch: &Patch) -> Result<Tree> {
    let mut out = tree.clone();
    if let Some(rc) = &patch.root_change {
        out.root = rc.new.clone();
    }

    let mut removes: Vec<&str> = Vec::new();
    let mut replaces: Vec<(&str, &Branch)> = Vec::new();
    let mut adds: Vec<(&str, &Branch)> = Vec::new();
    for op in &patch.operations {
        match op {
            PatchOp::Remove { path, .. } => removes.push(path.as_str()),
            PatchOp::Replace {
                path, new_value, ..
            } => replaces.push((path.as_str(), new_value)),
            PatchOp::Add { path, value } => adds.push((path.as_str(), value)),
        }
    }
    removes.sort_by_key(|p| std::cmp::Reverse(p.len()));
    adds.sort_by_key(|(p, _)| p.len());

    for path in removes {
        // An ancestor removal may already have taken this branch with it.
        if let Some((siblings, i)) = locate(&mut out.branches, "", path) {
            siblings.remove(i);
        }
    }

    for (path, value) in replaces {
        let (siblings, i) = locate(&mut out.branches, "", path)
            .ok_or_else(|| WaypointError::PatchTarget(path.to_string()))?;
        let current = &mut siblings[i];
        current.text = value.text.clone();
        current.condition = value.condition.clone();
        current.metadata = value.metadata.clone();
        current.outcome = value.outcome.clone();
    }

    for (path, value) in adds {
        let parent_path = path
            .strip_suffix(&format!("/{}", value.text))
            .ok_or_else(|| WaypointError::PatchTarget(path.to_string()))?;
        let mut branch = value.shallow();
        if parent_path.is_empty() {
            branch.level = 1;
            out.branches.push(branch);
            continue;
        }
        let (siblings, i) = locate(&mut out.branches, "", parent_path)
            .ok_or_else(|| WaypointError::PatchTarget(path.to_string()))?;
        let parent = &mut siblings[i];
        branch.level = parent.level + 1;
        parent.children.push(branch);
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::model::Metadata;

    fn leaf(text: &str) -> Branch {
        Branch::new(text)
    }

    fn sample() -> Tree {
        Tree::new(
            "Database",
            "Which database?",
            vec![
                Branch::new("SQL").with_children(vec![
                    leaf("PostgreSQL").with_outcome("Robust"),
                    leaf("MySQL"),
                ]),
                leaf("NoSQL"),
            ],
        )
    }

    #[test]
    fn diff_with_itself_is_empty() {
        let t = sample();
        let d = diff(&t, &t);
        assert!(d.changes.is_empty());
        assert!(!d.root_changed);
        assert!(d.is_empty());
        assert_eq!(d.stats.unchanged, 4);
    }

    #[test]
    fn removed_and_added_are_reported_once() {
        let t1 = Tree::new("T", "Q?", vec![leaf("A"), leaf("B")]);
        let t2 = Tree::new("T", "Q?", vec![leaf("A"), leaf("C")]);
        let d = diff(&t1, &t2);
        assert_eq!(d.changes.len(), 2);
        assert_eq!(d.changes[0].kind, ChangeKind::Removed);
        assert_eq!(d.changes[0].path, "/B");
        assert_eq!(d.changes[1].kind, ChangeKind::Added);
        assert_eq!(d.changes[1].path, "/C");
        assert_eq!(d.stats.modified, 0);
        assert_eq!(d.stats.unchanged, 0);
    }

    #[test]
    fn modified_fields_are_listed() {
        let old = sample();
        let mut new = sample();
        new.root = "Which datastore?".to_string();
        new.branches[0].children[0].outcome = Some("Battle tested".to_string());
        new.branches[0].children[0].metadata = Some(Metadata {
            weight: Some(9),
            ..Default::default()
        });
        let d = diff(&old, &new);
        assert!(d.root_changed);
        assert_eq!(d.changes.len(), 1);
        let change = &d.changes[0];
        assert_eq!(change.kind, ChangeKind::Modified);
        assert_eq!(change.path, "/SQL/PostgreSQL");
        let fields: Vec<&str> = change.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["outcome", "metadata.weight"]);
        assert_eq!(change.fields[1].old_value, None);
        assert_eq!(change.fields[1].new_value.as_deref(), Some("9"));
    }

    #[test]
    fn changes_sorted_removed_modified_added() {
        let old = Tree::new("T", "Q", vec![leaf("Z"), leaf("M"), leaf("B")]);
        let new = Tree::new(
            "T",
            "Q",
            vec![leaf("A"), leaf("M").with_outcome("changed"), leaf("C")],
        );
        let d = diff(&old, &new);
        let order: Vec<(ChangeKind, &str)> =
            d.changes.iter().map(|c| (c.kind, c.path.as_str())).collect();
        assert_eq!(
            order,
            vec![
                (ChangeKind::Removed, "/B"),
                (ChangeKind::Removed, "/Z"),
                (ChangeKind::Modified, "/M"),
                (ChangeKind::Added, "/A"),
                (ChangeKind::Added, "/C"),
            ]
        );
    }

    #[test]
    fn same_text_siblings_collapse() {
        // Known limitation: duplicate breadcrumbs are a single diff entry.
        let old = Tree::new("T", "Q", vec![leaf("Dup"), leaf("Dup")]);
        let new = Tree::new("T", "Q", vec![leaf("Dup")]);
        let d = diff(&old, &new);
        assert!(d.changes.is_empty());
        assert_eq!(d.stats.unchanged, 2);
    }

    #[test]
    fn try_diff_requires_both_trees() {
        let t = sample();
        assert!(matches!(
            try_diff(None, Some(&t)),
            Err(WaypointError::MissingTree("old"))
        ));
        assert!(matches!(
            try_diff(Some(&t), None),
            Err(WaypointError::MissingTree("new"))
        ));
        assert!(try_diff(Some(&t), Some(&t)).unwrap().is_empty());
    }

    #[test]
    fn patch_reproduces_new_revision() {
        let old = sample();
        let new = Tree::new(
            "Database",
            "Which datastore?",
            vec![
                Branch::new("SQL").with_children(vec![
                    leaf("PostgreSQL").with_outcome("Battle tested"),
                    leaf("SQLite"),
                ]),
                leaf("NoSQL"),
                Branch::new("Graph").with_children(vec![leaf("Neo4j")]),
            ],
        );
        let patch = Patch::from_diff(&diff(&old, &new));
        assert_eq!(
            patch.root_change,
            Some(RootChange {
                old: "Which database?".to_string(),
                new: "Which datastore?".to_string()
            })
        );
        let ops: Vec<&str> = patch.operations.iter().map(|o| o.path()).collect();
        assert_eq!(
            ops,
            vec!["/SQL/MySQL", "/SQL/PostgreSQL", "/Graph", "/Graph/Neo4j", "/SQL/SQLite"]
        );

        let patched = apply_patch(&old, &patch).unwrap();
        assert_eq!(patched, new);
        assert!(diff(&patched, &new).is_empty());
    }

    #[test]
    fn patch_ops_serialize_with_op_tag() {
        let op = PatchOp::Remove {
            path: "/A".to_string(),
            old_value: leaf("A"),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"op\":\"remove\""));
        assert!(json.contains("\"old_value\""));
    }

    #[test]
    fn patch_with_unknown_target_fails() {
        let patch = Patch {
            root_change: None,
            operations: vec![PatchOp::Add {
                path: "/Missing/Child".to_string(),
                value: leaf("Child"),
            }],
        };
        assert!(matches!(
            apply_patch(&sample(), &patch),
            Err(WaypointError::PatchTarget(_))
        ));
    }
}
