use serde::{Deserialize, Serialize};

/// Reserved condition sentinel for the fallback branch of a conditional group.
pub const ELSE: &str = "ELSE";

/// Enum values accepted for `priority`, `risk`, `complexity` and `cost`.
pub const LEVEL_VALUES: &[&str] = &["high", "medium", "low"];

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Bracketed tags attached to a branch line.
///
/// Level fields are kept as strings so that hand-built or deserialized trees
/// can carry values outside `high|medium|low`; the validator reports those.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub recommended: bool,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// The four enum-valued fields, in tag order.
    pub fn level_fields(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("priority", self.priority.as_deref()),
            ("risk", self.risk.as_deref()),
            ("complexity", self.complexity.as_deref()),
            ("cost", self.cost.as_deref()),
        ]
    }

    /// Populated fields as `(key, value)` pairs in tag order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(w) = self.weight {
            out.push(("weight", w.to_string()));
        }
        for (key, value) in self.level_fields() {
            if let Some(v) = value {
                out.push((key, v.to_string()));
            }
        }
        if self.recommended {
            out.push(("recommended", "true".to_string()));
        }
        out
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

// ---------------------------------------------------------------------------
// Branch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub text: String,
    pub level: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default)]
    pub children: Vec<Branch>,
}

impl Branch {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: 1,
            condition: None,
            metadata: None,
            outcome: None,
            children: Vec::new(),
        }
    }

    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attach children, re-basing their levels one below this branch.
    pub fn with_children(mut self, children: Vec<Branch>) -> Self {
        self.children = children;
        let level = self.level;
        for child in &mut self.children {
            child.relevel(level + 1);
        }
        self
    }

    fn relevel(&mut self, level: usize) {
        self.level = level;
        for child in &mut self.children {
            child.relevel(level + 1);
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_else(&self) -> bool {
        self.condition.as_deref() == Some(ELSE)
    }

    /// The condition expression, if this branch has one that is not `ELSE`.
    pub fn guard(&self) -> Option<&str> {
        self.condition.as_deref().filter(|c| *c != ELSE)
    }

    pub fn is_recommended(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.recommended)
    }

    /// A copy of this branch without its subtree.
    pub fn shallow(&self) -> Branch {
        Branch {
            children: Vec::new(),
            ..self.clone()
        }
    }

    /// Label used in messages: the text, or the condition for bare wrappers.
    pub fn label(&self) -> String {
        if !self.text.is_empty() {
            return self.text.clone();
        }
        match &self.condition {
            Some(c) if c == ELSE => "[ELSE]".to_string(),
            Some(c) => format!("[IF: {c}]"),
            None => "(empty)".to_string(),
        }
    }
}

/// Breadcrumb key of a branch with `text` under the branch at `parent`.
/// Top-level branches have an empty parent, giving `/text`.
pub fn breadcrumb(parent: &str, text: &str) -> String {
    format!("{parent}/{text}")
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub name: String,
    pub root: String,
    #[serde(default)]
    pub branches: Vec<Branch>,
}

impl Tree {
    pub fn new(name: impl Into<String>, root: impl Into<String>, branches: Vec<Branch>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            branches,
        }
    }

    /// Total number of branches at every depth.
    pub fn branch_count(&self) -> usize {
        self.walk().len()
    }

    /// Pre-order traversal yielding `(depth, branch)`, depth 1 at top level.
    pub fn walk(&self) -> Vec<(usize, &Branch)> {
        fn go<'a>(branches: &'a [Branch], depth: usize, out: &mut Vec<(usize, &'a Branch)>) {
            for b in branches {
                out.push((depth, b));
                go(&b.children, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        go(&self.branches, 1, &mut out);
        out
    }

    /// Pre-order traversal yielding `(breadcrumb, branch)`.
    pub fn breadcrumbs(&self) -> Vec<(String, &Branch)> {
        fn go<'a>(branches: &'a [Branch], parent: &str, out: &mut Vec<(String, &'a Branch)>) {
            for b in branches {
                let path = breadcrumb(parent, &b.text);
                out.push((path.clone(), b));
                go(&b.children, &path, out);
            }
        }
        let mut out = Vec::new();
        go(&self.branches, "", &mut out);
        out
    }

    /// Resolve a breadcrumb (`/A/B`, leading slash optional) to the chain of
    /// branches from the top level down to the target.
    pub fn chain(&self, path: &str) -> Option<Vec<&Branch>> {
        fn go<'a>(
            branches: &'a [Branch],
            parent: &str,
            target: &str,
            chain: &mut Vec<&'a Branch>,
        ) -> bool {
            for b in branches {
                let path = breadcrumb(parent, &b.text);
                if !target.starts_with(&path) {
                    continue;
                }
                chain.push(b);
                if path == target || go(&b.children, &path, target, chain) {
                    return true;
                }
                chain.pop();
            }
            false
        }
        let target = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let mut chain = Vec::new();
        go(&self.branches, "", &target, &mut chain).then_some(chain)
    }

    pub fn find(&self, path: &str) -> Option<&Branch> {
        self.chain(path).and_then(|c| c.last().copied())
    }

    /// Build the selection tuple handed to a decision record store.
    pub fn select(&self, path: &str) -> Option<Selection> {
        let chain = self.chain(path)?;
        let target = chain.last()?;
        Some(Selection {
            tree_name: self.name.clone(),
            selected_path: chain.iter().map(|b| b.text.clone()).collect(),
            outcome: target.outcome.clone(),
            metadata: target.metadata.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// A user's choice of one branch, referencing the tree by name and the
/// branch by its text path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub tree_name: String,
    pub selected_path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        Tree::new(
            "Database",
            "Which database?",
            vec![
                Branch::new("SQL").with_children(vec![
                    Branch::new("PostgreSQL").with_outcome("Robust"),
                    Branch::new("MySQL"),
                ]),
                Branch::new("NoSQL"),
            ],
        )
    }

    #[test]
    fn walk_is_preorder_with_depth() {
        let tree = sample();
        let seen: Vec<(usize, &str)> = tree
            .walk()
            .into_iter()
            .map(|(d, b)| (d, b.text.as_str()))
            .collect();
        assert_eq!(
            seen,
            vec![(1, "SQL"), (2, "PostgreSQL"), (2, "MySQL"), (1, "NoSQL")]
        );
        assert_eq!(tree.branch_count(), 4);
    }

    #[test]
    fn with_children_relevels_subtree() {
        let tree = sample();
        assert_eq!(tree.branches[0].level, 1);
        assert_eq!(tree.branches[0].children[0].level, 2);
    }

    #[test]
    fn find_by_breadcrumb() {
        let tree = sample();
        assert_eq!(tree.find("/SQL/MySQL").unwrap().text, "MySQL");
        assert_eq!(tree.find("SQL/PostgreSQL").unwrap().text, "PostgreSQL");
        assert!(tree.find("/SQL/Oracle").is_none());
        assert!(tree.find("/SQ").is_none());
    }

    #[test]
    fn select_builds_text_path() {
        let tree = sample();
        let sel = tree.select("/SQL/PostgreSQL").unwrap();
        assert_eq!(sel.tree_name, "Database");
        assert_eq!(sel.selected_path, vec!["SQL", "PostgreSQL"]);
        assert_eq!(sel.outcome.as_deref(), Some("Robust"));
    }

    #[test]
    fn metadata_entries_skip_absent_fields() {
        let meta = Metadata {
            weight: Some(8),
            priority: Some("high".to_string()),
            recommended: true,
            ..Default::default()
        };
        let keys: Vec<&str> = meta.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["weight", "priority", "recommended"]);
        assert_eq!(meta.get("weight").as_deref(), Some("8"));
        assert!(meta.get("risk").is_none());
        assert!(Metadata::default().is_empty());
    }

    #[test]
    fn branch_json_omits_absent_fields() {
        let b = Branch::new("React").with_outcome("Popular");
        let json = serde_json::to_string(&b).unwrap();
        assert!(!json.contains("condition"));
        assert!(!json.contains("metadata"));
        assert!(json.contains("\"outcome\":\"Popular\""));

        let meta = Metadata {
            weight: Some(3),
            ..Default::default()
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("recommended"));
    }

    #[test]
    fn guard_excludes_else() {
        assert_eq!(Branch::new("a").with_condition("x").guard(), Some("x"));
        assert_eq!(Branch::new("a").with_condition(ELSE).guard(), None);
        assert!(Branch::new("a").with_condition(ELSE).is_else());
    }
}
