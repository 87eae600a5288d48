use super::condition::is_well_formed;
use super::model::{Branch, Tree, LEVEL_VALUES};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ValidationReport
// ---------------------------------------------------------------------------

/// Outcome of validating or linting a tree. `valid` is true iff `errors`
/// is empty; warnings and suggestions are advisory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    pub(crate) fn finish(mut self) -> Self {
        self.valid = self.errors.is_empty();
        self
    }

    /// Whether the report passes, optionally treating warnings as failures.
    pub fn passes(&self, strict: bool) -> bool {
        self.valid && (!strict || self.warnings.is_empty())
    }
}

// ---------------------------------------------------------------------------
// ValidationRules
// ---------------------------------------------------------------------------

/// Tunables for the metadata range check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub min_weight: i64,
    pub max_weight: i64,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_weight: 1,
            max_weight: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Structural helpers
// ---------------------------------------------------------------------------

/// Identity used for cycle detection: the branch text, or its condition
/// marker when the text is empty so bare wrappers do not collide.
fn cycle_key(b: &Branch) -> String {
    if b.text.is_empty() {
        b.label()
    } else {
        b.text.clone()
    }
}

/// Labels of branches whose identity reappears on their own root-to-node
/// path.
pub fn find_cycles(tree: &Tree) -> Vec<String> {
    fn go(branches: &[Branch], path: &mut Vec<String>, out: &mut Vec<String>) {
        for b in branches {
            let key = cycle_key(b);
            if path.contains(&key) {
                out.push(b.label());
                continue;
            }
            path.push(key);
            go(&b.children, path, out);
            path.pop();
        }
    }
    let mut out = Vec::new();
    go(&tree.branches, &mut Vec::new(), &mut out);
    out
}

pub fn detect_cycles(tree: &Tree) -> bool {
    !find_cycles(tree).is_empty()
}

/// Branches whose level skips past `parent + 1`.
pub fn find_orphans(tree: &Tree) -> Vec<&Branch> {
    fn go<'a>(branches: &'a [Branch], parent_level: usize, out: &mut Vec<&'a Branch>) {
        for b in branches {
            if b.level > parent_level + 1 {
                out.push(b);
            }
            go(&b.children, b.level, out);
        }
    }
    let mut out = Vec::new();
    go(&tree.branches, 0, &mut out);
    out
}

/// Depth of every leaf, 1 at top level.
pub fn leaf_depths(tree: &Tree) -> Vec<usize> {
    tree.walk()
        .into_iter()
        .filter(|(_, b)| b.is_leaf())
        .map(|(d, _)| d)
        .collect()
}

/// Sibling groups (keyed by their parent's label) containing a guarded
/// branch but no `ELSE` fallback.
pub fn incomplete_conditionals(tree: &Tree) -> Vec<String> {
    fn go(branches: &[Branch], parent: &str, out: &mut Vec<String>) {
        let guarded = branches.iter().any(|b| b.guard().is_some());
        let has_else = branches.iter().any(|b| b.is_else());
        if guarded && !has_else {
            out.push(parent.to_string());
        }
        for b in branches {
            go(&b.children, &b.label(), out);
        }
    }
    let mut out = Vec::new();
    go(&tree.branches, &tree.root, &mut out);
    out
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn validate(tree: &Tree) -> ValidationReport {
    validate_with(tree, &ValidationRules::default())
}

pub fn validate_with(tree: &Tree, rules: &ValidationRules) -> ValidationReport {
    let mut report = ValidationReport::default();

    if tree.root.trim().is_empty() {
        report.errors.push("Tree must have a root question".to_string());
        return report.finish();
    }
    if tree.branches.is_empty() {
        report
            .errors
            .push("Tree must have at least one branch".to_string());
        return report.finish();
    }

    for label in find_cycles(tree) {
        report.errors.push(format!(
            "Circular reference detected: \"{label}\" repeats on its own path"
        ));
    }

    let orphans = find_orphans(tree);
    if !orphans.is_empty() {
        report.errors.push(format!(
            "Found {} orphaned branch(es) that skip a nesting level",
            orphans.len()
        ));
    }

    let depths = leaf_depths(tree);
    if let (Some(min), Some(max)) = (depths.iter().min(), depths.iter().max()) {
        if max - min >= 2 {
            report.warnings.push(format!(
                "Tree is unbalanced: leaf depths range from {min} to {max}"
            ));
        }
    }

    for parent in incomplete_conditionals(tree) {
        report.warnings.push(format!(
            "Conditional branches under \"{parent}\" have no [ELSE] fallback"
        ));
    }

    let walked = tree.walk();
    let malformed = walked
        .iter()
        .filter_map(|(_, b)| b.guard())
        .filter(|c| !is_well_formed(c))
        .count();
    if malformed > 0 {
        report.warnings.push(format!(
            "{malformed} condition(s) use unrecognized syntax; expected identifiers joined by AND, OR, NOT"
        ));
    }

    for (_, b) in &walked {
        let Some(meta) = &b.metadata else { continue };
        if let Some(w) = meta.weight {
            if w < rules.min_weight || w > rules.max_weight {
                report.warnings.push(format!(
                    "Branch \"{}\" has weight {w} outside the range {}-{}",
                    b.label(),
                    rules.min_weight,
                    rules.max_weight
                ));
            }
        }
        for (field, value) in meta.level_fields() {
            if let Some(v) = value {
                if !LEVEL_VALUES.contains(&v) {
                    report.warnings.push(format!(
                        "Branch \"{}\" has invalid {field} \"{v}\" (expected high, medium or low)",
                        b.label()
                    ));
                }
            }
        }
    }

    if !walked.iter().any(|(_, b)| b.is_recommended()) {
        report
            .suggestions
            .push("Add a recommended option with the [recommended] tag".to_string());
    }

    report.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
