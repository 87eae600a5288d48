//! Advisory semantic checks. Only circular references are errors here;
//! everything else is a warning or a suggestion.

use super::condition::is_well_formed;
use super::model::{Branch, Tree};
use super::validate::{leaf_depths, ValidationReport};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const TECHNICAL_KEYWORDS: &[&str] = &[
    "database",
    "api",
    "deployment",
    "architecture",
    "implementation",
    "technology",
];

/// Catch-all options a multiple-choice question usually offers, with the
/// words that count as already having one.
const COMMON_OPTIONS: &[(&str, &[&str])] = &[
    (
        "Add a \"None of the above\" option",
        &["none", "neither", "nothing"],
    ),
    (
        "Add an \"Other / custom\" option",
        &["other", "custom", "something else"],
    ),
    (
        "Add a \"Not sure / need help\" option",
        &["not sure", "unsure", "need help", "don't know", "help me"],
    ),
];

static QUESTION_RE: OnceLock<Regex> = OnceLock::new();
static COMMON_OPTION_RES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();

/// Case-insensitive regex matching any of `words` as whole words.
fn whole_words(words: &[&str]) -> String {
    let alternation: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    format!(r"(?i)\b(?:{})\b", alternation.join("|"))
}

fn common_option_res() -> &'static [(&'static str, Regex)] {
    COMMON_OPTION_RES.get_or_init(|| {
        COMMON_OPTIONS
            .iter()
            .map(|(suggestion, words)| (*suggestion, Regex::new(&whole_words(words)).unwrap()))
            .collect()
    })
}

pub fn lint(tree: &Tree) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_circular(tree, &mut report);
    check_duplicate_conditions(tree, &mut report);
    check_balance(tree, &mut report);
    check_common_options(tree, &mut report);
    check_metadata(tree, &mut report);
    check_condition_syntax(tree, &mut report);
    check_orphan_else(tree, &mut report);
    report.finish()
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

fn composite_key(b: &Branch) -> String {
    format!(
        "{}|{}|{}",
        b.text,
        b.outcome.as_deref().unwrap_or_default(),
        b.condition.as_deref().unwrap_or_default()
    )
}

fn check_circular(tree: &Tree, report: &mut ValidationReport) {
    fn go(branches: &[Branch], stack: &mut Vec<String>, report: &mut ValidationReport) {
        for b in branches {
            let key = composite_key(b);
            if stack.contains(&key) {
                report.errors.push(format!(
                    "Circular reference detected at \"{}\"",
                    b.label()
                ));
                continue;
            }
            stack.push(key);
            go(&b.children, stack, report);
            stack.pop();
        }
    }
    go(&tree.branches, &mut Vec::new(), report);
}

fn check_duplicate_conditions(tree: &Tree, report: &mut ValidationReport) {
    fn go(branches: &[Branch], parent: &str, report: &mut ValidationReport) {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for guard in branches.iter().filter_map(|b| b.guard()) {
            match counts.iter_mut().find(|(c, _)| *c == guard) {
                Some((_, n)) => *n += 1,
                None => counts.push((guard, 1)),
            }
        }
        for (cond, n) in counts.into_iter().filter(|(_, n)| *n > 1) {
            report.warnings.push(format!(
                "Duplicate condition \"{cond}\" appears {n} times under \"{parent}\""
            ));
        }
        for b in branches {
            go(&b.children, &b.label(), report);
        }
    }
    go(&tree.branches, &tree.root, report);
}

fn check_balance(tree: &Tree, report: &mut ValidationReport) {
    let depths = leaf_depths(tree);
    let (Some(&min), Some(&max)) = (depths.iter().min(), depths.iter().max()) else {
        return;
    };
    let avg = depths.iter().sum::<usize>() as f64 / depths.len() as f64;
    if max as f64 > 2.0 * avg {
        report.warnings.push(format!(
            "Tree is unbalanced: deepest leaf is at depth {max}, average is {avg:.1}"
        ));
    }
    if max - min > 4 {
        report.warnings.push(format!(
            "Leaf depths differ by {} levels ({min} to {max}); consider flattening long paths",
            max - min
        ));
    }
}

fn is_question(root: &str) -> bool {
    let re = QUESTION_RE.get_or_init(|| Regex::new(&whole_words(&["which", "what", "how"])).unwrap());
    root.contains('?') || re.is_match(root)
}

fn check_common_options(tree: &Tree, report: &mut ValidationReport) {
    if !is_question(&tree.root) || tree.branches.len() < 3 {
        return;
    }
    for (suggestion, re) in common_option_res() {
        let covered = tree.branches.iter().any(|b| re.is_match(&b.text));
        if !covered {
            report.suggestions.push(suggestion.to_string());
        }
    }
}

fn check_metadata(tree: &Tree, report: &mut ValidationReport) {
    let all = tree.walk();
    let total = all.len();
    let meta = || all.iter().filter_map(|(_, b)| b.metadata.as_ref());

    let weighted = meta().filter(|m| m.weight.is_some()).count();
    if weighted > 0 && (weighted as f64) < total as f64 * 0.5 {
        report.warnings.push(format!(
            "Only {weighted} of {total} branches have a weight; weight every option or none"
        ));
    }

    if total >= 5 && !meta().any(|m| m.priority.is_some()) {
        report
            .suggestions
            .push("Add [priority: high|medium|low] tags to help rank the options".to_string());
    }

    let root = tree.root.to_lowercase();
    if total >= 3
        && TECHNICAL_KEYWORDS.iter().any(|k| root.contains(k))
        && !meta().any(|m| m.risk.is_some())
    {
        report.suggestions.push(
            "Technical decision without risk levels; add [risk: high|medium|low] tags".to_string(),
        );
    }

    let recommended = meta().filter(|m| m.recommended).count();
    if recommended > 1 {
        report.warnings.push(format!(
            "{recommended} branches are marked [recommended]; keep a single recommendation"
        ));
    }
}

fn check_condition_syntax(tree: &Tree, report: &mut ValidationReport) {
    for (_, b) in tree.walk() {
        if let Some(guard) = b.guard() {
            if !is_well_formed(guard) {
                report.warnings.push(format!(
                    "Condition \"{guard}\" on \"{}\" uses unrecognized syntax; use identifiers joined by AND, OR, NOT",
                    b.label()
                ));
            }
        }
    }
}

fn check_orphan_else(tree: &Tree, report: &mut ValidationReport) {
    // depth -> (has ELSE, has guarded branch)
    let mut by_depth: BTreeMap<usize, (bool, bool)> = BTreeMap::new();
    for (depth, b) in tree.walk() {
        let entry = by_depth.entry(depth).or_default();
        entry.0 |= b.is_else();
        entry.1 |= b.guard().is_some();
    }
    for (depth, (has_else, has_guard)) in by_depth {
        if has_else && !has_guard {
            report.warnings.push(format!(
                "[ELSE] at depth {depth} has no [IF: ...] branch at the same level"
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::model::{Metadata, ELSE};

    fn leaf(text: &str) -> Branch {
        Branch::new(text)
    }

    fn weighted(text: &str, w: i64) -> Branch {
        leaf(text).with_metadata(Metadata {
            weight: Some(w),
            ..Default::default()
        })
    }

    #[test]
    fn clean_tree_has_no_findings() {
        let tree = Tree::new("Flags", "Enable telemetry", vec![leaf("Yes"), leaf("No")]);
        let report = lint(&tree);
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn circular_reference_uses_composite_key() {
        let inner = leaf("Retry").with_outcome("again");
        let tree = Tree::new(
            "Loop",
            "Retry?",
            vec![leaf("Retry")
                .with_outcome("again")
                .with_children(vec![leaf("Wait").with_children(vec![inner])])],
        );
        let report = lint(&tree);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);

        // Same text but a different outcome is a different branch.
        let tree = Tree::new(
            "Loop",
            "Retry?",
            vec![leaf("Retry")
                .with_outcome("again")
                .with_children(vec![leaf("Retry").with_outcome("give up")])],
        );
        assert!(lint(&tree).valid);
    }

    #[test]
    fn duplicate_sibling_conditions() {
        let tree = Tree::new(
            "Dupes",
            "Stack",
            vec![
                leaf("A").with_condition("has_api"),
                leaf("B").with_condition("has_api"),
                leaf("C").with_condition(ELSE),
                leaf("D").with_condition(ELSE),
            ],
        );
        let report = lint(&tree);
        let dupes: Vec<&String> = report
            .warnings
            .iter()
            .filter(|w| w.starts_with("Duplicate condition"))
            .collect();
        assert_eq!(dupes.len(), 1);
        assert!(dupes[0].contains("\"has_api\" appears 2 times"));
    }

    #[test]
    fn balance_thresholds_are_lenient() {
        let mut deep = leaf("L6");
        for i in (2..6).rev() {
            deep = Branch::new(format!("L{i}")).with_children(vec![deep]);
        }
        let tree = Tree::new(
            "Skewed",
            "Go",
            vec![leaf("a"), leaf("b"), leaf("c"), leaf("d"), Branch::new("L1").with_children(vec![deep])],
        );
        let report = lint(&tree);
        // depths [1,1,1,1,6]: avg 2.0, max 6 > 4.0 and spread 5 > 4
        assert!(report.warnings.iter().any(|w| w.contains("average is 2.0")));
        assert!(report.warnings.iter().any(|w| w.contains("differ by 5 levels")));

        let mild = Tree::new(
            "Mild",
            "Go",
            vec![leaf("a"), Branch::new("b").with_children(vec![leaf("c")])],
        );
        assert!(lint(&mild).warnings.is_empty());
    }

    #[test]
    fn missing_common_options_for_questions() {
        let tree = Tree::new(
            "Frontend",
            "Which framework?",
            vec![leaf("React"), leaf("Vue"), leaf("Other framework")],
        );
        let report = lint(&tree);
        assert_eq!(report.suggestions.len(), 2);
        assert!(report.suggestions.iter().any(|s| s.contains("None of the above")));
        assert!(report.suggestions.iter().any(|s| s.contains("Not sure")));

        let statement = Tree::new(
            "Frontend",
            "Frameworks",
            vec![leaf("React"), leaf("Vue"), leaf("Svelte")],
        );
        assert!(lint(&statement).suggestions.is_empty());
    }

    #[test]
    fn common_options_match_whole_words_only() {
        let tree = Tree::new(
            "Vendors",
            "Which vendor?",
            vec![
                leaf("Another vendor"),
                leaf("Mother board"),
                leaf("Nonexistent API"),
                leaf("Customs broker"),
            ],
        );
        assert_eq!(lint(&tree).suggestions.len(), 3);

        let covered = Tree::new(
            "Vendors",
            "Which vendor?",
            vec![leaf("Acme"), leaf("NONE"), leaf("Something else"), leaf("I don't know")],
        );
        assert!(lint(&covered).suggestions.is_empty());

        let statement = Tree::new(
            "Vendors",
            "Showcase vendors",
            vec![leaf("Acme"), leaf("Globex"), leaf("Initech")],
        );
        assert!(lint(&statement).suggestions.is_empty());
    }

    #[test]
    fn partial_weights_warn() {
        let tree = Tree::new(
            "Weights",
            "Pick",
            vec![weighted("A", 5), leaf("B"), leaf("C")],
        );
        let report = lint(&tree);
        assert!(report.warnings.iter().any(|w| w.contains("Only 1 of 3")));

        let half = Tree::new("Weights", "Pick", vec![weighted("A", 5), leaf("B")]);
        assert!(lint(&half).warnings.is_empty());
    }

    #[test]
    fn priority_and_risk_suggestions() {
        let tree = Tree::new(
            "Infra",
            "Database engine",
            vec![leaf("A"), leaf("B"), leaf("C"), leaf("D"), leaf("E")],
        );
        let report = lint(&tree);
        assert!(report.suggestions.iter().any(|s| s.contains("[priority")));
        assert!(report.suggestions.iter().any(|s| s.contains("[risk")));
    }

    #[test]
    fn multiple_recommendations_warn() {
        let rec = || Metadata {
            recommended: true,
            ..Default::default()
        };
        let tree = Tree::new(
            "Recs",
            "Pick",
            vec![leaf("A").with_metadata(rec()), leaf("B").with_metadata(rec())],
        );
        let report = lint(&tree);
        assert!(report.warnings.iter().any(|w| w.starts_with("2 branches are marked")));
    }

    #[test]
    fn condition_syntax_reported_per_occurrence() {
        let tree = Tree::new(
            "Syntax",
            "Pick",
            vec![
                leaf("A").with_condition("a && b"),
                leaf("B").with_condition("x || y"),
                leaf("C").with_condition(ELSE),
            ],
        );
        let report = lint(&tree);
        let syntax = report
            .warnings
            .iter()
            .filter(|w| w.contains("unrecognized syntax"))
            .count();
        assert_eq!(syntax, 2);
    }

    #[test]
    fn orphan_else_grouped_by_depth() {
        let tree = Tree::new(
            "Else",
            "Pick",
            vec![
                leaf("A").with_children(vec![leaf("fallback").with_condition(ELSE)]),
                leaf("B").with_condition(ELSE),
            ],
        );
        let report = lint(&tree);
        assert!(report.warnings.iter().any(|w| w.contains("depth 1")));
        assert!(report.warnings.iter().any(|w| w.contains("depth 2")));

        // A guard anywhere at the same depth satisfies the check.
        let tree = Tree::new(
            "Else",
            "Pick",
            vec![
                leaf("A").with_children(vec![leaf("x").with_condition(ELSE)]),
                leaf("B").with_children(vec![leaf("y").with_condition("has_api")]),
            ],
        );
        assert!(!lint(&tree)
            .warnings
            .iter()
            .any(|w| w.contains("[ELSE] at depth")));
    }
}
