//! Classification of a single line of a decision tree block.
//!
//! Every tag extractor is a pure `&str -> (value, remainder)` function so the
//! pieces can be exercised independently of the line-level driver.

use super::model::{Branch, Metadata, ELSE};
use regex::Regex;
use std::sync::OnceLock;

/// A branch stub together with the column used to place it in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub branch: Branch,
    /// Character column of the branch marker, or of the first visible
    /// character when the line has no marker.
    pub indent: usize,
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static CONTINUATION_RE: OnceLock<Regex> = OnceLock::new();
static MARKER_RE: OnceLock<Regex> = OnceLock::new();
static IF_RE: OnceLock<Regex> = OnceLock::new();
static ELSE_RE: OnceLock<Regex> = OnceLock::new();
static WEIGHT_RE: OnceLock<Regex> = OnceLock::new();
static RECOMMENDED_RE: OnceLock<Regex> = OnceLock::new();
static LEVEL_RES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();

fn continuation_re() -> &'static Regex {
    CONTINUATION_RE.get_or_init(|| Regex::new(r"^(?:[│|][ \t]*)*").unwrap())
}

fn marker_re() -> &'static Regex {
    // Box-drawing connectors, then the ASCII fallbacks: `|--`, `+--`, `` `-- ``
    // and a bare hyphen run followed by whitespace.
    MARKER_RE.get_or_init(|| Regex::new(r"^(?:├[─-]*|└[─-]*|\|-+|\+-+|`-+|-+[ \t])[ \t]*").unwrap())
}

fn if_re() -> &'static Regex {
    IF_RE.get_or_init(|| Regex::new(r"(?i)^\[IF:([^\]]*)\]").unwrap())
}

fn else_re() -> &'static Regex {
    ELSE_RE.get_or_init(|| Regex::new(r"(?i)^\[ELSE\]").unwrap())
}

fn weight_re() -> &'static Regex {
    WEIGHT_RE.get_or_init(|| Regex::new(r"(?i)\[weight:\s*(-?\d+)\s*\]").unwrap())
}

fn recommended_re() -> &'static Regex {
    RECOMMENDED_RE.get_or_init(|| Regex::new(r"(?i)\[recommended\]").unwrap())
}

fn level_res() -> &'static [(&'static str, Regex)] {
    LEVEL_RES.get_or_init(|| {
        ["priority", "risk", "complexity", "cost"]
            .into_iter()
            .map(|key| {
                let re = Regex::new(&format!(r"(?i)\[{key}:\s*(high|medium|low)\s*\]")).unwrap();
                (key, re)
            })
            .collect()
    })
}

fn cut(s: &str, start: usize, end: usize) -> String {
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..start]);
    out.push_str(&s[end..]);
    out
}

// ---------------------------------------------------------------------------
// Tag extractors
// ---------------------------------------------------------------------------

/// Strip a leading `[IF: expr]` or `[ELSE]` marker.
pub fn extract_condition(content: &str) -> (Option<String>, String) {
    let trimmed = content.trim_start();
    if let Some(caps) = if_re().captures(trimmed) {
        let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let expr = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        return (Some(expr.to_string()), trimmed[whole..].to_string());
    }
    if let Some(m) = else_re().find(trimmed) {
        return (Some(ELSE.to_string()), trimmed[m.end()..].to_string());
    }
    (None, content.to_string())
}

pub fn extract_weight(content: &str) -> (Option<i64>, String) {
    let Some(caps) = weight_re().captures(content) else {
        return (None, content.to_string());
    };
    let (Some(whole), Some(num)) = (caps.get(0), caps.get(1)) else {
        return (None, content.to_string());
    };
    match num.as_str().parse::<i64>() {
        Ok(w) => (Some(w), cut(content, whole.start(), whole.end())),
        Err(_) => (None, content.to_string()),
    }
}

/// Extract one of the `high|medium|low` tags (`priority`, `risk`,
/// `complexity`, `cost`). The value is lower-cased.
pub fn extract_level(content: &str, key: &str) -> (Option<String>, String) {
    let Some((_, re)) = level_res().iter().find(|(k, _)| *k == key) else {
        return (None, content.to_string());
    };
    let Some(caps) = re.captures(content) else {
        return (None, content.to_string());
    };
    match (caps.get(0), caps.get(1)) {
        (Some(whole), Some(value)) => (
            Some(value.as_str().to_lowercase()),
            cut(content, whole.start(), whole.end()),
        ),
        _ => (None, content.to_string()),
    }
}

pub fn extract_recommended(content: &str) -> (bool, String) {
    match recommended_re().find(content) {
        Some(m) => (true, cut(content, m.start(), m.end())),
        None => (false, content.to_string()),
    }
}

/// Run every metadata extractor in tag order. Returns `None` when no tag
/// was present.
pub fn extract_metadata(content: &str) -> (Option<Metadata>, String) {
    let mut meta = Metadata::default();
    let (weight, rest) = extract_weight(content);
    meta.weight = weight;
    let (priority, rest) = extract_level(&rest, "priority");
    meta.priority = priority;
    let (risk, rest) = extract_level(&rest, "risk");
    meta.risk = risk;
    let (complexity, rest) = extract_level(&rest, "complexity");
    meta.complexity = complexity;
    let (cost, rest) = extract_level(&rest, "cost");
    meta.cost = cost;
    let (recommended, rest) = extract_recommended(&rest);
    meta.recommended = recommended;

    if meta.is_empty() {
        (None, rest)
    } else {
        (Some(meta), rest)
    }
}

/// Split off a `→ outcome` suffix. An arrow with nothing after it yields no
/// outcome.
pub fn extract_outcome(content: &str) -> (Option<String>, String) {
    match content.split_once('→') {
        Some((before, after)) => {
            let outcome = after.trim();
            let outcome = (!outcome.is_empty()).then(|| outcome.to_string());
            (outcome, before.to_string())
        }
        None => (None, content.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Line driver
// ---------------------------------------------------------------------------

/// Strip continuation glyphs and a branch marker from the start of `rest`
/// (already left-trimmed). Returns the char offset of the marker (or of the
/// first visible character) and the remaining content.
fn strip_marker(rest: &str) -> (usize, &str) {
    // `|--` is itself a marker, so try before treating `|` as continuation.
    if let Some(m) = marker_re().find(rest) {
        return (0, &rest[m.end()..]);
    }
    let prefix_len = continuation_re().find(rest).map(|m| m.end()).unwrap_or(0);
    let after_prefix = &rest[prefix_len..];
    let offset = rest[..prefix_len].chars().count();
    match marker_re().find(after_prefix) {
        Some(m) => (offset, &after_prefix[m.end()..]),
        None => (offset, after_prefix),
    }
}

/// Classify one physical line. Blank lines and lines made only of vertical
/// continuation glyphs return `None`.
pub fn classify_line(line: &str) -> Option<ClassifiedLine> {
    let rest = line.trim_start();
    if rest.is_empty() || rest.chars().all(|c| c == '│' || c == '|' || c.is_whitespace()) {
        return None;
    }
    let leading = line.chars().take_while(|c| c.is_whitespace()).count();
    let level = leading / 2;

    let (offset, content) = strip_marker(rest);
    let (condition, content) = extract_condition(content);
    let (metadata, content) = extract_metadata(&content);
    let (outcome, content) = extract_outcome(&content);

    Some(ClassifiedLine {
        branch: Branch {
            text: content.trim().to_string(),
            level,
            condition,
            metadata,
            outcome,
            children: Vec::new(),
        },
        indent: leading + offset,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_continuation_lines_are_skipped() {
        assert!(classify_line("").is_none());
        assert!(classify_line("    ").is_none());
        assert!(classify_line("  │").is_none());
        assert!(classify_line("  │   │  ").is_none());
        assert!(classify_line("  |").is_none());
    }

    #[test]
    fn box_markers_are_stripped() {
        let mid = classify_line("  ├─ React → Modern and popular").unwrap();
        assert_eq!(mid.branch.text, "React");
        assert_eq!(mid.branch.outcome.as_deref(), Some("Modern and popular"));
        assert_eq!(mid.branch.level, 1);
        assert_eq!(mid.indent, 2);

        let last = classify_line("  └── Vue").unwrap();
        assert_eq!(last.branch.text, "Vue");
    }

    #[test]
    fn continuation_prefix_moves_indent_to_marker() {
        let line = classify_line("  │   ├─ child").unwrap();
        assert_eq!(line.branch.text, "child");
        assert_eq!(line.indent, 6);
        assert_eq!(line.branch.level, 1);
    }

    #[test]
    fn ascii_markers_are_equivalent() {
        for raw in ["  |-- Option", "  `-- Option", "  +-- Option", "  - Option"] {
            let line = classify_line(raw).unwrap();
            assert_eq!(line.branch.text, "Option", "marker in {raw:?}");
            assert_eq!(line.indent, 2);
        }
        let nested = classify_line("  |   `-- Deep").unwrap();
        assert_eq!(nested.branch.text, "Deep");
        assert_eq!(nested.indent, 6);
    }

    #[test]
    fn unmarked_line_is_a_branch() {
        let line = classify_line("    Plain text").unwrap();
        assert_eq!(line.branch.text, "Plain text");
        assert_eq!(line.indent, 4);
        assert_eq!(line.branch.level, 2);
    }

    #[test]
    fn metadata_extraction_scenario() {
        let line = classify_line("├─ PostgreSQL [recommended] [weight: 8] [priority: high]").unwrap();
        let b = line.branch;
        assert_eq!(b.text, "PostgreSQL");
        assert_eq!(
            b.metadata,
            Some(Metadata {
                weight: Some(8),
                priority: Some("high".to_string()),
                recommended: true,
                ..Default::default()
            })
        );
        assert!(b.outcome.is_none());
        assert!(b.condition.is_none());
    }

    #[test]
    fn condition_markers() {
        let (cond, rest) = extract_condition("[IF: has_database AND has_api] Use ORM");
        assert_eq!(cond.as_deref(), Some("has_database AND has_api"));
        assert_eq!(rest.trim(), "Use ORM");

        let (cond, rest) = extract_condition("[ELSE] Use raw SQL");
        assert_eq!(cond.as_deref(), Some(ELSE));
        assert_eq!(rest.trim(), "Use raw SQL");

        let (cond, rest) = extract_condition("Plain [IF: x]");
        assert!(cond.is_none());
        assert_eq!(rest, "Plain [IF: x]");
    }

    #[test]
    fn bare_condition_wrapper_has_empty_text() {
        let line = classify_line("  └─ [IF: typescript]").unwrap();
        assert_eq!(line.branch.text, "");
        assert_eq!(line.branch.condition.as_deref(), Some("typescript"));
        assert!(line.branch.metadata.is_none());
    }

    #[test]
    fn level_tags_are_case_insensitive_and_lowercased() {
        let (risk, rest) = extract_level("Deploy [RISK: High] now", "risk");
        assert_eq!(risk.as_deref(), Some("high"));
        assert_eq!(rest, "Deploy  now");

        let (none, rest) = extract_level("Deploy [risk: extreme]", "risk");
        assert!(none.is_none());
        assert_eq!(rest, "Deploy [risk: extreme]");
    }

    #[test]
    fn weight_is_not_range_checked() {
        let (w, rest) = extract_weight("Option [weight: 42]");
        assert_eq!(w, Some(42));
        assert_eq!(rest.trim(), "Option");
        let (w, _) = extract_weight("Option [weight: -3]");
        assert_eq!(w, Some(-3));
    }

    #[test]
    fn outcome_split_on_first_arrow() {
        let (o, rest) = extract_outcome("A → B → C");
        assert_eq!(o.as_deref(), Some("B → C"));
        assert_eq!(rest.trim(), "A");
        let (o, _) = extract_outcome("A →   ");
        assert!(o.is_none());
    }

    #[test]
    fn all_tags_together() {
        let line = classify_line(
            "  │   └─ [IF: has_api] GraphQL [cost: LOW] [complexity: medium] [risk: low] → Flexible",
        )
        .unwrap();
        let b = line.branch;
        assert_eq!(b.text, "GraphQL");
        assert_eq!(b.condition.as_deref(), Some("has_api"));
        assert_eq!(b.outcome.as_deref(), Some("Flexible"));
        let meta = b.metadata.unwrap();
        assert_eq!(meta.cost.as_deref(), Some("low"));
        assert_eq!(meta.complexity.as_deref(), Some("medium"));
        assert_eq!(meta.risk.as_deref(), Some("low"));
        assert!(!meta.recommended);
    }
}
