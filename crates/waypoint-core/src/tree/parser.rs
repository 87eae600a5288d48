use super::line::{classify_line, ClassifiedLine};
use super::model::{Branch, Tree};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

static HEADER_RE: OnceLock<Regex> = OnceLock::new();

fn header_re() -> &'static Regex {
    HEADER_RE.get_or_init(|| Regex::new(r"^##\s+Decision Tree:\s*(.+?)\s*$").unwrap())
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Name captured from a `## Decision Tree: <name>` header line.
pub fn header_name(line: &str) -> Option<&str> {
    header_re()
        .captures(line.trim_end())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

// ---------------------------------------------------------------------------
// Document scanning
// ---------------------------------------------------------------------------

/// Parse every `## Decision Tree:` block in a markdown document.
///
/// Never fails: a header without a fenced block, an unterminated block or a
/// block with no root line produces no tree.
pub fn parse_document(markdown: &str) -> Vec<Tree> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut trees = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(name) = header_name(lines[i]) else {
            i += 1;
            continue;
        };
        let name = name.to_string();
        i += 1;

        // Skip free text up to the opening fence. Another header first means
        // this one never got a block.
        while i < lines.len() && !is_fence(lines[i]) && header_name(lines[i]).is_none() {
            i += 1;
        }
        if i >= lines.len() || !is_fence(lines[i]) {
            tracing::debug!(tree = %name, "decision tree header without a fenced block");
            continue;
        }
        i += 1;

        let start = i;
        while i < lines.len() && !is_fence(lines[i]) {
            i += 1;
        }
        if i >= lines.len() {
            tracing::debug!(tree = %name, "unterminated decision tree block");
            break;
        }
        let body = &lines[start..i];
        i += 1;

        match parse_body(&name, body) {
            Some(tree) => trees.push(tree),
            None => tracing::debug!(tree = %name, "decision tree block has no root line"),
        }
    }

    trees
}

/// Find one tree by name in a document.
pub fn find_tree(markdown: &str, name: &str) -> Option<Tree> {
    parse_document(markdown).into_iter().find(|t| t.name == name)
}

// ---------------------------------------------------------------------------
// Block body
// ---------------------------------------------------------------------------

/// Build a tree from the lines between the fences. The first non-empty line
/// is the root question; the rest are branch lines.
pub fn parse_body(name: &str, body: &[&str]) -> Option<Tree> {
    let root_idx = body.iter().position(|l| !l.trim().is_empty())?;
    let root = body[root_idx].trim().to_string();

    let classified: Vec<ClassifiedLine> = body[root_idx + 1..]
        .iter()
        .filter_map(|l| classify_line(l))
        .collect();

    Some(Tree {
        name: name.to_string(),
        root,
        branches: build_hierarchy(classified),
    })
}

/// Parent of every line: the nearest preceding open line whose indent is
/// more than `tolerance` columns smaller.
fn assign_parents(lines: &[ClassifiedLine], tolerance: usize) -> Vec<Option<usize>> {
    let mut parent: Vec<Option<usize>> = Vec::with_capacity(lines.len());
    let mut stack: Vec<usize> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        while let Some(&top) = stack.last() {
            if lines[top].indent + tolerance >= line.indent {
                stack.pop();
            } else {
                break;
            }
        }
        parent.push(stack.last().copied());
        stack.push(idx);
    }
    parent
}

/// Most common parent-to-child indent step; ties go to the smaller step.
fn indent_unit(lines: &[ClassifiedLine], parent: &[Option<usize>]) -> usize {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for (i, p) in parent.iter().enumerate() {
        if let Some(p) = *p {
            let step = lines[i].indent - lines[p].indent;
            if step > 0 {
                *counts.entry(step).or_default() += 1;
            }
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(step, _)| step)
        .unwrap_or(2)
}

/// Arrange classified lines into a forest using an indentation stack.
///
/// The block's indent unit is its most common parent-to-child step. A line
/// sitting less than half a unit right of a sibling stays that sibling's
/// sibling. Levels are then assigned per parent: one unit below is
/// `parent + 1`, a wider jump yields a larger level so that the validator
/// can report the missing intermediate ancestor.
fn build_hierarchy(lines: Vec<ClassifiedLine>) -> Vec<Branch> {
    let n = lines.len();
    let unit = indent_unit(&lines, &assign_parents(&lines, 0));
    let parent = assign_parents(&lines, unit / 2);

    let mut levels = vec![1usize; n];
    for i in 0..n {
        if let Some(p) = parent[i] {
            let steps = ((lines[i].indent - lines[p].indent) / unit).max(1);
            levels[i] = levels[p] + steps;
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut top_level = Vec::new();
    for i in 0..n {
        match parent[i] {
            Some(p) => children[p].push(i),
            None => top_level.push(i),
        }
    }

    let mut slots: Vec<Option<Branch>> = lines
        .into_iter()
        .zip(levels)
        .map(|(line, level)| {
            let mut branch = line.branch;
            branch.level = level;
            Some(branch)
        })
        .collect();

    fn assemble(idx: usize, slots: &mut [Option<Branch>], children: &[Vec<usize>]) -> Branch {
        let mut branch = slots[idx].take().unwrap_or_else(|| Branch::new(""));
        branch.children = children[idx]
            .iter()
            .map(|&c| assemble(c, slots, children))
            .collect();
        branch
    }

    top_level
        .into_iter()
        .map(|i| assemble(i, &mut slots, &children))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
