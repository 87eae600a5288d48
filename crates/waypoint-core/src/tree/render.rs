//! Read-only views of a tree: markdown (re-parsable), plain terminal text
//! and Mermaid flowcharts.

use super::model::{Branch, Metadata, Tree, ELSE};
use std::fmt::Write;

/// Connector set used to draw the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyphs {
    pub middle: &'static str,
    pub last: &'static str,
    pub pipe: &'static str,
    pub blank: &'static str,
}

pub const BOX_GLYPHS: Glyphs = Glyphs {
    middle: "├─ ",
    last: "└─ ",
    pipe: "│   ",
    blank: "    ",
};

pub const ASCII_GLYPHS: Glyphs = Glyphs {
    middle: "|-- ",
    last: "`-- ",
    pipe: "|   ",
    blank: "    ",
};

fn metadata_tags(meta: &Metadata) -> String {
    let mut out = String::new();
    if let Some(w) = meta.weight {
        let _ = write!(out, " [weight: {w}]");
    }
    for (key, value) in meta.level_fields() {
        if let Some(v) = value {
            let _ = write!(out, " [{key}: {v}]");
        }
    }
    if meta.recommended {
        out.push_str(" [recommended]");
    }
    out
}

/// One branch in the markdown line syntax, without marker or indentation.
pub fn branch_line(b: &Branch) -> String {
    let mut line = String::new();
    match b.condition.as_deref() {
        Some(ELSE) => line.push_str("[ELSE]"),
        Some(c) => {
            let _ = write!(line, "[IF: {c}]");
        }
        None => {}
    }
    if !b.text.is_empty() {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&b.text);
    }
    if let Some(meta) = &b.metadata {
        line.push_str(&metadata_tags(meta));
    }
    if let Some(outcome) = &b.outcome {
        let _ = write!(line, " → {outcome}");
    }
    line.trim_start().to_string()
}

fn write_branches(out: &mut String, branches: &[Branch], prefix: &str, glyphs: Glyphs) {
    for (i, b) in branches.iter().enumerate() {
        let last = i + 1 == branches.len();
        let marker = if last { glyphs.last } else { glyphs.middle };
        let line = format!("{prefix}{marker}{}", branch_line(b));
        out.push_str(line.trim_end());
        out.push('\n');
        let next = format!("{prefix}{}", if last { glyphs.blank } else { glyphs.pipe });
        write_branches(out, &b.children, &next, glyphs);
    }
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

/// Serialize a tree back to a `## Decision Tree:` block that parses to the
/// same structure.
pub fn to_markdown(tree: &Tree) -> String {
    let mut out = format!("## Decision Tree: {}\n\n```\n{}\n", tree.name, tree.root);
    write_branches(&mut out, &tree.branches, "  ", BOX_GLYPHS);
    out.push_str("```\n");
    out
}

// ---------------------------------------------------------------------------
// Terminal
// ---------------------------------------------------------------------------

pub fn to_terminal(tree: &Tree, glyphs: Glyphs) -> String {
    let mut out = format!("{}\n{}\n", tree.name, tree.root);
    write_branches(&mut out, &tree.branches, "", glyphs);
    out
}

// ---------------------------------------------------------------------------
// Mermaid
// ---------------------------------------------------------------------------

fn mermaid_label(s: &str) -> String {
    s.replace('"', "#quot;")
        .replace('<', "#lt;")
        .replace('>', "#gt;")
        .replace('|', "#124;")
}

/// Render as a top-down Mermaid flowchart. Conditions label the incoming
/// edge; outcomes are appended to the node label.
pub fn to_mermaid(tree: &Tree) -> String {
    fn go(out: &mut String, branches: &[Branch], parent: &str, next_id: &mut usize) {
        for b in branches {
            *next_id += 1;
            let id = format!("n{next_id}");
            let mut label = mermaid_label(&b.label());
            if let Some(outcome) = &b.outcome {
                let _ = write!(label, "<br/>{}", mermaid_label(outcome));
            }
            let class = if b.is_recommended() { ":::recommended" } else { "" };
            let _ = writeln!(out, "    {id}[\"{label}\"]{class}");
            match b.condition.as_deref() {
                Some(c) => {
                    let _ = writeln!(out, "    {parent} -->|{}| {id}", mermaid_label(c));
                }
                None => {
                    let _ = writeln!(out, "    {parent} --> {id}");
                }
            }
            go(out, &b.children, &id, next_id);
        }
    }

    let mut out = String::from("graph TD\n");
    let _ = writeln!(out, "    root{{\"{}\"}}", mermaid_label(&tree.root));
    let mut next_id = 0;
    go(&mut out, &tree.branches, "root", &mut next_id);
    if tree.walk().iter().any(|(_, b)| b.is_recommended()) {
        out.push_str("    classDef recommended stroke-width:3px\n");
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
