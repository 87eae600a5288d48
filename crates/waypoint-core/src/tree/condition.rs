//! Boolean guard expressions: `AND`, `OR`, `NOT`, parentheses and bare
//! identifiers looked up in a context of flags.
//!
//! Precedence is `NOT` > `AND` > `OR`. Evaluation is total: unknown
//! identifiers, non-boolean values and malformed input are all `false`.

use super::model::ELSE;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Source of identifier values. Only an explicit boolean `true` counts.
pub trait Context {
    fn flag(&self, key: &str) -> bool;
}

impl Context for HashMap<String, bool> {
    fn flag(&self, key: &str) -> bool {
        self.get(key).copied().unwrap_or(false)
    }
}

impl Context for BTreeMap<String, bool> {
    fn flag(&self, key: &str) -> bool {
        self.get(key).copied().unwrap_or(false)
    }
}

/// JSON contexts: anything other than an object, or a value other than
/// `true`, is false.
impl Context for serde_json::Value {
    fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(serde_json::Value::Bool(true)))
    }
}

impl<C: Context> Context for Option<C> {
    fn flag(&self, key: &str) -> bool {
        self.as_ref().is_some_and(|c| c.flag(key))
    }
}

impl<C: Context + ?Sized> Context for &C {
    fn flag(&self, key: &str) -> bool {
        (**self).flag(key)
    }
}

// ---------------------------------------------------------------------------
// Expr
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// The `ELSE` sentinel.
    Always,
    Var(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Decompose an expression string. Splits on the first top-level ` OR `,
    /// then the first top-level ` AND `, so `AND` binds tighter.
    pub fn parse(expr: &str) -> Expr {
        let e = expr.trim();
        if e == ELSE {
            return Expr::Always;
        }
        if let Some(inner) = strip_outer_parens(e) {
            return Expr::parse(inner);
        }
        if let Some((l, r)) = split_top_level(e, " OR ") {
            return Expr::Or(Box::new(Expr::parse(l)), Box::new(Expr::parse(r)));
        }
        if let Some((l, r)) = split_top_level(e, " AND ") {
            return Expr::And(Box::new(Expr::parse(l)), Box::new(Expr::parse(r)));
        }
        if let Some(rest) = strip_not(e) {
            return Expr::Not(Box::new(Expr::parse(rest)));
        }
        Expr::Var(e.to_string())
    }

    /// Evaluate with short-circuiting `AND`/`OR`.
    pub fn eval<C: Context + ?Sized>(&self, ctx: &C) -> bool {
        match self {
            Expr::Always => true,
            Expr::Var(name) => ctx.flag(name),
            Expr::Not(inner) => !inner.eval(ctx),
            Expr::And(l, r) => l.eval(ctx) && r.eval(ctx),
            Expr::Or(l, r) => l.eval(ctx) || r.eval(ctx),
        }
    }

    /// Identifiers referenced by the expression, in first-seen order.
    pub fn identifiers(&self) -> Vec<&str> {
        fn go<'a>(e: &'a Expr, out: &mut Vec<&'a str>) {
            match e {
                Expr::Always => {}
                Expr::Var(v) => {
                    if !out.contains(&v.as_str()) {
                        out.push(v);
                    }
                }
                Expr::Not(inner) => go(inner, out),
                Expr::And(l, r) | Expr::Or(l, r) => {
                    go(l, out);
                    go(r, out);
                }
            }
        }
        let mut out = Vec::new();
        go(self, &mut out);
        out
    }
}

/// Evaluate `expr` against `ctx`.
pub fn evaluate<C: Context + ?Sized>(expr: &str, ctx: &C) -> bool {
    Expr::parse(expr).eval(ctx)
}

/// `(inner)` when one matching pair wraps the whole string.
fn strip_outer_parens(e: &str) -> Option<&str> {
    if !e.starts_with('(') || !e.ends_with(')') {
        return None;
    }
    let mut depth = 0i32;
    for (i, c) in e.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return (i == e.len() - 1).then(|| &e[1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level<'a>(e: &'a str, token: &str) -> Option<(&'a str, &'a str)> {
    let mut depth = 0i32;
    for (i, c) in e.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 && e[i..].starts_with(token) => {
                return Some((&e[..i], &e[i + token.len()..]));
            }
            _ => {}
        }
    }
    None
}

fn strip_not(e: &str) -> Option<&str> {
    let rest = e.strip_prefix("NOT")?;
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '(' => Some(rest),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Syntax allow-list
// ---------------------------------------------------------------------------

/// A condition identifier: ASCII letter or underscore, then letters, digits
/// or underscores.
pub const IDENT_PATTERN: &str = r"[A-Za-z_][A-Za-z0-9_]*";

static IDENT_RE: OnceLock<Regex> = OnceLock::new();
static SIMPLE_RE: OnceLock<Regex> = OnceLock::new();

/// Whether `key` can be referenced from a condition.
pub fn is_identifier(key: &str) -> bool {
    let re = IDENT_RE.get_or_init(|| Regex::new(&format!("^{IDENT_PATTERN}$")).unwrap());
    re.is_match(key)
}

/// Whether a guard uses the plain form: identifiers joined by `AND`/`OR`,
/// each optionally negated with `NOT`. Parenthesised expressions are
/// accepted without further inspection.
pub fn is_well_formed(condition: &str) -> bool {
    if condition.contains('(') || condition.contains(')') {
        return true;
    }
    let re = SIMPLE_RE.get_or_init(|| {
        let term = format!(r"(?:NOT\s+)?{IDENT_PATTERN}");
        Regex::new(&format!(r"^{term}(?:\s+(?:AND|OR)\s+{term})*$")).unwrap()
    });
    re.is_match(condition.trim())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
