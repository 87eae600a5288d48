use super::condition::{Context, Expr};
use super::model::{Branch, Tree};

/// Keep the branches that apply under `ctx`: unconditional branches,
/// guarded branches whose condition holds, and `ELSE` branches when no
/// guarded sibling matched. Applied recursively to kept branches.
pub fn filter_branches<C: Context + ?Sized>(branches: &[Branch], ctx: &C) -> Vec<Branch> {
    let matched: Vec<bool> = branches
        .iter()
        .map(|b| b.guard().is_some_and(|g| Expr::parse(g).eval(ctx)))
        .collect();
    let any_matched = matched.iter().any(|m| *m);

    branches
        .iter()
        .zip(matched)
        .filter(|(b, m)| match (&b.condition, b.is_else()) {
            (None, _) => true,
            (Some(_), true) => !any_matched,
            (Some(_), false) => *m,
        })
        .map(|(b, _)| Branch {
            children: filter_branches(&b.children, ctx),
            ..b.shallow()
        })
        .collect()
}

pub fn filter_tree<C: Context + ?Sized>(tree: &Tree, ctx: &C) -> Tree {
    Tree {
        name: tree.name.clone(),
        root: tree.root.clone(),
        branches: filter_branches(&tree.branches, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::model::ELSE;
    use std::collections::BTreeMap;

    fn tree() -> Tree {
        Tree::new(
            "ORM",
            "Which data layer?",
            vec![
                Branch::new("Prisma").with_condition("typescript AND has_database"),
                Branch::new("SQLAlchemy").with_condition("python"),
                Branch::new("Plain files").with_condition(ELSE),
                Branch::new("Ask the team").with_children(vec![
                    Branch::new("Slack").with_condition("remote"),
                    Branch::new("Desk visit").with_condition(ELSE),
                ]),
            ],
        )
    }

    fn ctx(pairs: &[(&str, bool)]) -> BTreeMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn texts(branches: &[Branch]) -> Vec<&str> {
        branches.iter().map(|b| b.text.as_str()).collect()
    }

    #[test]
    fn matching_guard_hides_else() {
        let filtered = filter_tree(&tree(), &ctx(&[("python", true), ("remote", true)]));
        assert_eq!(texts(&filtered.branches), vec!["SQLAlchemy", "Ask the team"]);
        assert_eq!(texts(&filtered.branches[1].children), vec!["Slack"]);
    }

    #[test]
    fn else_survives_when_nothing_matches() {
        let filtered = filter_tree(&tree(), &ctx(&[]));
        assert_eq!(texts(&filtered.branches), vec!["Plain files", "Ask the team"]);
        assert_eq!(texts(&filtered.branches[1].children), vec!["Desk visit"]);
    }

    #[test]
    fn input_is_not_mutated() {
        let original = tree();
        let _ = filter_tree(&original, &ctx(&[("typescript", true), ("has_database", true)]));
        assert_eq!(original, tree());
    }
}
