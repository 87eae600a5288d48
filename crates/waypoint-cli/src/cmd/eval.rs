use crate::output::print_json;
use std::path::Path;
use waypoint_core::context::ContextMap;
use waypoint_core::tree::{is_well_formed, Expr};

pub fn run(root: &Path, expr: &str, sets: &[String], detect: bool, json: bool) -> anyhow::Result<()> {
    let ctx: ContextMap = if detect {
        super::context::resolve(root, sets)?.flags
    } else {
        super::parse_sets(sets)?.into_iter().collect()
    };

    let parsed = Expr::parse(expr);
    let result = parsed.eval(&ctx);
    let well_formed = is_well_formed(expr);
    if !well_formed {
        tracing::warn!(expr, "condition uses unrecognized syntax");
    }

    if json {
        let identifiers: Vec<&str> = parsed.identifiers();
        let value = serde_json::json!({
            "expression": expr,
            "result": result,
            "well_formed": well_formed,
            "identifiers": identifiers,
        });
        return print_json(&value);
    }

    println!("{result}");
    Ok(())
}
