//! Decision trees embedded in markdown: parsing, evaluation, quality checks,
//! structural diffs and rendering.

pub mod condition;
pub mod diff;
pub mod filter;
pub mod line;
pub mod lint;
pub mod model;
pub mod parser;
pub mod render;
pub mod validate;

pub use condition::{evaluate, is_identifier, is_well_formed, Context, Expr};
pub use diff::{apply_patch, diff, try_diff, Change, ChangeKind, Patch, PatchOp, TreeDiff};
pub use filter::filter_tree;
pub use line::classify_line;
pub use lint::lint;
pub use model::{Branch, Metadata, Selection, Tree, ELSE};
pub use parser::{find_tree, parse_document};
pub use validate::{detect_cycles, validate, validate_with, ValidationReport, ValidationRules};
