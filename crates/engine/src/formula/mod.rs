// Restricted formula language for consistency checks.
// Supports: numeric literals, basic math (+, -, *, /), parentheses, unary
// minus, and a fixed call set: cell, sum_row, sum_col, sum_cells, abs, min,
// max, round. Nothing else resolves - no identifiers, no assignment, no
// loops. Formulas are machine-generated, so evaluation is fail-soft: any
// parse or evaluation error degrades to 0.0 with a diagnostic.

pub mod analyze;
pub mod eval;
pub mod parser;

pub use analyze::referenced_tables;
pub use eval::{eval, evaluate, Evaluation};
pub use parser::{parse, Expr, Op};
