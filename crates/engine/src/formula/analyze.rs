// Formula analysis - extracts which tables a formula references.
// Used to classify a check as in-table (one table) or cross-table (several).
// Only literal table indices are visible; a computed index is rare in
// machine-generated formulas and simply goes uncounted.

use std::collections::BTreeSet;

use super::parser::Expr;

/// Distinct literal table indices referenced by `cell`, `sum_row`,
/// `sum_col`, and `sum_cells` calls anywhere in the expression.
pub fn referenced_tables(expr: &Expr) -> BTreeSet<usize> {
    let mut tables = BTreeSet::new();
    walk(expr, &mut tables);
    tables
}

fn walk(expr: &Expr, tables: &mut BTreeSet<usize>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Neg(inner) => walk(inner, tables),
        Expr::BinaryOp { left, right, .. } => {
            walk(left, tables);
            walk(right, tables);
        }
        Expr::Tuple(parts) => {
            for part in parts {
                walk(part, tables);
            }
        }
        Expr::Call { name, args } => {
            match name.as_str() {
                "cell" | "sum_row" | "sum_col" => {
                    if let Some(Expr::Number(n)) = args.first() {
                        record_index(*n, tables);
                    }
                }
                "sum_cells" => {
                    for arg in args {
                        if let Expr::Tuple(parts) = arg {
                            if let Some(Expr::Number(n)) = parts.first() {
                                record_index(*n, tables);
                            }
                        }
                    }
                }
                _ => {}
            }
            for arg in args {
                walk(arg, tables);
            }
        }
    }
}

fn record_index(n: f64, tables: &mut BTreeSet<usize>) {
    if n >= 0.0 && n.fract() == 0.0 && n <= usize::MAX as f64 {
        tables.insert(n as usize);
    }
}
