// Formula evaluator - walks the AST against a GridSet.
// Two layers: `eval` reports errors (unknown function, bad arity, division
// by zero), `evaluate` is the fail-soft surface that degrades every error
// to 0.0 plus a diagnostic. Cell addressing is total per the grid model, so
// a speculative out-of-range reference is never an error, just 0.0.

use crate::grid::GridSet;

use super::parser::{parse, Expr, Op};

/// Outcome of fail-soft evaluation: the computed value, and the parse or
/// evaluation error that forced it to 0.0, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    pub diagnostic: Option<String>,
}

/// Evaluate a formula string against a set of grids. Never fails: any parse
/// or evaluation error yields 0.0 with a diagnostic. Pure function of
/// `(formula, grids)`.
pub fn evaluate(formula: &str, grids: &GridSet) -> Evaluation {
    match parse(formula).and_then(|expr| eval(&expr, grids)) {
        Ok(value) => Evaluation {
            value,
            diagnostic: None,
        },
        Err(msg) => Evaluation {
            value: 0.0,
            diagnostic: Some(msg),
        },
    }
}

/// Evaluate a parsed expression. Errors here are diagnostics for
/// `evaluate`, never user-facing failures.
pub fn eval(expr: &Expr, grids: &GridSet) -> Result<f64, String> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Neg(inner) => Ok(-eval(inner, grids)?),
        Expr::Tuple(_) => Err("coordinate tuple only valid inside sum_cells".to_string()),
        Expr::BinaryOp { op, left, right } => {
            let l = eval(left, grids)?;
            let r = eval(right, grids)?;
            match op {
                Op::Add => Ok(l + r),
                Op::Sub => Ok(l - r),
                Op::Mul => Ok(l * r),
                Op::Div => {
                    if r == 0.0 {
                        Err("division by zero".to_string())
                    } else {
                        Ok(l / r)
                    }
                }
            }
        }
        Expr::Call { name, args } => eval_call(name, args, grids),
    }
}

fn eval_call(name: &str, args: &[Expr], grids: &GridSet) -> Result<f64, String> {
    match name {
        "cell" => {
            let [t, r, c] = eval_args::<3>(name, args, grids)?;
            match (index(t), index(r), index(c)) {
                (Some(t), Some(r), Some(c)) => Ok(grids.cell_value(t, r, c)),
                // Negative or fractional coordinates address nothing.
                _ => Ok(0.0),
            }
        }
        "sum_row" => {
            let [t, row, c0, c1] = eval_args::<4>(name, args, grids)?;
            match (index(t), index(row), index(c0), index(c1)) {
                (Some(t), Some(row), Some(c0), Some(c1)) => Ok(grids.sum_row(t, row, c0, c1)),
                _ => Ok(0.0),
            }
        }
        "sum_col" => {
            let [t, col, r0, r1] = eval_args::<4>(name, args, grids)?;
            match (index(t), index(col), index(r0), index(r1)) {
                (Some(t), Some(col), Some(r0), Some(r1)) => Ok(grids.sum_col(t, col, r0, r1)),
                _ => Ok(0.0),
            }
        }
        "sum_cells" => {
            let mut total = 0.0;
            for arg in args {
                let Expr::Tuple(parts) = arg else {
                    return Err("sum_cells arguments must be (table, row, col) tuples".to_string());
                };
                if parts.len() != 3 {
                    return Err(format!(
                        "sum_cells expects (table, row, col), got {} elements",
                        parts.len()
                    ));
                }
                let t = eval(&parts[0], grids)?;
                let r = eval(&parts[1], grids)?;
                let c = eval(&parts[2], grids)?;
                if let (Some(t), Some(r), Some(c)) = (index(t), index(r), index(c)) {
                    total += grids.cell_value(t, r, c);
                }
            }
            Ok(total)
        }
        "abs" => {
            let [x] = eval_args::<1>(name, args, grids)?;
            Ok(x.abs())
        }
        "min" => fold_args(name, args, grids, f64::min),
        "max" => fold_args(name, args, grids, f64::max),
        "round" => match args.len() {
            1 => Ok(eval(&args[0], grids)?.round()),
            2 => {
                let x = eval(&args[0], grids)?;
                let d = eval(&args[1], grids)?;
                if d.fract() != 0.0 {
                    return Err("round digits must be an integer".to_string());
                }
                let factor = 10f64.powi(d as i32);
                Ok((x * factor).round() / factor)
            }
            n => Err(format!("round expects 1 or 2 arguments, got {n}")),
        },
        other => Err(format!("unknown function '{other}'")),
    }
}

/// Evaluate exactly N arguments or report an arity error.
fn eval_args<const N: usize>(
    name: &str,
    args: &[Expr],
    grids: &GridSet,
) -> Result<[f64; N], String> {
    if args.len() != N {
        return Err(format!(
            "{name} expects {N} arguments, got {}",
            args.len()
        ));
    }
    let mut out = [0.0; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = eval(arg, grids)?;
    }
    Ok(out)
}

fn fold_args(
    name: &str,
    args: &[Expr],
    grids: &GridSet,
    f: fn(f64, f64) -> f64,
) -> Result<f64, String> {
    if args.is_empty() {
        return Err(format!("{name} expects at least 1 argument"));
    }
    let mut acc = eval(&args[0], grids)?;
    for arg in &args[1..] {
        acc = f(acc, eval(arg, grids)?);
    }
    Ok(acc)
}

/// Convert an evaluated index argument to a cell coordinate. Negative or
/// fractional values are not addressable.
fn index(v: f64) -> Option<usize> {
    if v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64 {
        Some(v as usize)
    } else {
        None
    }
}
