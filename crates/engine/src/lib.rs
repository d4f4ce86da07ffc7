//! `auditgrid-engine` — grid model and restricted formula language.
//!
//! Pure engine crate: holds extracted tables and evaluates machine-generated
//! consistency formulas against them. No IO, no async, no shared mutable state.

pub mod formula;
pub mod grid;

pub use formula::{evaluate, parse, referenced_tables, Evaluation, Expr};
pub use grid::{Cell, Grid, GridSet};
