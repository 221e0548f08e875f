//! Restricted Expression Evaluator
//!
//! Formulas authored in the form builder (calculated fields, custom validation
//! rules, sales-grid summaries) are parsed into an AST and evaluated over
//! `f64`. There is no dynamic code evaluation: only numbers, arithmetic,
//! comparison and logical operators, and references resolved by the caller.
//!
//! ```text
//! "{price} * {qty}" ─► lexer ─► parser ─► Expr ─► evaluate(resolver) ─► f64
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod eval;
pub mod grid;
pub mod lexer;
pub mod parser;

pub use error::{ExprError, Result};
pub use eval::{evaluate, evaluate_str};
pub use grid::{parse_cell_value, GridColumn, GridRow, SalesGrid, SummaryFormula};
pub use parser::{parse, BinaryOp, Expr, UnaryOp};
