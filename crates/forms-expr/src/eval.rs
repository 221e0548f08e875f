//! AST evaluation over `f64`
//!
//! Comparison and logical operators yield `1.0` / `0.0`; any non-zero value
//! is truthy. References are only ever resolved through the caller's
//! resolver, which acts as the whitelist.

use std::collections::HashMap;

use crate::error::{ExprError, Result};
use crate::parser::{parse, BinaryOp, Expr, UnaryOp};

/// Evaluate an expression, resolving references through `resolve`
pub fn evaluate(expr: &Expr, resolve: &dyn Fn(&str) -> Option<f64>) -> Result<f64> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Field(name) | Expr::Name(name) => {
            resolve(name).ok_or_else(|| ExprError::UnknownReference(name.clone()))
        }
        Expr::Unary { op, expr } => {
            let value = evaluate(expr, resolve)?;
            Ok(match op {
                UnaryOp::Neg => -value,
                UnaryOp::Not => truth(value == 0.0),
            })
        }
        Expr::Binary { op: BinaryOp::And, lhs, rhs } => {
            if evaluate(lhs, resolve)? == 0.0 {
                return Ok(0.0);
            }
            Ok(truth(evaluate(rhs, resolve)? != 0.0))
        }
        Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
            if evaluate(lhs, resolve)? != 0.0 {
                return Ok(1.0);
            }
            Ok(truth(evaluate(rhs, resolve)? != 0.0))
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = evaluate(lhs, resolve)?;
            let r = evaluate(rhs, resolve)?;
            match op {
                BinaryOp::Add => Ok(l + r),
                BinaryOp::Sub => Ok(l - r),
                BinaryOp::Mul => Ok(l * r),
                BinaryOp::Div if r == 0.0 => Err(ExprError::DivisionByZero),
                BinaryOp::Div => Ok(l / r),
                BinaryOp::Rem if r == 0.0 => Err(ExprError::DivisionByZero),
                BinaryOp::Rem => Ok(l % r),
                BinaryOp::Lt => Ok(truth(l < r)),
                BinaryOp::Le => Ok(truth(l <= r)),
                BinaryOp::Gt => Ok(truth(l > r)),
                BinaryOp::Ge => Ok(truth(l >= r)),
                BinaryOp::Eq => Ok(truth(l == r)),
                BinaryOp::Ne => Ok(truth(l != r)),
                BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators handled above"),
            }
        }
    }
}

/// Parse and evaluate against a name → value map
pub fn evaluate_str(input: &str, values: &HashMap<String, f64>) -> Result<f64> {
    let expr = parse(input)?;
    evaluate(&expr, &|name| values.get(name).copied())
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
