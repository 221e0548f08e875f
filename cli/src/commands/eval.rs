//! Eval command

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;

use forms_expr::evaluate_str;

use crate::output::OutputFormat;

#[derive(Debug, Serialize)]
struct Evaluation<'a> {
    expression: &'a str,
    result: f64,
}

pub fn handle(expression: &str, vars: &[String], format: OutputFormat) -> Result<i32> {
    let bindings = parse_bindings(vars)?;
    let result = evaluate_str(expression, &bindings)?;
    format.print(&Evaluation { expression, result }, |e| e.result.to_string())?;
    Ok(0)
}

fn parse_bindings(vars: &[String]) -> Result<HashMap<String, f64>> {
    vars.iter()
        .map(|binding| {
            let (name, value) = binding
                .split_once('=')
                .ok_or_else(|| anyhow!("binding \"{}\" must look like name=value", binding))?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("binding \"{}\" has a non-numeric value", binding))?;
            Ok((name.trim().to_string(), value))
        })
        .collect()
}
