//! Grid command

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;

use forms_expr::{GridColumn, SalesGrid, SummaryFormula};

use super::read_document;
use crate::output::OutputFormat;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormulaKind {
    Sum,
    Average,
    Min,
    Max,
    Custom,
}

#[derive(Debug, Serialize)]
struct Summary {
    formula: SummaryFormula,
    column: GridColumn,
    rows: Vec<String>,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn handle(
    file: &str,
    kind: FormulaKind,
    expression: Option<String>,
    rows: &[String],
    column: &str,
    format: OutputFormat,
) -> Result<i32> {
    let grid = read_grid(file)?;
    let formula = build_formula(kind, expression)?;
    let column = parse_column(column)?;

    let (value, error) = match grid.try_evaluate(&formula, rows, column) {
        Ok(value) => (value, None),
        Err(e) => {
            tracing::warn!(error = %e, "summary formula failed, using 0");
            (0.0, Some(e.to_string()))
        }
    };

    let summary = Summary { formula, column, rows: rows.to_vec(), value, error };
    format.print(&summary, |s| match &s.error {
        Some(e) => format!("{} ({})", s.value, e),
        None => s.value.to_string(),
    })?;
    Ok(0)
}

/// Accepts `{ "rows": [...] }` or a bare array of rows
fn read_grid(file: &str) -> Result<SalesGrid> {
    let value = read_document(file)?;
    let grid = match value {
        Value::Array(_) => SalesGrid { rows: serde_json::from_value(value)? },
        other => serde_json::from_value(other)?,
    };
    Ok(grid)
}

fn build_formula(kind: FormulaKind, expression: Option<String>) -> Result<SummaryFormula> {
    Ok(match kind {
        FormulaKind::Sum => SummaryFormula::Sum,
        FormulaKind::Average => SummaryFormula::Average,
        FormulaKind::Min => SummaryFormula::Min,
        FormulaKind::Max => SummaryFormula::Max,
        FormulaKind::Custom => SummaryFormula::Custom(
            expression.ok_or_else(|| anyhow!("--formula custom needs --expression"))?,
        ),
    })
}

fn parse_column(column: &str) -> Result<GridColumn> {
    if column.eq_ignore_ascii_case("subject") {
        return Ok(GridColumn::Subject);
    }
    column
        .parse::<usize>()
        .map(GridColumn::Comparable)
        .map_err(|_| anyhow!("column must be \"subject\" or a comparable index, got \"{}\"", column))
}
