//! Comparable-sales grid summary rows
//!
//! A summary row aggregates selected rows of one grid column (the subject
//! property or a specific comparable). Cell text is parsed permissively:
//! `"$1,250.50"` reads as `1250.5`, anything unparsable as `0`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::error::Result;
use crate::eval::evaluate;
use crate::parser::parse;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SalesGrid {
    pub rows: Vec<GridRow>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GridRow {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub comparables: Vec<String>,
}

/// Column a summary is computed over
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridColumn {
    Subject,
    /// Zero-based comparable index
    Comparable(usize),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "expression", rename_all = "lowercase")]
pub enum SummaryFormula {
    Sum,
    Average,
    Min,
    Max,
    /// Arithmetic over row IDs, e.g. `sale_price - concessions`.
    /// IDs that are not plain identifiers go in braces: `{sale-price} - {1}`.
    Custom(String),
}

/// Strip everything but digits, `.` and `-`, then parse; `0` on failure
pub fn parse_cell_value(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().unwrap_or(0.0)
}

impl SalesGrid {
    pub fn row(&self, id: &str) -> Option<&GridRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Raw cell text; `None` if the row or comparable does not exist
    pub fn cell(&self, row_id: &str, column: GridColumn) -> Option<&str> {
        let row = self.row(row_id)?;
        match column {
            GridColumn::Subject => Some(row.subject.as_str()),
            GridColumn::Comparable(i) => row.comparables.get(i).map(String::as_str),
        }
    }

    /// Numeric cell value; missing cells read as `0`
    pub fn cell_value(&self, row_id: &str, column: GridColumn) -> f64 {
        self.cell(row_id, column).map(parse_cell_value).unwrap_or(0.0)
    }

    /// Evaluate a summary formula, surfacing errors
    pub fn try_evaluate(
        &self,
        formula: &SummaryFormula,
        target_rows: &[String],
        column: GridColumn,
    ) -> Result<f64> {
        let values: Vec<f64> = target_rows.iter().map(|id| self.cell_value(id, column)).collect();

        let result = match formula {
            SummaryFormula::Sum => values.iter().sum(),
            SummaryFormula::Average if values.is_empty() => 0.0,
            SummaryFormula::Average => values.iter().sum::<f64>() / values.len() as f64,
            SummaryFormula::Min => values.iter().copied().reduce(f64::min).unwrap_or(0.0),
            SummaryFormula::Max => values.iter().copied().reduce(f64::max).unwrap_or(0.0),
            SummaryFormula::Custom(expression) => {
                let bindings: HashMap<&str, f64> = target_rows
                    .iter()
                    .map(String::as_str)
                    .zip(values.iter().copied())
                    .collect();
                let expr = parse(expression)?;
                evaluate(&expr, &|name| bindings.get(name).copied())?
            }
        };
        Ok(result)
    }

    /// Evaluate a summary formula; failures degrade to `0` with a warning
    pub fn evaluate(
        &self,
        formula: &SummaryFormula,
        target_rows: &[String],
        column: GridColumn,
    ) -> f64 {
        match self.try_evaluate(formula, target_rows, column) {
            Ok(value) => value,
            Err(e) => {
                warn!(?formula, ?column, error = %e, "summary formula failed, using 0");
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SalesGrid {
        SalesGrid {
            rows: vec![
                GridRow {
                    id: "a".into(),
                    label: "Sale price".into(),
                    subject: "10".into(),
                    comparables: vec!["$250,000".into(), "240000".into()],
                },
                GridRow {
                    id: "b".into(),
                    label: "Adjustment".into(),
                    subject: "$5.50".into(),
                    comparables: vec!["-1,500".into(), "n/a".into()],
                },
            ]
        }
    }

    fn rows(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_cell_value() {
        assert_eq!(parse_cell_value("$5.50"), 5.5);
        assert_eq!(parse_cell_value("1,250 sq ft"), 1250.0);
        assert_eq!(parse_cell_value("-3"), -3.0);
        assert_eq!(parse_cell_value(""), 0.0);
        assert_eq!(parse_cell_value("n/a"), 0.0);
        assert_eq!(parse_cell_value("1.2.3"), 0.0);
    }

    #[test]
    fn test_sum_over_subject() {
        let grid = grid();
        assert_eq!(grid.evaluate(&SummaryFormula::Sum, &rows(&["a", "b"]), GridColumn::Subject), 15.5);
    }

    #[test]
    fn test_aggregates_over_comparable() {
        let grid = grid();
        let targets = rows(&["a", "b"]);
        let col = GridColumn::Comparable(0);
        assert_eq!(grid.evaluate(&SummaryFormula::Sum, &targets, col), 248_500.0);
        assert_eq!(grid.evaluate(&SummaryFormula::Average, &targets, col), 124_250.0);
        assert_eq!(grid.evaluate(&SummaryFormula::Min, &targets, col), -1_500.0);
        assert_eq!(grid.evaluate(&SummaryFormula::Max, &targets, col), 250_000.0);
    }

    #[test]
    fn test_empty_targets() {
        let grid = grid();
        for formula in [SummaryFormula::Sum, SummaryFormula::Average, SummaryFormula::Min, SummaryFormula::Max] {
            assert_eq!(grid.evaluate(&formula, &[], GridColumn::Subject), 0.0);
        }
    }

    #[test]
    fn test_missing_cells_read_as_zero() {
        let grid = grid();
        assert_eq!(grid.cell_value("a", GridColumn::Comparable(7)), 0.0);
        assert_eq!(grid.evaluate(&SummaryFormula::Sum, &rows(&["a", "zzz"]), GridColumn::Subject), 10.0);
    }

    #[test]
    fn test_custom_formula() {
        let grid = grid();
        let formula = SummaryFormula::Custom("a + b * 2".into());
        let value = grid.evaluate(&formula, &rows(&["a", "b"]), GridColumn::Comparable(0));
        assert_eq!(value, 247_000.0);
    }

    #[test]
    fn test_custom_formula_braced_row_ids() {
        let grid = SalesGrid {
            rows: vec![
                GridRow { id: "sale-price".into(), subject: "$300,000".into(), ..Default::default() },
                GridRow { id: "1".into(), subject: "2,500".into(), ..Default::default() },
            ],
        };
        let targets = rows(&["sale-price", "1"]);
        let formula = SummaryFormula::Custom("{sale-price} - {1}".into());
        assert_eq!(grid.try_evaluate(&formula, &targets, GridColumn::Subject).unwrap(), 297_500.0);

        let bare = SummaryFormula::Custom("sale-price - 1".into());
        assert!(grid.try_evaluate(&bare, &targets, GridColumn::Subject).is_err());
    }

    #[test]
    fn test_custom_formula_failures_degrade_to_zero() {
        let grid = grid();
        let targets = rows(&["a"]);
        let outside_targets = SummaryFormula::Custom("a + b".into());
        assert!(grid.try_evaluate(&outside_targets, &targets, GridColumn::Subject).is_err());
        assert_eq!(grid.evaluate(&outside_targets, &targets, GridColumn::Subject), 0.0);

        let injected = SummaryFormula::Custom("a; process.exit()".into());
        assert_eq!(grid.evaluate(&injected, &targets, GridColumn::Subject), 0.0);
    }

    #[test]
    fn test_formula_wire_format() {
        let custom: SummaryFormula =
            serde_json::from_str(r#"{"type":"custom","expression":"a - b"}"#).unwrap();
        assert_eq!(custom, SummaryFormula::Custom("a - b".into()));
        let sum: SummaryFormula = serde_json::from_str(r#"{"type":"sum"}"#).unwrap();
        assert_eq!(sum, SummaryFormula::Sum);
    }
}
