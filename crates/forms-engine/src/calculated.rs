//! Calculated field evaluation
//!
//! Formulas run in dependency order so a calculated field can read another
//! one, either as `{field_id}` or as a bare identifier. A formula may only
//! read its declared dependencies, or any field of the form when it declares
//! none.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use forms_expr::{evaluate, parse, parse_cell_value};
use forms_schema::{CalculatedConfig, FieldKind, FieldValues, Form};

use crate::error::EngineError;
use crate::graph::DependencyGraph;

#[derive(Debug, Default)]
pub struct Calculation {
    /// Field ID → computed value
    pub values: HashMap<String, f64>,
    /// Calculated fields on or behind a dependency cycle
    pub skipped: Vec<String>,
    pub errors: Vec<EngineError>,
}

impl Calculation {
    /// Computed values merged over the submitted ones
    pub fn merged_into(&self, values: &FieldValues) -> FieldValues {
        let mut merged = values.clone();
        for (id, value) in &self.values {
            merged.insert(id.clone(), Value::from(*value));
        }
        merged
    }
}

pub fn compute_calculated_values(form: &Form, values: &FieldValues) -> Calculation {
    let graph = DependencyGraph::from_form(form);
    let (ordered, blocked) = graph.evaluation_order();
    let all_ids: HashSet<&str> = form.fields().map(|f| f.id.as_str()).collect();

    let mut calc = Calculation::default();

    for id in &ordered {
        let Some(field) = form.field(id) else { continue };
        let FieldKind::Calculated(config) = &field.kind else { continue };

        match run_formula(config, &all_ids, values, &calc.values) {
            Ok(value) => {
                debug!(field = %id, value, "calculated field");
                calc.values.insert(id.clone(), value);
            }
            Err(source) => {
                warn!(field = %id, error = %source, "calculated field failed");
                calc.errors.push(EngineError::Formula { field_id: id.clone(), source });
            }
        }
    }

    for id in blocked {
        let calculated = form
            .field(&id)
            .map_or(false, |f| matches!(f.kind, FieldKind::Calculated(_)));
        if calculated {
            warn!(field = %id, "calculated field skipped, circular dependency");
            calc.errors.push(EngineError::Circular(id.clone()));
            calc.skipped.push(id);
        }
    }

    calc
}

fn run_formula(
    config: &CalculatedConfig,
    all_ids: &HashSet<&str>,
    values: &FieldValues,
    computed: &HashMap<String, f64>,
) -> forms_expr::Result<f64> {
    let declared: HashSet<&str> = config.dependencies.iter().map(String::as_str).collect();
    let allowed = |name: &str| {
        if declared.is_empty() {
            all_ids.contains(name)
        } else {
            declared.contains(name)
        }
    };

    let expr = parse(&config.formula)?;
    let value = evaluate(&expr, &|name| {
        if !allowed(name) {
            return None;
        }
        Some(
            computed
                .get(name)
                .copied()
                .unwrap_or_else(|| values.get(name).map_or(0.0, numeric_value)),
        )
    })?;

    Ok(match config.precision {
        Some(places) => round_to(value, places),
        None => value,
    })
}

/// Permissive numeric reading of a submitted value; blanks count as `0`
fn numeric_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_cell_value(s),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places.min(15) as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use forms_schema::validate_form_structure;
    use serde_json::json;

    fn form(fields: Value) -> Form {
        let value = json!({
            "pages": [{ "id": "p1", "sections": [{ "id": "s1", "fields": fields }] }]
        });
        validate_form_structure(&value).into_result().unwrap()
    }

    fn values(v: Value) -> FieldValues {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_chained_calculations() {
        let form = form(json!([
            {
                "id": "total",
                "field_type": "calculated",
                "calculated_config": { "formula": "{subtotal} * 1.08", "precision": 2 }
            },
            {
                "id": "subtotal",
                "field_type": "calculated",
                "calculated_config": { "formula": "{price} * {qty}", "dependencies": ["price", "qty"] }
            },
            { "id": "price", "field_type": "currency" },
            { "id": "qty", "field_type": "number" }
        ]));
        let calc = compute_calculated_values(&form, &values(json!({ "price": "$12.50", "qty": 3 })));
        assert!(calc.errors.is_empty());
        assert_eq!(calc.values["subtotal"], 37.5);
        assert_eq!(calc.values["total"], 40.5);

        let merged = calc.merged_into(&FieldValues::new());
        assert_eq!(merged["total"], json!(40.5));
    }

    #[test]
    fn test_missing_values_read_as_zero() {
        let form = form(json!([
            { "id": "sum", "field_type": "calculated", "calculated_config": { "formula": "{a} + {b}" } },
            { "id": "a", "field_type": "number" },
            { "id": "b", "field_type": "number" }
        ]));
        let calc = compute_calculated_values(&form, &values(json!({ "a": 4 })));
        assert_eq!(calc.values["sum"], 4.0);
    }

    #[test]
    fn test_undeclared_reference_is_rejected() {
        let form = form(json!([
            {
                "id": "out",
                "field_type": "calculated",
                "calculated_config": { "formula": "{a} + {secret}", "dependencies": ["a"] }
            },
            { "id": "a", "field_type": "number" },
            { "id": "secret", "field_type": "hidden" }
        ]));
        let calc = compute_calculated_values(&form, &values(json!({ "a": 1, "secret": 99 })));
        assert!(calc.values.is_empty());
        assert!(matches!(&calc.errors[0], EngineError::Formula { field_id, .. } if field_id == "out"));
    }

    #[test]
    fn test_cycles_are_skipped() {
        let form = form(json!([
            { "id": "x", "field_type": "calculated", "calculated_config": { "formula": "{y} + 1" } },
            { "id": "y", "field_type": "calculated", "calculated_config": { "formula": "{x} + 1" } },
            { "id": "z", "field_type": "calculated", "calculated_config": { "formula": "2 * 3" } }
        ]));
        let calc = compute_calculated_values(&form, &FieldValues::new());
        assert_eq!(calc.values["z"], 6.0);
        assert_eq!(calc.skipped, vec!["x", "y"]);
        assert_eq!(calc.errors.len(), 2);
    }

    #[test]
    fn test_bare_names_follow_dependency_order() {
        let form = form(json!([
            { "id": "total", "field_type": "calculated", "calculated_config": { "formula": "sub * 2" } },
            { "id": "sub", "field_type": "calculated", "calculated_config": { "formula": "{price} + 1" } },
            { "id": "price", "field_type": "number" }
        ]));
        let calc = compute_calculated_values(&form, &values(json!({ "price": 4 })));
        assert!(calc.errors.is_empty());
        assert_eq!(calc.values["sub"], 5.0);
        assert_eq!(calc.values["total"], 10.0);
    }

    #[test]
    fn test_bare_name_cycle_is_skipped() {
        let form = form(json!([
            { "id": "x", "field_type": "calculated", "calculated_config": { "formula": "y + 1" } },
            { "id": "y", "field_type": "calculated", "calculated_config": { "formula": "x + 1" } }
        ]));
        let calc = compute_calculated_values(&form, &FieldValues::new());
        assert!(calc.values.is_empty());
        assert_eq!(calc.skipped, vec!["x", "y"]);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.345, 1), 2.3);
        assert_eq!(round_to(2.5, 0), 3.0);
    }
}
