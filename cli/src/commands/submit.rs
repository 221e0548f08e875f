//! Submit command

use anyhow::{anyhow, Result};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tabled::Tabled;

use forms_engine::{
    apply_carryforward, compute_calculated_values, is_field_visible, validate_submission,
    CarryforwardRule, FieldError,
};
use forms_schema::FieldValues;

use super::{read_document, read_form};
use crate::output::{table, OutputFormat};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionReport {
    valid: bool,
    carried_forward: Vec<String>,
    calculated: BTreeMap<String, f64>,
    calculation_errors: Vec<String>,
    hidden_fields: Vec<String>,
    errors: Vec<FieldError>,
}

#[derive(Tabled)]
struct ErrorRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "Message")]
    message: String,
}

pub fn handle(
    file: &str,
    values_file: &str,
    carryforward: Option<String>,
    format: OutputFormat,
) -> Result<i32> {
    let form = read_form(file)?;
    let mut values: FieldValues = match read_document(values_file)? {
        Value::Object(map) => map.into_iter().collect(),
        _ => return Err(anyhow!("{} must be an object of field values", values_file)),
    };

    let carried_forward = match carryforward {
        Some(path) => {
            let rules: Vec<CarryforwardRule> = serde_json::from_value(read_document(&path)?)?;
            apply_carryforward(&rules, &mut values)
        }
        None => Vec::new(),
    };

    let calculation = compute_calculated_values(&form, &values);
    let values = calculation.merged_into(&values);
    let errors = validate_submission(&form, &values);
    let hidden_fields = form
        .fields()
        .filter(|field| !is_field_visible(field, &values))
        .map(|field| field.id.clone())
        .collect();

    let report = SubmissionReport {
        valid: errors.is_empty(),
        carried_forward,
        calculated: calculation.values.into_iter().collect(),
        calculation_errors: calculation.errors.iter().map(ToString::to_string).collect(),
        hidden_fields,
        errors,
    };

    format.print(&report, render)?;
    Ok(if report.valid { 0 } else { 1 })
}

fn render(report: &SubmissionReport) -> String {
    let mut out = String::new();
    for (id, value) in &report.calculated {
        out.push_str(&format!("{} = {}\n", id.bold(), value));
    }
    for error in &report.calculation_errors {
        out.push_str(&format!("{} {}\n", "calculation:".yellow(), error));
    }
    if !report.hidden_fields.is_empty() {
        out.push_str(&format!("hidden: {}\n", report.hidden_fields.join(", ")));
    }
    if report.valid {
        out.push_str(&format!("{}", "✓ submission is valid".green()));
    } else {
        let rows = report.errors.iter().map(|e| ErrorRow {
            field: e.field_id.clone(),
            rule: e.rule.as_str().to_string(),
            message: e.message.clone(),
        });
        out.push_str(&table(rows));
    }
    out
}
