//! Validate command

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use forms_schema::{validate_form_structure, ValidationOutcome};

use super::read_document;
use crate::output::{table, OutputFormat};

#[derive(Debug, Serialize)]
pub struct ValidationSummary {
    pub valid: bool,
    pub field_count: usize,
    pub errors: Vec<String>,
}

#[derive(Tabled)]
struct ErrorRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Error")]
    message: String,
}

pub fn handle(file: &str, format: OutputFormat) -> Result<i32> {
    let value = read_document(file)?;
    let summary = match validate_form_structure(&value) {
        ValidationOutcome::Valid(form) => ValidationSummary {
            valid: true,
            field_count: form.field_count(),
            errors: Vec::new(),
        },
        ValidationOutcome::Invalid(errors) => ValidationSummary {
            valid: false,
            field_count: 0,
            errors,
        },
    };

    format.print(&summary, |s| {
        if s.valid {
            format!("{} {} ({} fields)", "✓".green(), file, s.field_count)
        } else {
            let rows = s.errors.iter().enumerate().map(|(i, e)| ErrorRow { index: i + 1, message: e.clone() });
            format!("{} {} has {} errors\n{}", "✗".red(), file, s.errors.len(), table(rows))
        }
    })?;
    Ok(if summary.valid { 0 } else { 1 })
}
