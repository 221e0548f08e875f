//! Diagnose command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use forms_engine::{run_form_diagnostics, DiagnosticEntry, DiagnosticStatus, DiagnosticsReport, Severity};

use super::{read_document, truncate};
use crate::output::{table, OutputFormat};

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&DiagnosticEntry> for EntryRow {
    fn from(entry: &DiagnosticEntry) -> Self {
        let severity = match entry.severity {
            Severity::Error => "error".red().to_string(),
            Severity::Warning => "warning".yellow().to_string(),
        };
        Self {
            severity,
            kind: format!("{:?}", entry.kind),
            field: entry.field_id.clone().unwrap_or_else(|| "-".into()),
            message: truncate(&entry.message, 100),
        }
    }
}

pub fn handle(file: &str, strict: bool, format: OutputFormat) -> Result<i32> {
    let value = read_document(file)?;
    let report = run_form_diagnostics(&value);
    format.print(&report, render)?;

    Ok(match report.status {
        DiagnosticStatus::Passed => 0,
        DiagnosticStatus::Failed if strict => 1,
        DiagnosticStatus::Failed => 0,
        DiagnosticStatus::Crashed => 2,
    })
}

fn render(report: &DiagnosticsReport) -> String {
    let status = match report.status {
        DiagnosticStatus::Passed => "PASSED".green().bold(),
        DiagnosticStatus::Failed => "FAILED".red().bold(),
        DiagnosticStatus::Crashed => "CRASHED".magenta().bold(),
    };
    let mut out = format!(
        "{}  {} pages · {} sections · {} fields · {:.2} ms\n",
        status, report.page_count, report.section_count, report.field_count, report.execution_time
    );
    let entries: Vec<EntryRow> =
        report.errors.iter().chain(report.warnings.iter()).map(EntryRow::from).collect();
    if !entries.is_empty() {
        out.push_str(&table(entries));
    }
    out
}
