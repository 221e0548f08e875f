//! Form Diagnostics
//!
//! Runs every static check over a form definition and folds the results into
//! one report:
//!
//! 1. schema validation → `SchemaError`
//! 2. dependency cycles → `ConfigError` (one per participant group)
//! 3. simulated render → `RenderError`
//! 4. cosmetic gaps and dangling references → warnings
//!
//! The run is pure and synchronous. Input that cannot be read as a form at
//! all yields a `crashed` report with a single `FatalError`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, info};

use forms_schema::draft::non_blank;
use forms_schema::{validate_draft, FieldDraft, FormDraft, PageDraft, SectionDraft};

use crate::error::{EngineError, Result};
use crate::graph::DependencyGraph;
use crate::render::render_field;

// =============================================================================
// Report Types
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticStatus {
    Passed,
    Failed,
    Crashed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticType {
    SchemaError,
    ConfigError,
    RenderError,
    FatalError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEntry {
    #[serde(rename = "type")]
    pub kind: DiagnosticType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl DiagnosticEntry {
    pub fn error(kind: DiagnosticType, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, message.into())
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagnosticType::ConfigError, Severity::Warning, message.into())
    }

    fn new(kind: DiagnosticType, severity: Severity, message: String) -> Self {
        Self {
            kind,
            field_id: None,
            field_label: None,
            section_id: None,
            section_title: None,
            page_id: None,
            page_title: None,
            message,
            severity,
        }
    }

    fn in_page(mut self, page: &PageDraft) -> Self {
        self.page_id = page.id.clone();
        self.page_title = page.title.clone();
        self
    }

    fn in_section(mut self, section: &SectionDraft) -> Self {
        self.section_id = section.id.clone();
        self.section_title = section.title.clone();
        self
    }

    fn on_field(mut self, field: &FieldDraft) -> Self {
        self.field_id = field.id.clone();
        self.field_label = field.label.clone();
        self
    }

    fn at(self, site: &FieldSite<'_>) -> Self {
        self.in_page(site.page).in_section(site.section).on_field(site.field)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsReport {
    pub status: DiagnosticStatus,
    pub errors: Vec<DiagnosticEntry>,
    pub warnings: Vec<DiagnosticEntry>,
    pub field_count: usize,
    pub section_count: usize,
    pub page_count: usize,
    /// Milliseconds
    pub execution_time: f64,
    pub generated_at: DateTime<Utc>,
}

impl DiagnosticsReport {
    fn crashed(e: &EngineError) -> Self {
        Self {
            status: DiagnosticStatus::Crashed,
            errors: vec![DiagnosticEntry::error(
                DiagnosticType::FatalError,
                format!("Diagnostics crashed: {}", e),
            )],
            warnings: Vec::new(),
            field_count: 0,
            section_count: 0,
            page_count: 0,
            execution_time: 0.0,
            generated_at: Utc::now(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == DiagnosticStatus::Passed
    }

    /// Errors of one type
    pub fn errors_of(&self, kind: DiagnosticType) -> impl Iterator<Item = &DiagnosticEntry> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Run every diagnostic over a form structure of unknown shape
pub fn run_form_diagnostics(form: &Value) -> DiagnosticsReport {
    let started = Instant::now();

    let mut report = match diagnose(form) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "form diagnostics crashed");
            DiagnosticsReport::crashed(&e)
        }
    };
    report.execution_time = started.elapsed().as_secs_f64() * 1000.0;

    info!(
        status = ?report.status,
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        elapsed_ms = report.execution_time,
        "form diagnostics complete"
    );
    report
}

/// Field together with where it lives
struct FieldSite<'a> {
    page: &'a PageDraft,
    section: &'a SectionDraft,
    field: &'a FieldDraft,
}

fn diagnose(form: &Value) -> Result<DiagnosticsReport> {
    let mut structural = Vec::new();
    let draft = FormDraft::from_value(form, &mut structural)
        .ok_or_else(|| EngineError::MalformedForm("expected a JSON object".into()))?;

    let sites: Vec<FieldSite<'_>> = draft
        .pages
        .iter()
        .flat_map(|page| {
            page.sections.iter().flat_map(move |section| {
                section.fields.iter().map(move |field| FieldSite { page, section, field })
            })
        })
        .collect();

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // 1. schema
    errors.extend(
        structural
            .iter()
            .map(|e| DiagnosticEntry::error(DiagnosticType::SchemaError, e.to_string())),
    );
    errors.extend(
        validate_draft(&draft)
            .errors()
            .iter()
            .map(|e| DiagnosticEntry::error(DiagnosticType::SchemaError, e.clone())),
    );

    // 2. dependencies
    let by_id: HashMap<&str, &FieldSite<'_>> = sites
        .iter()
        .rev()
        .filter_map(|site| non_blank(&site.field.id).map(|id| (id, site)))
        .collect();
    let graph = DependencyGraph::from_draft(&draft);

    for cycle in graph.find_cycles() {
        let entry = DiagnosticEntry::error(
            DiagnosticType::ConfigError,
            format!(
                "Circular dependency between fields {}: {}",
                cycle.fields.join(", "),
                cycle.describe()
            ),
        );
        let entry = match cycle.fields.first().and_then(|id| by_id.get(id.as_str())) {
            Some(site) => entry.at(site),
            None => entry,
        };
        errors.push(entry);
    }

    for (from, missing) in graph.dangling() {
        let entry = DiagnosticEntry::warning(format!(
            "Field \"{}\" references unknown field \"{}\"",
            from, missing
        ));
        let entry = match by_id.get(from.as_str()) {
            Some(site) => entry.at(site),
            None => entry,
        };
        warnings.push(entry);
    }

    // 3. render
    for site in &sites {
        for problem in render_field(site.field) {
            errors.push(
                DiagnosticEntry::error(
                    DiagnosticType::RenderError,
                    format!("Field \"{}\": {}", site.field.display_name(), problem),
                )
                .at(site),
            );
        }
    }

    // 4. cosmetic
    for (p, page) in draft.pages.iter().enumerate() {
        if non_blank(&page.description).is_none() {
            warnings.push(
                DiagnosticEntry::warning(format!("Page {} has no description", p + 1)).in_page(page),
            );
        }
        for (s, section) in page.sections.iter().enumerate() {
            if non_blank(&section.title).is_none() {
                warnings.push(
                    DiagnosticEntry::warning(format!(
                        "Section {} on page {} has no title",
                        s + 1,
                        p + 1
                    ))
                    .in_page(page)
                    .in_section(section),
                );
            }
        }
    }
    for site in &sites {
        let complex = site.field.parsed_type().filter(|t| t.is_complex());
        if let Some(field_type) = complex {
            if non_blank(&site.field.help_text).is_none() {
                warnings.push(
                    DiagnosticEntry::warning(format!(
                        "{} field \"{}\" has no help text",
                        field_type,
                        site.field.display_name()
                    ))
                    .at(site),
                );
            }
        }
    }

    let status = if errors.is_empty() {
        DiagnosticStatus::Passed
    } else {
        DiagnosticStatus::Failed
    };
    debug!(fields = sites.len(), ?status, "diagnostics pipeline finished");

    Ok(DiagnosticsReport {
        status,
        errors,
        warnings,
        field_count: sites.len(),
        section_count: draft.section_count(),
        page_count: draft.pages.len(),
        execution_time: 0.0,
        generated_at: Utc::now(),
    })
}
