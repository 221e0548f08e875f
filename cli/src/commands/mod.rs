//! CLI Commands

pub mod config;
pub mod diagnose;
pub mod eval;
pub mod grid;
pub mod prefill;
pub mod settings;
pub mod submit;
pub mod validate;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

use forms_schema::{validate_form_structure, Form};

/// Read a JSON or YAML document; `-` reads stdin as JSON
pub fn read_document(path: &str) -> Result<Value> {
    if path == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return serde_json::from_str(&input).context("parsing stdin as JSON");
    }

    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let is_yaml = matches!(
        Path::new(path).extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("parsing {} as YAML", path))
    } else {
        serde_json::from_str(&content).with_context(|| format!("parsing {} as JSON", path))
    }
}

/// Read and validate a form, failing with every validation error
pub fn read_form(path: &str) -> Result<Form> {
    let value = read_document(path)?;
    validate_form_structure(&value).into_result().map_err(|errors| {
        anyhow!("{} is not a valid form:\n  - {}", path, errors.join("\n  - "))
    })
}

/// Shorten long values for table cells
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}
