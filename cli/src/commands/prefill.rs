//! Prefill command

use anyhow::{anyhow, Result};
use colored::Colorize;
use serde_json::Value;
use std::collections::BTreeMap;
use tabled::Tabled;

use forms_prefill::{PrefillResult, PrefillService};

use super::{read_document, read_form, truncate};
use crate::config::Config;
use crate::output::{table, OutputFormat};

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Cached")]
    cached: bool,
    #[tabled(rename = "Value / Error")]
    detail: String,
}

pub async fn handle(
    config: &Config,
    file: &str,
    context: Option<String>,
    lookups: Option<String>,
    key: Option<String>,
    format: OutputFormat,
) -> Result<i32> {
    let form = read_form(file)?;
    let service = PrefillService::new(config.prefill.clone())?;

    if let Some(path) = context {
        service.set_context(read_document(&path)?);
    }
    if let Some(path) = lookups {
        match read_document(&path)? {
            Value::Object(tables) => {
                for (name, table) in tables {
                    service.register_lookup(name, table);
                }
            }
            _ => return Err(anyhow!("{} must be an object of named lookup tables", path)),
        }
    }

    let results = service.prefill_form(&form, key.as_deref()).await;
    let ordered: BTreeMap<&String, &PrefillResult> = results.iter().collect();
    let failed = results.values().filter(|r| !r.success).count();

    format.print(&ordered, |ordered| {
        if ordered.is_empty() {
            return "no fields have a prefill config".to_string();
        }
        let rows = ordered.iter().map(|(id, result)| ResultRow {
            field: id.to_string(),
            status: if result.success { "ok".green().to_string() } else { "failed".red().to_string() },
            source: result.source.clone(),
            cached: result.cached,
            detail: truncate(
                &match (&result.value, &result.error) {
                    (Some(value), _) => value.to_string(),
                    (None, Some(error)) => error.clone(),
                    (None, None) => String::new(),
                },
                80,
            ),
        });
        table(rows)
    })?;
    Ok(if failed == 0 { 0 } else { 1 })
}
