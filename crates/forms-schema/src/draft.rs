//! Lenient draft model
//!
//! Mirrors the builder's JSON with every property optional so that
//! incomplete or inconsistent forms can still be walked by the validator and
//! the diagnostics engine.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::SchemaError;
use crate::model::{formula_references, FieldType};

#[derive(Clone, Debug, Default)]
pub struct FormDraft {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub pages: Vec<PageDraft>,
}

#[derive(Clone, Debug, Default)]
pub struct PageDraft {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub sections: Vec<SectionDraft>,
}

#[derive(Clone, Debug, Default)]
pub struct SectionDraft {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<FieldDraft>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDraft {
    pub id: Option<String>,
    pub field_type: Option<String>,
    pub label: Option<String>,
    pub required: Option<bool>,
    pub width: Option<String>,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub options: Option<Vec<OptionDraft>>,
    pub validation: Option<Vec<RuleDraft>>,
    pub conditional_visibility: Option<VisibilityDraft>,
    pub calculated_config: Option<CalculatedDraft>,
    pub lookup_config: Option<LookupDraft>,
    pub prefill_config: Option<PrefillDraft>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionDraft {
    pub label: Option<String>,
    pub value: Option<Value>,
    #[serde(rename = "type")]
    pub option_type: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleDraft {
    #[serde(rename = "type")]
    pub rule_type: Option<String>,
    pub value: Option<Value>,
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityDraft {
    pub enabled: Option<bool>,
    pub conditions: Option<Vec<ConditionDraft>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConditionDraft {
    pub field_id: Option<String>,
    pub operator: Option<String>,
    pub value: Option<Value>,
    pub logical_operator: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatedDraft {
    pub formula: Option<String>,
    pub dependencies: Option<Vec<String>>,
    pub precision: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LookupDraft {
    pub data_source: Option<String>,
    pub endpoint: Option<String>,
    pub key: Option<String>,
    pub display_field: Option<String>,
    pub value_field: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrefillDraft {
    pub source: Option<String>,
    pub key: Option<String>,
    pub endpoint: Option<String>,
    pub cache: Option<bool>,
    pub cache_duration: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub fallback_value: Option<Value>,
    pub field_mapping: Option<BTreeMap<String, String>>,
}

// =============================================================================
// Reading
// =============================================================================

impl FormDraft {
    /// Read a draft out of arbitrary JSON.
    ///
    /// Structural problems are pushed to `errors` and the offending piece is
    /// skipped; `None` is returned only when the value is not an object.
    pub fn from_value(value: &Value, errors: &mut Vec<SchemaError>) -> Option<Self> {
        let obj = match value.as_object() {
            Some(obj) => obj,
            None => {
                errors.push(SchemaError::NotAnObject);
                return None;
            }
        };

        let mut form = FormDraft {
            id: str_prop(obj, "id"),
            title: str_prop(obj, "title"),
            description: str_prop(obj, "description"),
            pages: Vec::new(),
        };

        let Some(pages) = array_prop(obj, "pages", "form structure", errors) else {
            return Some(form);
        };

        for (p, page) in pages.iter().enumerate() {
            let location = format!("page {}", p + 1);
            let Some(page_obj) = page.as_object() else {
                errors.push(SchemaError::MalformedField {
                    location,
                    reason: "page must be an object".into(),
                });
                continue;
            };
            let mut page_draft = PageDraft {
                id: str_prop(page_obj, "id"),
                title: str_prop(page_obj, "title"),
                description: str_prop(page_obj, "description"),
                sections: Vec::new(),
            };

            if let Some(sections) = array_prop(page_obj, "sections", &location, errors) {
                for (s, section) in sections.iter().enumerate() {
                    let location = format!("page {}, section {}", p + 1, s + 1);
                    if let Some(section_draft) = SectionDraft::read(section, &location, errors) {
                        page_draft.sections.push(section_draft);
                    }
                }
            }
            form.pages.push(page_draft);
        }

        Some(form)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDraft> {
        self.pages
            .iter()
            .flat_map(|p| p.sections.iter())
            .flat_map(|s| s.fields.iter())
    }

    pub fn section_count(&self) -> usize {
        self.pages.iter().map(|p| p.sections.len()).sum()
    }
}

impl SectionDraft {
    fn read(value: &Value, location: &str, errors: &mut Vec<SchemaError>) -> Option<Self> {
        let Some(obj) = value.as_object() else {
            errors.push(SchemaError::MalformedField {
                location: location.to_string(),
                reason: "section must be an object".into(),
            });
            return None;
        };
        let mut section = SectionDraft {
            id: str_prop(obj, "id"),
            title: str_prop(obj, "title"),
            description: str_prop(obj, "description"),
            fields: Vec::new(),
        };
        if let Some(fields) = array_prop(obj, "fields", location, errors) {
            for (f, field) in fields.iter().enumerate() {
                let location = format!("{}, field {}", location, f + 1);
                if let Some(draft) = FieldDraft::read(field, &location, errors) {
                    section.fields.push(draft);
                }
            }
        }
        Some(section)
    }
}

impl FieldDraft {
    /// Read one field property by property.
    ///
    /// A mistyped property is reported and left unset; the rest of the field
    /// is kept so later checks still see it.
    fn read(value: &Value, location: &str, errors: &mut Vec<SchemaError>) -> Option<Self> {
        let Some(obj) = value.as_object() else {
            errors.push(SchemaError::MalformedField {
                location: location.to_string(),
                reason: "field must be an object".into(),
            });
            return None;
        };
        Some(FieldDraft {
            id: typed_prop(obj, "id", location, errors),
            field_type: typed_prop(obj, "field_type", location, errors),
            label: typed_prop(obj, "label", location, errors),
            required: typed_prop(obj, "required", location, errors),
            width: typed_prop(obj, "width", location, errors),
            placeholder: typed_prop(obj, "placeholder", location, errors),
            help_text: typed_prop(obj, "help_text", location, errors),
            options: typed_prop(obj, "options", location, errors),
            validation: typed_prop(obj, "validation", location, errors),
            conditional_visibility: typed_prop(obj, "conditional_visibility", location, errors),
            calculated_config: typed_prop(obj, "calculated_config", location, errors),
            lookup_config: typed_prop(obj, "lookup_config", location, errors),
            prefill_config: typed_prop(obj, "prefill_config", location, errors),
            metadata: typed_prop(obj, "metadata", location, errors),
        })
    }

    /// Label, falling back to the ID, for human-readable messages
    pub fn display_name(&self) -> String {
        match (non_blank(&self.label), non_blank(&self.id)) {
            (Some(label), _) => label.to_string(),
            (None, Some(id)) => id.to_string(),
            (None, None) => "(unnamed field)".to_string(),
        }
    }

    pub fn parsed_type(&self) -> Option<FieldType> {
        self.field_type.as_deref().and_then(|t| t.parse().ok())
    }

    /// Field IDs referenced by enabled visibility conditions and calculated config
    pub fn references(&self) -> Vec<String> {
        let mut refs: Vec<String> = Vec::new();
        let mut push = |id: &str| {
            let id = id.trim();
            if !id.is_empty() && !refs.iter().any(|r| r == id) {
                refs.push(id.to_string());
            }
        };

        if let Some(visibility) = &self.conditional_visibility {
            if visibility.enabled.unwrap_or(true) {
                for condition in visibility.conditions.iter().flatten() {
                    if let Some(id) = &condition.field_id {
                        push(id);
                    }
                }
            }
        }
        if let Some(calc) = &self.calculated_config {
            for dep in calc.dependencies.iter().flatten() {
                push(dep);
            }
            if let Some(formula) = &calc.formula {
                for name in formula_references(formula) {
                    push(&name);
                }
            }
        }
        refs
    }
}

impl OptionDraft {
    /// Option value as text; numbers and booleans are accepted
    pub fn value_text(&self) -> Option<String> {
        match &self.value {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Treat missing and whitespace-only strings alike
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn str_prop(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn typed_prop<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    key: &str,
    location: &str,
    errors: &mut Vec<SchemaError>,
) -> Option<T> {
    let value = obj.get(key).filter(|v| !v.is_null())?;
    match T::deserialize(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            errors.push(SchemaError::MistypedProperty {
                location: location.to_string(),
                property: key.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}

fn array_prop<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    location: &str,
    errors: &mut Vec<SchemaError>,
) -> Option<&'a Vec<Value>> {
    match obj.get(key).and_then(Value::as_array) {
        Some(items) => Some(items),
        None => {
            errors.push(SchemaError::MissingCollection {
                location: location.to_string(),
                property: key.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_nested_structure() {
        let value = json!({
            "title": "Intake",
            "pages": [{
                "id": "p1",
                "sections": [{
                    "id": "s1",
                    "fields": [
                        { "id": "name", "field_type": "text", "label": "Name" },
                        { "id": "age", "field_type": "number" }
                    ]
                }]
            }]
        });
        let mut errors = Vec::new();
        let draft = FormDraft::from_value(&value, &mut errors).unwrap();
        assert!(errors.is_empty());
        assert_eq!(draft.fields().count(), 2);
        assert_eq!(draft.section_count(), 1);
        assert_eq!(draft.fields().nth(1).unwrap().display_name(), "age");
    }

    #[test]
    fn test_collects_structural_problems() {
        let value = json!({
            "pages": [
                { "id": "p1" },
                { "id": "p2", "sections": [{ "fields": [{ "id": 5, "options": "nope" }] }] }
            ]
        });
        let mut errors = Vec::new();
        let draft = FormDraft::from_value(&value, &mut errors).unwrap();
        assert_eq!(errors.len(), 3);
        assert_eq!(draft.pages.len(), 2);
        assert_eq!(draft.fields().count(), 1);
    }

    #[test]
    fn test_mistyped_property_keeps_field() {
        let value = json!({
            "pages": [{
                "sections": [{
                    "fields": [
                        { "id": "color", "field_type": "select", "label": 5, "required": "yes", "options": [] },
                        "not a field"
                    ]
                }]
            }]
        });
        let mut errors = Vec::new();
        let draft = FormDraft::from_value(&value, &mut errors).unwrap();

        let mistyped: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                SchemaError::MistypedProperty { property, .. } => Some(property.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(mistyped, vec!["label", "required"]);
        assert!(matches!(&errors[2], SchemaError::MalformedField { location, .. } if location.ends_with("field 2")));

        let field = draft.fields().next().unwrap();
        assert_eq!(field.display_name(), "color");
        assert_eq!(field.label, None);
        assert_eq!(field.options.as_ref().map(Vec::len), Some(0));
    }

    #[test]
    fn test_rejects_non_object() {
        let mut errors = Vec::new();
        assert!(FormDraft::from_value(&json!([1, 2]), &mut errors).is_none());
        assert_eq!(errors, vec![SchemaError::NotAnObject]);
    }

    #[test]
    fn test_references_skip_disabled_visibility() {
        let field: FieldDraft = serde_json::from_value(json!({
            "id": "total",
            "conditional_visibility": {
                "enabled": false,
                "conditions": [{ "fieldId": "flag", "operator": "is_empty" }]
            },
            "calculated_config": { "formula": "{a} + {b}", "dependencies": ["a"] }
        }))
        .unwrap();
        assert_eq!(field.references(), vec!["a", "b"]);
    }
}
