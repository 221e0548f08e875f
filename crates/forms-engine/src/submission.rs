//! Submission validation
//!
//! Applies each visible field's rules to submitted values and returns every
//! violation. Hidden fields are never validated. Optional fields left empty
//! skip their remaining rules.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use forms_schema::{Field, FieldValues, Form, RuleKind, ValidationRule};

use crate::render::numeric;
use crate::visibility::{as_number, as_text, is_empty, is_field_visible};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field_id: String,
    pub rule: RuleKind,
    pub message: String,
}

pub fn validate_submission(form: &Form, values: &FieldValues) -> Vec<FieldError> {
    form.fields()
        .filter(|field| is_field_visible(field, values))
        .flat_map(|field| validate_field(field, values.get(&field.id)))
        .collect()
}

pub fn validate_field(field: &Field, value: Option<&Value>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let required = field.required || field.validation.iter().any(|r| r.kind == RuleKind::Required);

    if is_empty(value) {
        if required {
            let rule = field.validation.iter().find(|r| r.kind == RuleKind::Required);
            errors.push(FieldError {
                field_id: field.id.clone(),
                rule: RuleKind::Required,
                message: custom_message(rule)
                    .unwrap_or_else(|| format!("{} is required", label(field))),
            });
        }
        return errors;
    }
    let Some(value) = value else { return errors };

    for rule in &field.validation {
        if let Some(message) = check_rule(field, rule, value) {
            errors.push(FieldError {
                field_id: field.id.clone(),
                rule: rule.kind,
                message: custom_message(Some(rule)).unwrap_or(message),
            });
        }
    }
    errors
}

/// Default message when the rule is violated, `None` when it holds
fn check_rule(field: &Field, rule: &ValidationRule, value: &Value) -> Option<String> {
    let name = label(field);
    match rule.kind {
        RuleKind::Required => None,
        RuleKind::Min | RuleKind::Max => {
            let bound = numeric(rule.value.as_ref())?;
            let Some(n) = as_number(value) else {
                return Some(format!("{} must be a number", name));
            };
            match rule.kind {
                RuleKind::Min if n < bound => Some(format!("{} must be at least {}", name, bound)),
                RuleKind::Max if n > bound => Some(format!("{} must be at most {}", name, bound)),
                _ => None,
            }
        }
        RuleKind::MinLength | RuleKind::MaxLength => {
            let bound = numeric(rule.value.as_ref())? as usize;
            let len = length(value);
            match rule.kind {
                RuleKind::MinLength if len < bound => {
                    Some(format!("{} must be at least {} characters", name, bound))
                }
                RuleKind::MaxLength if len > bound => {
                    Some(format!("{} must be at most {} characters", name, bound))
                }
                _ => None,
            }
        }
        RuleKind::Pattern => {
            let pattern = rule.value.as_ref().and_then(Value::as_str)?;
            let re = match Regex::new(pattern) {
                Ok(re) => re,
                Err(e) => {
                    warn!(field = %field.id, error = %e, "skipping invalid pattern rule");
                    return None;
                }
            };
            let text = as_text(value).unwrap_or_default();
            (!re.is_match(&text)).then(|| format!("{} has an invalid format", name))
        }
        RuleKind::Email => {
            let text = as_text(value).unwrap_or_default();
            (!looks_like_email(text.trim()))
                .then(|| format!("{} must be a valid email address", name))
        }
        RuleKind::Custom => {
            let expression = rule.value.as_ref().and_then(Value::as_str)?;
            let bound = as_number(value);
            let outcome = forms_expr::parse(expression).and_then(|expr| {
                forms_expr::evaluate(&expr, &|n| if n == "value" { bound } else { None })
            });
            match outcome {
                Ok(result) if result != 0.0 => None,
                Ok(_) => Some(format!("{} is invalid", name)),
                Err(e) => {
                    warn!(field = %field.id, error = %e, "custom rule could not be evaluated");
                    Some(format!("{} is invalid", name))
                }
            }
        }
    }
}

fn custom_message(rule: Option<&ValidationRule>) -> Option<String> {
    rule?.message.clone().filter(|m| !m.trim().is_empty())
}

fn label(field: &Field) -> &str {
    if field.label.trim().is_empty() {
        &field.id
    } else {
        &field.label
    }
}

fn length(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        other => as_text(other).map_or(0, |s| s.chars().count()),
    }
}

/// `local@domain.tld` with no whitespace
fn looks_like_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    matches!(domain.rsplit_once('.'), Some((host, tld)) if !host.is_empty() && !tld.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forms_schema::validate_form_structure;
    use serde_json::json;

    fn form() -> Form {
        let value = json!({
            "pages": [{
                "id": "p1",
                "sections": [{
                    "id": "s1",
                    "fields": [
                        { "id": "email", "field_type": "email", "label": "Email", "required": true,
                          "validation": [{ "type": "email" }] },
                        { "id": "age", "field_type": "number", "label": "Age",
                          "validation": [{ "type": "min", "value": 18 }, { "type": "max", "value": 120 }] },
                        { "id": "code", "field_type": "text", "label": "Code",
                          "validation": [
                              { "type": "pattern", "value": "^[A-Z]{3}$", "message": "Use three capitals" },
                              { "type": "max_length", "value": 3 }
                          ] },
                        { "id": "even", "field_type": "number", "label": "Even",
                          "validation": [{ "type": "custom", "value": "{value} % 2 == 0" }] },
                        { "id": "guardian", "field_type": "text", "label": "Guardian",
                          "validation": [{ "type": "required" }],
                          "conditional_visibility": {
                              "enabled": true,
                              "conditions": [{ "fieldId": "age", "operator": "less_than", "value": 18 }]
                          } }
                    ]
                }]
            }]
        });
        validate_form_structure(&value).into_result().unwrap()
    }

    fn values(v: Value) -> FieldValues {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_valid_submission() {
        let errors = validate_submission(
            &form(),
            &values(json!({ "email": "a@b.co", "age": 30, "code": "ABC", "even": 4 })),
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_collects_every_violation() {
        let errors = validate_submission(
            &form(),
            &values(json!({ "age": "150", "code": "abcd", "even": 3 })),
        );
        let summary: Vec<(&str, RuleKind)> =
            errors.iter().map(|e| (e.field_id.as_str(), e.rule)).collect();
        assert_eq!(
            summary,
            vec![
                ("email", RuleKind::Required),
                ("age", RuleKind::Max),
                ("code", RuleKind::Pattern),
                ("code", RuleKind::MaxLength),
                ("even", RuleKind::Custom),
            ]
        );
        assert_eq!(errors[2].message, "Use three capitals");
        assert_eq!(errors[0].message, "Email is required");
    }

    #[test]
    fn test_hidden_fields_are_skipped() {
        let minor = values(json!({ "email": "kid@example.com", "age": 12 }));
        let errors = validate_submission(&form(), &minor);
        let ids: Vec<&str> = errors.iter().map(|e| e.field_id.as_str()).collect();
        assert_eq!(ids, vec!["age", "guardian"]);
    }

    #[test]
    fn test_email_rule() {
        let errors = validate_submission(&form(), &values(json!({ "email": "not-an-email" })));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, RuleKind::Email);
    }
}
