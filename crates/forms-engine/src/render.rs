//! Simulated render checks
//!
//! Walks each field the way the preview renderer would and reports every
//! configuration that would fail to render or behave. Works on the draft so
//! that forms rejected by the validator are still inspected.

use forms_schema::draft::{non_blank, CalculatedDraft, FieldDraft, PrefillDraft, RuleDraft, VisibilityDraft};
use forms_schema::{formula_references, ConditionOperator, DataSource, FieldType, RuleKind};
use regex::Regex;
use serde_json::Value;

/// Problems found rendering one field, as human-readable sentences
pub fn render_field(field: &FieldDraft) -> Vec<String> {
    let mut problems = Vec::new();

    if let Some(field_type) = field.parsed_type() {
        if field_type.is_choice() || field_type == FieldType::Matrix {
            check_options(field, field_type, &mut problems);
        }
        if field_type == FieldType::Calculated {
            check_calculated(field.calculated_config.as_ref(), &mut problems);
        }
    }
    if let Some(visibility) = &field.conditional_visibility {
        check_visibility(visibility, &mut problems);
    }
    if let Some(prefill) = &field.prefill_config {
        check_prefill(prefill, &mut problems);
    }
    for (i, rule) in field.validation.iter().flatten().enumerate() {
        check_rule(rule, i + 1, &mut problems);
    }

    problems
}

fn check_options(field: &FieldDraft, field_type: FieldType, problems: &mut Vec<String>) {
    let options = field.options.as_deref().unwrap_or_default();
    if options.is_empty() {
        problems.push(format!("{} field has no options to render", field_type));
        return;
    }
    for (i, option) in options.iter().enumerate() {
        if option.value_text().map_or(true, |v| v.trim().is_empty()) {
            problems.push(format!("option {} has no value", i + 1));
        }
        if non_blank(&option.label).is_none() {
            problems.push(format!("option {} has no label", i + 1));
        }
    }
}

fn check_calculated(config: Option<&CalculatedDraft>, problems: &mut Vec<String>) {
    let Some(config) = config else {
        problems.push("calculated field has no calculated_config".into());
        return;
    };
    let Some(formula) = non_blank(&config.formula) else {
        problems.push("calculated formula is empty".into());
        return;
    };

    let declared = config.dependencies.as_ref().map_or(0, Vec::len);
    if declared == 0 && formula_references(formula).is_empty() {
        problems.push("calculated formula does not depend on any field".into());
    }
    if let Err(e) = forms_expr::parse(formula) {
        problems.push(format!("calculated formula cannot be parsed: {}", e));
    }
}

fn check_visibility(visibility: &VisibilityDraft, problems: &mut Vec<String>) {
    if !visibility.enabled.unwrap_or(true) {
        return;
    }
    let conditions = visibility.conditions.as_deref().unwrap_or_default();
    if conditions.is_empty() {
        problems.push("conditional visibility is enabled but has no conditions".into());
        return;
    }

    for (i, condition) in conditions.iter().enumerate() {
        let n = i + 1;
        if non_blank(&condition.field_id).is_none() {
            problems.push(format!("condition {} does not name a field", n));
        }
        let operator = match non_blank(&condition.operator) {
            None => {
                problems.push(format!("condition {} has no operator", n));
                continue;
            }
            Some(op) => match op.parse::<ConditionOperator>() {
                Ok(op) => op,
                Err(_) => {
                    problems.push(format!("condition {} has unknown operator \"{}\"", n, op));
                    continue;
                }
            },
        };
        if !operator.is_unary() && is_blank_value(condition.value.as_ref()) {
            problems.push(format!("condition {} needs a value to compare against", n));
        }
    }
}

fn check_prefill(prefill: &PrefillDraft, problems: &mut Vec<String>) {
    let source = match non_blank(&prefill.source) {
        None => {
            problems.push("prefill config has no source".into());
            return;
        }
        Some(s) => match s.parse::<DataSource>() {
            Ok(source) => source,
            Err(_) => {
                problems.push(format!("prefill config has unknown source \"{}\"", s));
                return;
            }
        },
    };

    match source {
        DataSource::Api if non_blank(&prefill.endpoint).is_none() => {
            problems.push("api prefill requires an endpoint".into());
        }
        DataSource::Internal | DataSource::Lookup if non_blank(&prefill.key).is_none() => {
            problems.push(format!("{} prefill requires a key", source));
        }
        _ => {}
    }
}

fn check_rule(rule: &RuleDraft, n: usize, problems: &mut Vec<String>) {
    let Some(kind) = non_blank(&rule.rule_type).and_then(|t| t.parse::<RuleKind>().ok()) else {
        // reported by the validator
        return;
    };

    if kind.is_numeric_bound() {
        if numeric(rule.value.as_ref()).is_none() {
            problems.push(format!("{} rule {} needs a numeric value", kind.as_str(), n));
        }
        return;
    }

    match kind {
        RuleKind::Pattern => match rule.value.as_ref().and_then(Value::as_str) {
            Some(pattern) if !pattern.is_empty() => {
                if let Err(e) = Regex::new(pattern) {
                    problems.push(format!("pattern rule {} does not compile: {}", n, e));
                }
            }
            _ => problems.push(format!("pattern rule {} has no pattern", n)),
        },
        RuleKind::Custom => match rule.value.as_ref().and_then(Value::as_str) {
            Some(expression) if !expression.trim().is_empty() => {
                if let Err(e) = forms_expr::parse(expression) {
                    problems.push(format!("custom rule {} cannot be parsed: {}", n, e));
                }
            }
            _ => problems.push(format!("custom rule {} has no expression", n)),
        },
        _ => {}
    }
}

/// Number or numeric string
pub(crate) fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_blank_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(value: Value) -> FieldDraft {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_clean_field_has_no_problems() {
        let f = field(json!({
            "id": "color",
            "field_type": "select",
            "options": [{ "label": "Red", "value": "red" }],
            "validation": [{ "type": "required" }, { "type": "pattern", "value": "^[a-z]+$" }]
        }));
        assert!(render_field(&f).is_empty());
    }

    #[test]
    fn test_empty_options() {
        let f = field(json!({ "id": "color", "field_type": "select", "options": [] }));
        assert_eq!(render_field(&f), vec!["select field has no options to render"]);

        let f = field(json!({ "id": "c", "field_type": "radio", "options": [{ "value": "" }] }));
        assert_eq!(render_field(&f), vec!["option 1 has no value", "option 1 has no label"]);
    }

    #[test]
    fn test_calculated_checks() {
        let f = field(json!({ "id": "t", "field_type": "calculated" }));
        assert_eq!(render_field(&f), vec!["calculated field has no calculated_config"]);

        let f = field(json!({
            "id": "t",
            "field_type": "calculated",
            "calculated_config": { "formula": "1 +" }
        }));
        let problems = render_field(&f);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("does not depend"));
        assert!(problems[1].starts_with("calculated formula cannot be parsed"));

        let f = field(json!({
            "id": "t",
            "field_type": "calculated",
            "calculated_config": { "formula": "{a} * 2" }
        }));
        assert!(render_field(&f).is_empty());
    }

    #[test]
    fn test_condition_checks() {
        let f = field(json!({
            "id": "x",
            "field_type": "text",
            "conditional_visibility": {
                "enabled": true,
                "conditions": [
                    { "fieldId": "a", "operator": "equals" },
                    { "fieldId": "a", "operator": "is_empty" },
                    { "operator": "sounds_like", "value": "x" }
                ]
            }
        }));
        assert_eq!(
            render_field(&f),
            vec![
                "condition 1 needs a value to compare against",
                "condition 3 does not name a field",
                "condition 3 has unknown operator \"sounds_like\"",
            ]
        );

        let f = field(json!({
            "id": "x",
            "field_type": "text",
            "conditional_visibility": { "enabled": true, "conditions": [] }
        }));
        assert_eq!(render_field(&f).len(), 1);
    }

    #[test]
    fn test_prefill_checks() {
        let api = field(json!({ "id": "x", "field_type": "text", "prefill_config": { "source": "api" } }));
        assert_eq!(render_field(&api), vec!["api prefill requires an endpoint"]);

        let internal = field(json!({ "id": "x", "field_type": "text", "prefill_config": { "source": "internal" } }));
        assert_eq!(render_field(&internal), vec!["internal prefill requires a key"]);

        let lookup = field(json!({
            "id": "x",
            "field_type": "text",
            "prefill_config": { "source": "lookup", "key": "states" }
        }));
        assert!(render_field(&lookup).is_empty());
    }

    #[test]
    fn test_rule_checks() {
        let f = field(json!({
            "id": "x",
            "field_type": "number",
            "validation": [
                { "type": "min", "value": "3" },
                { "type": "max" },
                { "type": "pattern", "value": "([a-z" },
                { "type": "custom", "value": "{value} >" }
            ]
        }));
        let problems = render_field(&f);
        assert_eq!(problems.len(), 3);
        assert_eq!(problems[0], "max rule 2 needs a numeric value");
        assert!(problems[1].starts_with("pattern rule 3 does not compile"));
        assert!(problems[2].starts_with("custom rule 4 cannot be parsed"));
    }
}
