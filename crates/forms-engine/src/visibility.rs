//! Conditional visibility
//!
//! Conditions are folded left to right: each condition after the first joins
//! the running result through its own logical operator. There is no
//! precedence, so `a OR b AND c` reads as `(a OR b) AND c`.

use serde_json::Value;

use forms_schema::{Condition, ConditionOperator, Field, FieldValues, LogicalOperator};

/// Whether a field is shown given the current values
pub fn is_field_visible(field: &Field, values: &FieldValues) -> bool {
    let Some(visibility) = &field.conditional_visibility else {
        return true;
    };
    if !visibility.enabled {
        return true;
    }

    let mut conditions = visibility.conditions.iter();
    let Some(first) = conditions.next() else {
        return true;
    };

    let mut visible = condition_holds(first, values);
    for condition in conditions {
        let holds = condition_holds(condition, values);
        visible = match condition.logical_operator {
            LogicalOperator::And => visible && holds,
            LogicalOperator::Or => visible || holds,
        };
    }
    visible
}

pub fn condition_holds(condition: &Condition, values: &FieldValues) -> bool {
    let actual = values.get(&condition.field_id);
    let expected = condition.value.as_ref();

    match condition.operator {
        ConditionOperator::IsEmpty => is_empty(actual),
        ConditionOperator::IsNotEmpty => !is_empty(actual),
        ConditionOperator::Equals => loosely_equal(actual, expected),
        ConditionOperator::NotEquals => !loosely_equal(actual, expected),
        ConditionOperator::Contains => contains(actual, expected),
        ConditionOperator::NotContains => !contains(actual, expected),
        ConditionOperator::GreaterThan => compare(actual, expected, |a, b| a > b),
        ConditionOperator::LessThan => compare(actual, expected, |a, b| a < b),
        ConditionOperator::GreaterThanOrEqual => compare(actual, expected, |a, b| a >= b),
        ConditionOperator::LessThanOrEqual => compare(actual, expected, |a, b| a <= b),
    }
}

pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Value as text, for comparisons across JSON types
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Value as a number; numeric strings count
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn loosely_equal(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match (actual, expected) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
                return x == y;
            }
            match (as_text(a), as_text(b)) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            }
        }
        (Some(a), None) => a.is_null(),
        (None, Some(b)) => b.is_null(),
    }
}

fn contains(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    let (Some(actual), Some(expected)) = (actual, expected) else {
        return false;
    };
    match actual {
        Value::Array(items) => items.iter().any(|item| loosely_equal(Some(item), Some(expected))),
        other => match (as_text(other), as_text(expected)) {
            (Some(haystack), Some(needle)) => haystack.contains(&needle),
            _ => false,
        },
    }
}

fn compare(actual: Option<&Value>, expected: Option<&Value>, op: fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(as_number), expected.and_then(as_number)) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forms_schema::{ConditionalVisibility, FieldKind, FieldWidth};
    use serde_json::json;

    fn cond(field_id: &str, operator: ConditionOperator, value: Option<Value>, logic: LogicalOperator) -> Condition {
        Condition {
            field_id: field_id.into(),
            operator,
            value,
            logical_operator: logic,
        }
    }

    fn field_with(enabled: bool, conditions: Vec<Condition>) -> Field {
        Field {
            id: "target".into(),
            label: "Target".into(),
            kind: FieldKind::Text,
            required: false,
            width: FieldWidth::Full,
            placeholder: None,
            help_text: None,
            validation: Vec::new(),
            conditional_visibility: Some(ConditionalVisibility { enabled, conditions }),
            prefill_config: None,
            metadata: Default::default(),
        }
    }

    fn values(pairs: Value) -> FieldValues {
        serde_json::from_value(pairs).unwrap()
    }

    #[test]
    fn test_no_rules_is_visible() {
        let field = field_with(false, vec![cond("x", ConditionOperator::IsNotEmpty, None, LogicalOperator::And)]);
        assert!(is_field_visible(&field, &FieldValues::new()));
        assert!(is_field_visible(&field_with(true, vec![]), &FieldValues::new()));
    }

    #[test]
    fn test_operators() {
        let v = values(json!({ "kind": "condo", "units": "12", "tags": ["pool", "gym"], "blank": "" }));
        let holds = |op, field: &str, value: Value| {
            condition_holds(&cond(field, op, Some(value), LogicalOperator::And), &v)
        };
        assert!(holds(ConditionOperator::Equals, "kind", json!("condo")));
        assert!(holds(ConditionOperator::Equals, "units", json!(12)));
        assert!(holds(ConditionOperator::NotEquals, "kind", json!("house")));
        assert!(holds(ConditionOperator::Contains, "tags", json!("gym")));
        assert!(holds(ConditionOperator::Contains, "kind", json!("ond")));
        assert!(holds(ConditionOperator::NotContains, "tags", json!("sauna")));
        assert!(holds(ConditionOperator::GreaterThan, "units", json!(10)));
        assert!(holds(ConditionOperator::LessThanOrEqual, "units", json!("12")));
        assert!(!holds(ConditionOperator::GreaterThan, "kind", json!(1)));
        assert!(holds(ConditionOperator::IsEmpty, "blank", Value::Null));
        assert!(holds(ConditionOperator::IsEmpty, "missing", Value::Null));
        assert!(holds(ConditionOperator::IsNotEmpty, "tags", Value::Null));
    }

    #[test]
    fn test_left_to_right_fold() {
        // false OR true AND false == (false OR true) AND false == false
        let field = field_with(
            true,
            vec![
                cond("a", ConditionOperator::Equals, Some(json!("x")), LogicalOperator::And),
                cond("b", ConditionOperator::Equals, Some(json!("y")), LogicalOperator::Or),
                cond("c", ConditionOperator::Equals, Some(json!("z")), LogicalOperator::And),
            ],
        );
        let v = values(json!({ "a": "no", "b": "y", "c": "no" }));
        assert!(!is_field_visible(&field, &v));

        let v = values(json!({ "a": "no", "b": "y", "c": "z" }));
        assert!(is_field_visible(&field, &v));
    }
}
