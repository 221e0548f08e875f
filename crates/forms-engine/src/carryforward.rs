//! Carryforward rules copy one field's value into another.

use serde::{Deserialize, Serialize};
use tracing::debug;

use forms_schema::FieldValues;

use crate::visibility::is_empty;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarryforwardMode {
    /// Fill the target only while it is empty
    #[default]
    Once,
    /// Keep the target in sync with the source
    Mirror,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarryforwardRule {
    pub source_field_id: String,
    pub target_field_id: String,
    #[serde(default)]
    pub mode: CarryforwardMode,
}

/// Apply rules in order; returns the IDs of fields that changed
pub fn apply_carryforward(rules: &[CarryforwardRule], values: &mut FieldValues) -> Vec<String> {
    let mut changed = Vec::new();

    for rule in rules {
        let Some(source) = values.get(&rule.source_field_id).filter(|v| !is_empty(Some(*v))) else {
            continue;
        };
        let source = source.clone();

        let target = values.get(&rule.target_field_id);
        let write = match rule.mode {
            CarryforwardMode::Once => is_empty(target),
            CarryforwardMode::Mirror => target != Some(&source),
        };
        if write {
            debug!(from = %rule.source_field_id, to = %rule.target_field_id, "carryforward");
            values.insert(rule.target_field_id.clone(), source);
            changed.push(rule.target_field_id.clone());
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(from: &str, to: &str, mode: CarryforwardMode) -> CarryforwardRule {
        CarryforwardRule {
            source_field_id: from.into(),
            target_field_id: to.into(),
            mode,
        }
    }

    #[test]
    fn test_once_only_fills_empty_targets() {
        let mut values: FieldValues =
            serde_json::from_value(json!({ "owner": "Ada", "borrower": "", "cosigner": "Bob" })).unwrap();
        let rules = [
            rule("owner", "borrower", CarryforwardMode::Once),
            rule("owner", "cosigner", CarryforwardMode::Once),
        ];
        assert_eq!(apply_carryforward(&rules, &mut values), vec!["borrower"]);
        assert_eq!(values["borrower"], json!("Ada"));
        assert_eq!(values["cosigner"], json!("Bob"));
    }

    #[test]
    fn test_mirror_overwrites() {
        let mut values: FieldValues =
            serde_json::from_value(json!({ "zip": "94110", "mailing_zip": "10001" })).unwrap();
        let rules = [rule("zip", "mailing_zip", CarryforwardMode::Mirror)];
        assert_eq!(apply_carryforward(&rules, &mut values), vec!["mailing_zip"]);
        assert_eq!(values["mailing_zip"], json!("94110"));
        assert!(apply_carryforward(&rules, &mut values).is_empty());
    }

    #[test]
    fn test_empty_source_is_ignored() {
        let mut values: FieldValues = serde_json::from_value(json!({ "b": "keep" })).unwrap();
        let rules = [rule("a", "b", CarryforwardMode::Mirror)];
        assert!(apply_carryforward(&rules, &mut values).is_empty());
        assert_eq!(values["b"], json!("keep"));
    }

    #[test]
    fn test_rule_wire_format() {
        let parsed: CarryforwardRule =
            serde_json::from_value(json!({ "sourceFieldId": "a", "targetFieldId": "b" })).unwrap();
        assert_eq!(parsed.mode, CarryforwardMode::Once);
    }
}
