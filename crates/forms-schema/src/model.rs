//! Validated form model
//!
//! Produced by [`crate::validate_form_structure`]. Field kinds are a closed
//! tagged union: kinds that need sub-configuration carry it in their arm, so
//! a `Matrix` without options or a `Calculated` without a formula cannot be
//! constructed through the validator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;

// =============================================================================
// Form Tree
// =============================================================================

/// Validated form
#[derive(Clone, Debug, PartialEq)]
pub struct Form {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub pages: Vec<Page>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub sections: Vec<Section>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<Field>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub width: FieldWidth,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub validation: Vec<ValidationRule>,
    pub conditional_visibility: Option<ConditionalVisibility>,
    pub prefill_config: Option<PrefillConfig>,
    /// Free-form compliance annotations (UAD / URAR / MISMO)
    pub metadata: Map<String, Value>,
}

impl Form {
    /// Iterate all fields in page → section → field order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.pages
            .iter()
            .flat_map(|p| p.sections.iter())
            .flat_map(|s| s.fields.iter())
    }

    /// Find a field by ID
    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields().find(|f| f.id == id)
    }

    pub fn field_count(&self) -> usize {
        self.fields().count()
    }
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    /// Field IDs this field depends on through visibility or calculation
    pub fn references(&self) -> Vec<String> {
        let mut refs = Vec::new();
        if let Some(visibility) = self.conditional_visibility.as_ref().filter(|v| v.enabled) {
            refs.extend(visibility.conditions.iter().map(|c| c.field_id.clone()));
        }
        if let FieldKind::Calculated(config) = &self.kind {
            refs.extend(config.references());
        }
        dedup_in_order(refs)
    }
}

fn dedup_in_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

// =============================================================================
// Field Kinds
// =============================================================================

/// Field kind with its kind-specific configuration
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Email,
    Phone,
    Url,
    Password,
    Date,
    Time,
    DateTime,
    Currency,
    Percentage,
    Select(Vec<FieldOption>),
    MultiSelect(Vec<FieldOption>),
    Radio(Vec<FieldOption>),
    Checkbox(Vec<FieldOption>),
    Toggle,
    Rating,
    Slider,
    File,
    Signature,
    Address,
    Matrix(Vec<FieldOption>),
    Calculated(CalculatedConfig),
    Lookup(LookupConfig),
    Hidden,
    Heading,
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::Text => FieldType::Text,
            FieldKind::Textarea => FieldType::Textarea,
            FieldKind::Number => FieldType::Number,
            FieldKind::Email => FieldType::Email,
            FieldKind::Phone => FieldType::Phone,
            FieldKind::Url => FieldType::Url,
            FieldKind::Password => FieldType::Password,
            FieldKind::Date => FieldType::Date,
            FieldKind::Time => FieldType::Time,
            FieldKind::DateTime => FieldType::DateTime,
            FieldKind::Currency => FieldType::Currency,
            FieldKind::Percentage => FieldType::Percentage,
            FieldKind::Select(_) => FieldType::Select,
            FieldKind::MultiSelect(_) => FieldType::MultiSelect,
            FieldKind::Radio(_) => FieldType::Radio,
            FieldKind::Checkbox(_) => FieldType::Checkbox,
            FieldKind::Toggle => FieldType::Toggle,
            FieldKind::Rating => FieldType::Rating,
            FieldKind::Slider => FieldType::Slider,
            FieldKind::File => FieldType::File,
            FieldKind::Signature => FieldType::Signature,
            FieldKind::Address => FieldType::Address,
            FieldKind::Matrix(_) => FieldType::Matrix,
            FieldKind::Calculated(_) => FieldType::Calculated,
            FieldKind::Lookup(_) => FieldType::Lookup,
            FieldKind::Hidden => FieldType::Hidden,
            FieldKind::Heading => FieldType::Heading,
        }
    }

    /// Options for choice and matrix kinds
    pub fn options(&self) -> Option<&[FieldOption]> {
        match self {
            FieldKind::Select(options)
            | FieldKind::MultiSelect(options)
            | FieldKind::Radio(options)
            | FieldKind::Checkbox(options)
            | FieldKind::Matrix(options) => Some(options.as_slice()),
            _ => None,
        }
    }
}

/// Field type tag as it appears in `field_type`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Email,
    Phone,
    Url,
    Password,
    Date,
    Time,
    #[serde(rename = "datetime")]
    DateTime,
    Currency,
    Percentage,
    Select,
    #[serde(rename = "multiselect")]
    MultiSelect,
    Radio,
    Checkbox,
    Toggle,
    Rating,
    Slider,
    File,
    Signature,
    Address,
    Matrix,
    Calculated,
    Lookup,
    Hidden,
    Heading,
}

impl FieldType {
    pub const ALL: [FieldType; 27] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Number,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Url,
        FieldType::Password,
        FieldType::Date,
        FieldType::Time,
        FieldType::DateTime,
        FieldType::Currency,
        FieldType::Percentage,
        FieldType::Select,
        FieldType::MultiSelect,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::Toggle,
        FieldType::Rating,
        FieldType::Slider,
        FieldType::File,
        FieldType::Signature,
        FieldType::Address,
        FieldType::Matrix,
        FieldType::Calculated,
        FieldType::Lookup,
        FieldType::Hidden,
        FieldType::Heading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Url => "url",
            FieldType::Password => "password",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateTime => "datetime",
            FieldType::Currency => "currency",
            FieldType::Percentage => "percentage",
            FieldType::Select => "select",
            FieldType::MultiSelect => "multiselect",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Toggle => "toggle",
            FieldType::Rating => "rating",
            FieldType::Slider => "slider",
            FieldType::File => "file",
            FieldType::Signature => "signature",
            FieldType::Address => "address",
            FieldType::Matrix => "matrix",
            FieldType::Calculated => "calculated",
            FieldType::Lookup => "lookup",
            FieldType::Hidden => "hidden",
            FieldType::Heading => "heading",
        }
    }

    /// Selection kinds that need a non-empty, unique option list
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            FieldType::Select | FieldType::MultiSelect | FieldType::Radio | FieldType::Checkbox
        )
    }

    /// Kinds that should carry help text for form authors
    pub fn is_complex(&self) -> bool {
        matches!(
            self,
            FieldType::Calculated | FieldType::Lookup | FieldType::Matrix | FieldType::Signature
        )
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownValue {
                kind: "field type",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldWidth {
    #[default]
    Full,
    Half,
    Third,
    Quarter,
}

impl FromStr for FieldWidth {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "half" => Ok(Self::Half),
            "third" => Ok(Self::Third),
            "quarter" => Ok(Self::Quarter),
            _ => Err(SchemaError::UnknownValue { kind: "width", value: s.to_string() }),
        }
    }
}

// =============================================================================
// Options
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
    pub option_type: Option<OptionType>,
}

/// Matrix axis of an option
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Row,
    Column,
}

impl FromStr for OptionType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "row" => Ok(Self::Row),
            "column" => Ok(Self::Column),
            _ => Err(SchemaError::UnknownValue { kind: "option type", value: s.to_string() }),
        }
    }
}

// =============================================================================
// Validation Rules
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationRule {
    pub kind: RuleKind,
    pub value: Option<Value>,
    pub message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Required,
    Min,
    Max,
    MinLength,
    MaxLength,
    Pattern,
    Email,
    Custom,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Required => "required",
            RuleKind::Min => "min",
            RuleKind::Max => "max",
            RuleKind::MinLength => "min_length",
            RuleKind::MaxLength => "max_length",
            RuleKind::Pattern => "pattern",
            RuleKind::Email => "email",
            RuleKind::Custom => "custom",
        }
    }

    /// Rule kinds whose `value` must be numeric
    pub fn is_numeric_bound(&self) -> bool {
        matches!(
            self,
            RuleKind::Min | RuleKind::Max | RuleKind::MinLength | RuleKind::MaxLength
        )
    }
}

impl FromStr for RuleKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "required" => Ok(Self::Required),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "min_length" | "minLength" => Ok(Self::MinLength),
            "max_length" | "maxLength" => Ok(Self::MaxLength),
            "pattern" => Ok(Self::Pattern),
            "email" => Ok(Self::Email),
            "custom" => Ok(Self::Custom),
            _ => Err(SchemaError::UnknownValue { kind: "validation rule", value: s.to_string() }),
        }
    }
}

// =============================================================================
// Conditional Visibility
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct ConditionalVisibility {
    pub enabled: bool,
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub field_id: String,
    pub operator: ConditionOperator,
    pub value: Option<Value>,
    /// Joins this condition to the result of the ones before it
    pub logical_operator: LogicalOperator,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    IsEmpty,
    IsNotEmpty,
}

impl ConditionOperator {
    /// Unary operators take no comparison value
    pub fn is_unary(&self) -> bool {
        matches!(self, ConditionOperator::IsEmpty | ConditionOperator::IsNotEmpty)
    }
}

impl FromStr for ConditionOperator {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(Self::Equals),
            "not_equals" => Ok(Self::NotEquals),
            "contains" => Ok(Self::Contains),
            "not_contains" => Ok(Self::NotContains),
            "greater_than" => Ok(Self::GreaterThan),
            "less_than" => Ok(Self::LessThan),
            "greater_than_or_equal" => Ok(Self::GreaterThanOrEqual),
            "less_than_or_equal" => Ok(Self::LessThanOrEqual),
            "is_empty" => Ok(Self::IsEmpty),
            "is_not_empty" => Ok(Self::IsNotEmpty),
            _ => Err(SchemaError::UnknownValue { kind: "condition operator", value: s.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl FromStr for LogicalOperator {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            _ => Err(SchemaError::UnknownValue { kind: "logical operator", value: s.to_string() }),
        }
    }
}

// =============================================================================
// Calculated / Lookup / Prefill
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct CalculatedConfig {
    /// Formula referencing fields as `{field_id}`
    pub formula: String,
    pub dependencies: Vec<String>,
    /// Decimal places to round to
    pub precision: Option<u32>,
}

impl CalculatedConfig {
    /// Declared dependencies followed by any other field the formula reads
    pub fn references(&self) -> Vec<String> {
        let mut refs = self.dependencies.clone();
        for name in formula_references(&self.formula) {
            if !refs.contains(&name) {
                refs.push(name);
            }
        }
        refs
    }
}

/// Names a formula reads, both `{field_id}` placeholders and bare identifiers.
///
/// Unparseable formulas fall back to their placeholders.
pub fn formula_references(formula: &str) -> Vec<String> {
    match forms_expr::parse(formula) {
        Ok(expr) => expr.references().into_iter().map(str::to_string).collect(),
        Err(_) => formula_placeholders(formula),
    }
}

/// Extract `{field_id}` placeholders from a formula, in order of appearance
pub fn formula_placeholders(formula: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = formula;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = after[..end].trim();
                if !name.is_empty() && !name.contains('{') && !found.iter().any(|f| f == name) {
                    found.push(name.to_string());
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    found
}

#[derive(Clone, Debug, PartialEq)]
pub struct LookupConfig {
    pub data_source: DataSource,
    pub endpoint: Option<String>,
    pub key: Option<String>,
    pub display_field: Option<String>,
    pub value_field: Option<String>,
}

/// Where lookup and prefill values come from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Internal,
    Api,
    Lookup,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Internal => "internal",
            DataSource::Api => "api",
            DataSource::Lookup => "lookup",
        }
    }
}

impl FromStr for DataSource {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal" => Ok(Self::Internal),
            "api" => Ok(Self::Api),
            "lookup" => Ok(Self::Lookup),
            _ => Err(SchemaError::UnknownValue { kind: "data source", value: s.to_string() }),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrefillConfig {
    pub source: DataSource,
    /// Context dot-path (`internal`) or table name (`lookup`)
    pub key: Option<String>,
    /// URL with optional `:id` placeholder (`api`)
    pub endpoint: Option<String>,
    pub cache: Option<bool>,
    /// Cache TTL in seconds
    pub cache_duration: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub fallback_value: Option<Value>,
    /// Response field → target field
    pub field_mapping: BTreeMap<String, String>,
}

impl PrefillConfig {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            key: None,
            endpoint: None,
            cache: None,
            cache_duration: None,
            retry_attempts: None,
            fallback_value: None,
            field_mapping: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_round_trip_names() {
        for t in FieldType::ALL {
            assert_eq!(t.as_str().parse::<FieldType>().unwrap(), t);
        }
        assert!("spreadsheet".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_formula_placeholders() {
        let refs = formula_placeholders("({price} * {qty}) - {discount} + {price}");
        assert_eq!(refs, vec!["price", "qty", "discount"]);
        assert!(formula_placeholders("1 + 2").is_empty());
        assert_eq!(formula_placeholders("{a} + {unclosed"), vec!["a"]);
    }

    #[test]
    fn test_calculated_references_merge_dependencies() {
        let config = CalculatedConfig {
            formula: "{a} + {b}".into(),
            dependencies: vec!["b".into(), "c".into()],
            precision: None,
        };
        assert_eq!(config.references(), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_formula_references_include_bare_names() {
        assert_eq!(formula_references("sub * 2 + {tax}"), vec!["sub", "tax"]);
        assert_eq!(formula_references("{a} + (b"), vec!["a"]);

        let config = CalculatedConfig {
            formula: "x + 1".into(),
            dependencies: Vec::new(),
            precision: None,
        };
        assert_eq!(config.references(), vec!["x"]);
    }

    #[test]
    fn test_operator_arity() {
        assert!(ConditionOperator::IsEmpty.is_unary());
        assert!(!ConditionOperator::Equals.is_unary());
        assert_eq!("OR".parse::<LogicalOperator>().unwrap(), LogicalOperator::Or);
    }
}
