//! Structural validation of form definitions
//!
//! Turns JSON of unknown shape into a [`Form`] or the full list of problems.
//! Every violation is collected; nothing short-circuits and nothing panics.

use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::draft::{
    non_blank, CalculatedDraft, ConditionDraft, FieldDraft, FormDraft, LookupDraft, OptionDraft,
    PageDraft, PrefillDraft, RuleDraft, SectionDraft, VisibilityDraft,
};
use crate::model::*;

/// Result of validating a form structure
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationOutcome {
    Valid(Form),
    Invalid(Vec<String>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    pub fn errors(&self) -> &[String] {
        match self {
            ValidationOutcome::Valid(_) => &[],
            ValidationOutcome::Invalid(errors) => errors,
        }
    }

    pub fn into_result(self) -> Result<Form, Vec<String>> {
        match self {
            ValidationOutcome::Valid(form) => Ok(form),
            ValidationOutcome::Invalid(errors) => Err(errors),
        }
    }
}

/// Validate a form structure of unknown shape
pub fn validate_form_structure(value: &Value) -> ValidationOutcome {
    let mut structural = Vec::new();
    let draft = FormDraft::from_value(value, &mut structural);
    let mut errors: Vec<String> = structural.iter().map(ToString::to_string).collect();

    let Some(draft) = draft else {
        return ValidationOutcome::Invalid(errors);
    };

    let form = build_form(&draft, &mut errors);
    if errors.is_empty() {
        debug!(fields = form.field_count(), "form structure valid");
        ValidationOutcome::Valid(form)
    } else {
        debug!(errors = errors.len(), "form structure invalid");
        ValidationOutcome::Invalid(errors)
    }
}

/// Validate an already-read draft
pub fn validate_draft(draft: &FormDraft) -> ValidationOutcome {
    let mut errors = Vec::new();
    let form = build_form(draft, &mut errors);
    if errors.is_empty() {
        ValidationOutcome::Valid(form)
    } else {
        ValidationOutcome::Invalid(errors)
    }
}

fn build_form(draft: &FormDraft, errors: &mut Vec<String>) -> Form {
    let pages = draft
        .pages
        .iter()
        .enumerate()
        .map(|(p, page)| build_page(page, p, errors))
        .collect();

    Form {
        id: draft.id.clone(),
        title: draft.title.clone(),
        description: draft.description.clone(),
        pages,
    }
}

fn build_page(page: &PageDraft, p: usize, errors: &mut Vec<String>) -> Page {
    let sections = page
        .sections
        .iter()
        .enumerate()
        .map(|(s, section)| build_section(section, p, s, errors))
        .collect();

    Page {
        id: page.id.clone().unwrap_or_else(|| format!("page-{}", p + 1)),
        title: page.title.clone(),
        description: page.description.clone(),
        sections,
    }
}

fn build_section(section: &SectionDraft, p: usize, s: usize, errors: &mut Vec<String>) -> Section {
    let fields = section
        .fields
        .iter()
        .enumerate()
        .filter_map(|(f, field)| {
            let location = format!("page {}, section {}, field {}", p + 1, s + 1, f + 1);
            FieldCheck::new(field, location, errors).build()
        })
        .collect();

    Section {
        id: section.id.clone().unwrap_or_else(|| format!("section-{}-{}", p + 1, s + 1)),
        title: section.title.clone(),
        description: section.description.clone(),
        fields,
    }
}

// =============================================================================
// Field Checks
// =============================================================================

struct FieldCheck<'a> {
    draft: &'a FieldDraft,
    location: String,
    errors: &'a mut Vec<String>,
    failed: bool,
}

impl<'a> FieldCheck<'a> {
    fn new(draft: &'a FieldDraft, location: String, errors: &'a mut Vec<String>) -> Self {
        Self { draft, location, errors, failed: false }
    }

    fn fail(&mut self, problem: impl AsRef<str>) {
        self.failed = true;
        self.errors.push(format!(
            "Field \"{}\" ({}): {}",
            self.draft.display_name(),
            self.location,
            problem.as_ref()
        ));
    }

    fn build(mut self) -> Option<Field> {
        let draft = self.draft;

        let id = non_blank(&draft.id).map(str::to_string);
        if id.is_none() {
            self.fail("missing id");
        }

        let field_type = match draft.field_type.as_deref() {
            None => {
                self.fail("missing field_type");
                None
            }
            Some(raw) => match raw.parse::<FieldType>() {
                Ok(t) => Some(t),
                Err(_) => {
                    self.fail(format!("invalid field_type \"{}\"", raw));
                    None
                }
            },
        };

        let width = match draft.width.as_deref() {
            None => FieldWidth::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                self.fail(format!("invalid width \"{}\"", raw));
                FieldWidth::default()
            }),
        };

        let kind = field_type.and_then(|t| self.kind(t));
        let validation = self.rules(draft.validation.as_deref().unwrap_or_default());
        let conditional_visibility = draft
            .conditional_visibility
            .as_ref()
            .and_then(|v| self.visibility(v));
        let prefill_config = draft.prefill_config.as_ref().and_then(|p| self.prefill(p));

        if self.failed {
            return None;
        }

        Some(Field {
            id: id?,
            label: draft.label.clone().unwrap_or_default(),
            kind: kind?,
            required: draft.required.unwrap_or(false),
            width,
            placeholder: draft.placeholder.clone(),
            help_text: draft.help_text.clone(),
            validation,
            conditional_visibility,
            prefill_config,
            metadata: draft.metadata.clone().unwrap_or_default(),
        })
    }

    fn kind(&mut self, field_type: FieldType) -> Option<FieldKind> {
        let draft = self.draft;
        let kind = match field_type {
            FieldType::Text => FieldKind::Text,
            FieldType::Textarea => FieldKind::Textarea,
            FieldType::Number => FieldKind::Number,
            FieldType::Email => FieldKind::Email,
            FieldType::Phone => FieldKind::Phone,
            FieldType::Url => FieldKind::Url,
            FieldType::Password => FieldKind::Password,
            FieldType::Date => FieldKind::Date,
            FieldType::Time => FieldKind::Time,
            FieldType::DateTime => FieldKind::DateTime,
            FieldType::Currency => FieldKind::Currency,
            FieldType::Percentage => FieldKind::Percentage,
            FieldType::Select => FieldKind::Select(self.choice_options(field_type)?),
            FieldType::MultiSelect => FieldKind::MultiSelect(self.choice_options(field_type)?),
            FieldType::Radio => FieldKind::Radio(self.choice_options(field_type)?),
            FieldType::Checkbox => FieldKind::Checkbox(self.choice_options(field_type)?),
            FieldType::Toggle => FieldKind::Toggle,
            FieldType::Rating => FieldKind::Rating,
            FieldType::Slider => FieldKind::Slider,
            FieldType::File => FieldKind::File,
            FieldType::Signature => FieldKind::Signature,
            FieldType::Address => FieldKind::Address,
            FieldType::Matrix => FieldKind::Matrix(self.matrix_options()?),
            FieldType::Calculated => {
                FieldKind::Calculated(self.calculated(draft.calculated_config.as_ref())?)
            }
            FieldType::Lookup => FieldKind::Lookup(self.lookup(draft.lookup_config.as_ref())?),
            FieldType::Hidden => FieldKind::Hidden,
            FieldType::Heading => FieldKind::Heading,
        };
        Some(kind)
    }

    fn choice_options(&mut self, field_type: FieldType) -> Option<Vec<FieldOption>> {
        let drafts = self.draft.options.as_deref().unwrap_or_default();
        if drafts.is_empty() {
            self.fail(format!("{} fields require a non-empty options array", field_type));
            return None;
        }

        let mut options = Vec::with_capacity(drafts.len());
        let mut seen = HashSet::new();
        let mut ok = true;
        for (i, option) in drafts.iter().enumerate() {
            match option.value_text().filter(|v| !v.trim().is_empty()) {
                None => {
                    self.fail(format!("option {} has an empty value", i + 1));
                    ok = false;
                }
                Some(value) => {
                    if !seen.insert(value.clone()) {
                        self.fail(format!("duplicate option value \"{}\"", value));
                        ok = false;
                    }
                    options.push(self.option(option, value));
                }
            }
        }
        ok.then_some(options)
    }

    fn matrix_options(&mut self) -> Option<Vec<FieldOption>> {
        let drafts = self.draft.options.as_deref().unwrap_or_default();
        let mut options = Vec::with_capacity(drafts.len());
        for option in drafts {
            let value = option.value_text().unwrap_or_default();
            options.push(self.option(option, value));
        }

        let has_row = options.iter().any(|o| o.option_type == Some(OptionType::Row));
        let has_column = options.iter().any(|o| o.option_type == Some(OptionType::Column));
        if !has_row {
            self.fail("matrix fields require at least one option with type \"row\"");
        }
        if !has_column {
            self.fail("matrix fields require at least one option with type \"column\"");
        }
        (has_row && has_column).then_some(options)
    }

    fn option(&mut self, option: &OptionDraft, value: String) -> FieldOption {
        let option_type = match option.option_type.as_deref() {
            None => None,
            Some(raw) => match raw.parse() {
                Ok(t) => Some(t),
                Err(_) => {
                    self.fail(format!("invalid option type \"{}\"", raw));
                    None
                }
            },
        };
        FieldOption {
            label: option.label.clone().unwrap_or_else(|| value.clone()),
            value,
            option_type,
        }
    }

    fn calculated(&mut self, config: Option<&CalculatedDraft>) -> Option<CalculatedConfig> {
        let Some(config) = config else {
            self.fail("calculated fields require a calculated_config");
            return None;
        };
        match non_blank(&config.formula) {
            None => {
                self.fail("calculated_config requires a non-empty formula");
                None
            }
            Some(formula) => Some(CalculatedConfig {
                formula: formula.to_string(),
                dependencies: config.dependencies.clone().unwrap_or_default(),
                precision: config.precision,
            }),
        }
    }

    fn lookup(&mut self, config: Option<&LookupDraft>) -> Option<LookupConfig> {
        let Some(config) = config else {
            self.fail("lookup fields require a lookup_config");
            return None;
        };
        let data_source = match config.data_source.as_deref() {
            None => {
                self.fail("lookup_config requires a dataSource");
                return None;
            }
            Some(raw) => match raw.parse::<DataSource>() {
                Ok(source) => source,
                Err(_) => {
                    self.fail(format!(
                        "lookup_config has invalid dataSource \"{}\" (expected internal, api or lookup)",
                        raw
                    ));
                    return None;
                }
            },
        };
        Some(LookupConfig {
            data_source,
            endpoint: config.endpoint.clone(),
            key: config.key.clone(),
            display_field: config.display_field.clone(),
            value_field: config.value_field.clone(),
        })
    }

    fn rules(&mut self, drafts: &[RuleDraft]) -> Vec<ValidationRule> {
        let mut rules = Vec::with_capacity(drafts.len());
        for (i, rule) in drafts.iter().enumerate() {
            match rule.rule_type.as_deref() {
                None => self.fail(format!("validation rule {} is missing a type", i + 1)),
                Some(raw) => match raw.parse::<RuleKind>() {
                    Ok(kind) => rules.push(ValidationRule {
                        kind,
                        value: rule.value.clone(),
                        message: rule.message.clone(),
                    }),
                    Err(_) => {
                        self.fail(format!("validation rule {} has invalid type \"{}\"", i + 1, raw))
                    }
                },
            }
        }
        rules
    }

    fn visibility(&mut self, draft: &VisibilityDraft) -> Option<ConditionalVisibility> {
        let conditions = draft
            .conditions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .filter_map(|(i, c)| self.condition(c, i))
            .collect();
        Some(ConditionalVisibility {
            enabled: draft.enabled.unwrap_or(true),
            conditions,
        })
    }

    fn condition(&mut self, draft: &ConditionDraft, i: usize) -> Option<Condition> {
        let field_id = non_blank(&draft.field_id).map(str::to_string);
        if field_id.is_none() {
            self.fail(format!("condition {} is missing a fieldId", i + 1));
        }

        let operator = match draft.operator.as_deref() {
            None => {
                self.fail(format!("condition {} is missing an operator", i + 1));
                None
            }
            Some(raw) => match raw.parse::<ConditionOperator>() {
                Ok(op) => Some(op),
                Err(_) => {
                    self.fail(format!("condition {} has invalid operator \"{}\"", i + 1, raw));
                    None
                }
            },
        };

        let logical_operator = match draft.logical_operator.as_deref() {
            None => LogicalOperator::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                self.fail(format!("condition {} has invalid logicalOperator \"{}\"", i + 1, raw));
                LogicalOperator::default()
            }),
        };

        Some(Condition {
            field_id: field_id?,
            operator: operator?,
            value: draft.value.clone().filter(|v| !v.is_null()),
            logical_operator,
        })
    }

    fn prefill(&mut self, draft: &PrefillDraft) -> Option<PrefillConfig> {
        let source = match draft.source.as_deref() {
            None => {
                self.fail("prefill_config requires a source");
                return None;
            }
            Some(raw) => match raw.parse::<DataSource>() {
                Ok(source) => source,
                Err(_) => {
                    self.fail(format!("prefill_config has invalid source \"{}\"", raw));
                    return None;
                }
            },
        };
        Some(PrefillConfig {
            source,
            key: draft.key.clone(),
            endpoint: draft.endpoint.clone(),
            cache: draft.cache,
            cache_duration: draft.cache_duration,
            retry_attempts: draft.retry_attempts,
            fallback_value: draft.fallback_value.clone(),
            field_mapping: draft.field_mapping.clone().unwrap_or_default(),
        })
    }
}
