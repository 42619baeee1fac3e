//! Schema compiler.
//!
//! Two schemas come out of here: a fixed one for the admin's create/edit
//! payload, and a per-form one derived from the field list that every
//! submission's `data` must pass before it reaches the repository.

use crate::error::ValidationErrors;
use crate::types::{AnswerMap, AnswerValue, FieldDefinition, FormPayload, ValidationKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

// Lookaheads are not supported by `regex`; leading dots and ".." runs are
// rejected separately in `is_email`.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z0-9_'+\-.]*[A-Z0-9_+\-]@([A-Z0-9][A-Z0-9\-]*\.)+[A-Z]{2,}$")
        .expect("email pattern is valid")
});

// ASCII digits only: no sign, no decimal point.
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("number pattern is valid"));

pub fn is_email(value: &str) -> bool {
    !value.starts_with('.') && !value.contains("..") && EMAIL_RE.is_match(value)
}

pub fn is_number(value: &str) -> bool {
    NUMBER_RE.is_match(value)
}

// ========== BUILDER SCHEMA ==========

/// Validates the admin's create/edit payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuilderSchema;

pub fn compile_builder_schema() -> BuilderSchema {
    BuilderSchema
}

impl BuilderSchema {
    pub fn validate(&self, payload: &FormPayload) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if payload.title.trim().is_empty() {
            errors.add("title", "Title is required");
        }
        if payload.description.trim().is_empty() {
            errors.add("description", "Description is required");
        }
        if payload.fields.is_empty() {
            errors.add("fields", "At least one field is required");
        }

        let mut seen_ids = HashSet::new();
        for (index, field) in payload.fields.iter().enumerate() {
            let path = |name: &str| format!("fields.{}.{}", index, name);

            if field.id.trim().is_empty() {
                errors.add(path("id"), "Field id is required");
            } else if !seen_ids.insert(field.id.as_str()) {
                errors.add(path("id"), format!("Duplicate field id '{}'", field.id));
            }
            if field.label.trim().is_empty() {
                errors.add(path("label"), "Label is required");
            }
            if field.field_type.needs_options() && field.options().is_empty() {
                errors.add(
                    path("options"),
                    format!("Options are required for {} fields", field.field_type.as_str()),
                );
            }
        }

        errors.into_result()
    }
}

// ========== SUBMISSION SCHEMA ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Any string.
    Text,
    Email,
    /// Digits only.
    Number,
    /// Opaque; file contents are checked by the upload path, not here.
    Any,
}

impl From<ValidationKind> for RuleKind {
    fn from(kind: ValidationKind) -> Self {
        match kind {
            ValidationKind::String => RuleKind::Text,
            ValidationKind::Email => RuleKind::Email,
            ValidationKind::Number => RuleKind::Number,
            ValidationKind::File => RuleKind::Any,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub kind: RuleKind,
    /// Present and non-empty. Only enforced for string-based kinds.
    pub required: bool,
    /// Answer is a list of strings (checkbox, multiple-file).
    pub list: bool,
    pub required_message: String,
}

impl FieldRule {
    pub fn for_field(field: &FieldDefinition) -> Self {
        let kind = RuleKind::from(field.validation);
        Self {
            kind,
            required: field.required && kind != RuleKind::Any,
            list: field.field_type.is_list_valued(),
            required_message: format!("{} is required", field.label),
        }
    }

    pub fn is_optional(&self) -> bool {
        !self.required
    }

    pub fn check(&self, value: Option<&AnswerValue>) -> Result<(), String> {
        if self.kind == RuleKind::Any {
            return Ok(());
        }

        let items: Vec<&str> = match value {
            None => Vec::new(),
            Some(AnswerValue::Text(text)) if text.is_empty() && !self.required => Vec::new(),
            Some(AnswerValue::Text(text)) => vec![text.as_str()],
            Some(AnswerValue::List(_)) if !self.list => {
                return Err("Expected a single value".to_string());
            }
            Some(AnswerValue::List(list)) => list.iter().map(String::as_str).collect(),
        };

        if items.is_empty() {
            return if self.required {
                Err(self.required_message.clone())
            } else {
                Ok(())
            };
        }

        for item in items {
            if self.required && item.is_empty() {
                return Err(self.required_message.clone());
            }
            match self.kind {
                RuleKind::Email if !is_email(item) => {
                    return Err("Invalid email format".to_string())
                }
                RuleKind::Number if !is_number(item) => return Err("Must be a number".to_string()),
                _ => {}
            }
        }
        Ok(())
    }
}

/// One rule per field id.
#[derive(Debug, Clone, Default)]
pub struct SubmissionSchema {
    rules: BTreeMap<String, FieldRule>,
}

pub fn compile_submission_schema(fields: &[FieldDefinition]) -> SubmissionSchema {
    let rules = fields
        .iter()
        .map(|field| (field.id.clone(), FieldRule::for_field(field)))
        .collect();
    SubmissionSchema { rules }
}

impl SubmissionSchema {
    pub fn rule(&self, field_id: &str) -> Option<&FieldRule> {
        self.rules.get(field_id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Answers for ids outside the schema are ignored.
    pub fn validate(&self, data: &AnswerMap) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field_id, rule) in &self.rules {
            if let Err(message) = rule.check(data.get(field_id)) {
                errors.add(field_id.clone(), message);
            }
        }
        errors.into_result()
    }
}
