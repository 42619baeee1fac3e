//! Field renderer.
//!
//! Turns a `FieldDefinition` plus the bound `FormState` into a `Widget`
//! descriptor a client can draw. All writes go through `FormState`.

use crate::error::ValidationErrors;
use crate::types::{AnswerMap, AnswerValue, FieldDefinition, FieldType, SurveyForm};
use serde::Serialize;
use std::collections::BTreeMap;

const SELECT_PLACEHOLDER: &str = "Select an option";

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Control {
    /// Single-line input; `input_type` mirrors the field type ("text" or "email").
    TextInput {
        input_type: &'static str,
        placeholder: Option<String>,
    },
    TextArea {
        placeholder: Option<String>,
    },
    Select {
        options: Vec<String>,
        placeholder: String,
    },
    RadioGroup {
        options: Vec<String>,
    },
    /// One checkbox per option; `checked` is parallel to `options`.
    CheckboxGroup {
        options: Vec<String>,
        checked: Vec<bool>,
    },
    FilePicker {
        multiple: bool,
    },
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub field_id: String,
    pub label: String,
    /// `label` with " *" appended for required fields.
    pub display_label: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub control: Control,
    pub value: AnswerValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bound form state: current answer per field id plus inline errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    values: AnswerMap,
    errors: BTreeMap<String, String>,
}

impl FormState {
    /// Defaults: empty list for list-valued fields, empty string otherwise.
    pub fn for_fields(fields: &[FieldDefinition]) -> Self {
        let values = fields
            .iter()
            .map(|field| (field.id.clone(), empty_value(field.field_type)))
            .collect();
        Self { values, errors: BTreeMap::new() }
    }

    pub fn value(&self, field_id: &str) -> Option<&AnswerValue> {
        self.values.get(field_id)
    }

    pub fn values(&self) -> &AnswerMap {
        &self.values
    }

    pub fn into_values(self) -> AnswerMap {
        self.values
    }

    pub fn error(&self, field_id: &str) -> Option<&str> {
        self.errors.get(field_id).map(String::as_str)
    }

    pub fn set_text(&mut self, field_id: &str, value: impl Into<String>) {
        self.values.insert(field_id.to_string(), AnswerValue::Text(value.into()));
        self.errors.remove(field_id);
    }

    /// Checking appends the option when absent; unchecking removes it by value.
    /// Only checkbox fields and their declared options are affected.
    pub fn toggle_option(&mut self, field: &FieldDefinition, option: &str, checked: bool) {
        if field.field_type != FieldType::Checkbox || !field.options().iter().any(|o| o == option) {
            return;
        }
        let current = match self.values.remove(&field.id) {
            Some(AnswerValue::List(list)) => list,
            _ => Vec::new(),
        };

        let next = if checked {
            let mut list = current;
            if !list.iter().any(|v| v == option) {
                list.push(option.to_string());
            }
            list
        } else {
            current.into_iter().filter(|v| v != option).collect()
        };

        self.values.insert(field.id.clone(), AnswerValue::List(next));
        self.errors.remove(&field.id);
    }

    /// Stores picked filenames: the first one for `file`, all of them for
    /// `multiple-file`. Other field types are left untouched.
    pub fn select_files(&mut self, field: &FieldDefinition, filenames: Vec<String>) {
        let value = match field.field_type {
            FieldType::File => AnswerValue::Text(filenames.into_iter().next().unwrap_or_default()),
            FieldType::MultipleFile => AnswerValue::List(filenames),
            _ => return,
        };
        self.values.insert(field.id.clone(), value);
        self.errors.remove(&field.id);
    }

    pub fn apply_errors(&mut self, errors: &ValidationErrors) {
        self.errors = errors.as_map().clone();
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }
}

fn empty_value(field_type: FieldType) -> AnswerValue {
    if field_type.is_list_valued() {
        AnswerValue::List(Vec::new())
    } else {
        AnswerValue::Text(String::new())
    }
}

pub fn render_field(def: &FieldDefinition, state: &FormState) -> Widget {
    let value = state
        .value(&def.id)
        .cloned()
        .unwrap_or_else(|| empty_value(def.field_type));

    let control = match def.field_type {
        FieldType::Text | FieldType::Email => Control::TextInput {
            input_type: def.field_type.as_str(),
            placeholder: def.placeholder.clone(),
        },
        FieldType::Textarea => Control::TextArea {
            placeholder: def.placeholder.clone(),
        },
        FieldType::Select => Control::Select {
            options: def.options().to_vec(),
            placeholder: def
                .placeholder
                .clone()
                .unwrap_or_else(|| SELECT_PLACEHOLDER.to_string()),
        },
        FieldType::Radio => Control::RadioGroup {
            options: def.options().to_vec(),
        },
        FieldType::Checkbox => {
            let selected: &[String] = match &value {
                AnswerValue::List(list) => list,
                AnswerValue::Text(_) => &[],
            };
            Control::CheckboxGroup {
                options: def.options().to_vec(),
                checked: def.options().iter().map(|o| selected.contains(o)).collect(),
            }
        }
        FieldType::File => Control::FilePicker { multiple: false },
        FieldType::MultipleFile => Control::FilePicker { multiple: true },
    };

    let display_label = if def.required {
        format!("{} *", def.label)
    } else {
        def.label.clone()
    };

    Widget {
        field_id: def.id.clone(),
        label: def.label.clone(),
        display_label,
        required: def.required,
        description: def.description.clone(),
        control,
        value,
        error: state.error(&def.id).map(str::to_string),
    }
}

/// Renders every field in display order.
pub fn render_form(form: &SurveyForm, state: &FormState) -> Vec<Widget> {
    form.fields.iter().map(|field| render_field(field, state)).collect()
}
