use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ========== FIELD ==========
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Text,
    Email,
    Textarea,
    Select,
    Radio,
    Checkbox,
    File,
    MultipleFile,
}

impl FieldType {
    /// Select, radio and checkbox fields choose from `options`.
    pub fn needs_options(self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio | FieldType::Checkbox)
    }

    /// Checkbox groups and multi-file pickers bind a list of strings.
    pub fn is_list_valued(self) -> bool {
        matches!(self, FieldType::Checkbox | FieldType::MultipleFile)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::File => "file",
            FieldType::MultipleFile => "multiple-file",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationKind {
    String,
    Number,
    Email,
    File,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FieldDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub required: bool,
    pub validation: ValidationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl FieldDefinition {
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }
}

// ========== FORM ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurveyForm {
    pub id: String,
    pub title: String,
    pub description: String,
    pub fields: Vec<FieldDefinition>,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of POST /forms and PUT /forms/{id}
#[derive(Debug, Deserialize, Clone)]
pub struct FormPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

// ========== SUBMISSION ==========
/// One answer: a single string (text, choice, filename) or a list of strings
/// (checkbox selections, filenames).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    List(Vec<String>),
}

impl AnswerValue {
    /// Flattened cell representation used in response tables.
    pub fn to_cell(&self) -> String {
        match self {
            AnswerValue::Text(text) => text.clone(),
            AnswerValue::List(items) => items.join(", "),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

pub type AnswerMap = BTreeMap<String, AnswerValue>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: String,
    pub form_id: String,
    pub data: AnswerMap,
    pub submitted_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub form_id: String,
    #[serde(default)]
    pub data: AnswerMap,
}

/// Raw contents of a form's response table.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ResponseSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// ========== AUTH ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub email: String,
    pub is_authenticated: bool,
    /// Milliseconds since the Unix epoch.
    pub login_time: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}
