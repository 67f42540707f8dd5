//! Declarative request validation.
//!
//! Payload shapes are `serde` types deriving `validator::Validate`; decoding
//! and rule checks both funnel into [`SchemaError`], which the error mapper
//! turns into a 422 with per-field issues.

pub mod extract;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::database::columns::to_field;

pub use extract::{ValidatedJson, ValidatedQuery};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub field: Option<String>,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    pub issues: Vec<FieldIssue>,
}

impl SchemaError {
    pub fn single(field: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue { field, code: code.to_string(), message: message.into() }],
        }
    }

    /// First issue's field and message, for one-line summaries such as import reports.
    pub fn summary(&self) -> (Option<String>, String) {
        match self.issues.first() {
            Some(issue) => (issue.field.clone(), issue.message.clone()),
            None => (None, "Invalid input".to_string()),
        }
    }
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .issues
            .iter()
            .map(|i| match &i.field {
                Some(field) => format!("{}: {}", field, i.message),
                None => i.message.clone(),
            })
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for SchemaError {}

/// Decode a raw JSON payload into `T` and run its declared rules.
pub fn validate<T>(raw: Value) -> Result<T, SchemaError>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = match serde_json::from_value(raw.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            let text = e.to_string();
            let field = raw.as_object().filter(|_| !text.starts_with("missing field")).and_then(|object| {
                offending_key(object.keys().map(String::as_str), &text, |key| {
                    let mut trimmed = object.clone();
                    trimmed.remove(key);
                    serde_json::from_value::<T>(Value::Object(trimmed)).err().map(|e| e.to_string())
                })
            });
            return Err(from_serde(&text, field));
        }
    };
    check(&parsed)?;
    Ok(parsed)
}

/// Names the input key a decode error came from.
///
/// Decoding stops at the first bad value, so the culprit is the first key whose
/// removal changes the error. `retry` decodes without the given key and returns
/// the new error text, if any.
pub(crate) fn offending_key<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    error: &str,
    retry: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    keys.into_iter()
        .find(|key| retry(key).as_deref() != Some(error))
        .map(str::to_string)
}

pub fn check<T: Validate>(value: &T) -> Result<(), SchemaError> {
    value.validate().map_err(|errors| {
        let mut issues = Vec::new();
        collect(None, &errors, &mut issues);
        issues.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
        SchemaError { issues }
    })
}

/// Builds a rule error that names the offending field, for struct-level checks.
pub fn field_error(field: &'static str, code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code).with_message(Cow::Borrowed(message));
    err.add_param(Cow::Borrowed("field"), &field);
    err
}

fn from_serde(text: &str, field: Option<String>) -> SchemaError {
    // serde reports missing fields as "missing field `name`"
    if let Some(rest) = text.strip_prefix("missing field `") {
        let field = rest.split('`').next().unwrap_or_default().to_string();
        return SchemaError::single(Some(field), "required", "This field is required");
    }
    if text.starts_with("unknown variant") {
        return SchemaError::single(field, "enum", text);
    }
    SchemaError::single(field, "invalid_type", text)
}

fn collect(prefix: Option<&str>, errors: &ValidationErrors, out: &mut Vec<FieldIssue>) {
    for (key, kind) in errors.errors() {
        let name = if key.as_ref() == "__all__" {
            prefix.map(str::to_string)
        } else {
            Some(join(prefix, &to_field(key)))
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let field = err
                        .params
                        .get("field")
                        .and_then(Value::as_str)
                        .map(|f| join(prefix, f))
                        .or_else(|| name.clone());
                    out.push(FieldIssue {
                        message: err
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| default_message(&err.code)),
                        code: err.code.to_string(),
                        field,
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(name.as_deref(), inner, out),
            ValidationErrorsKind::List(items) => {
                let base = name.unwrap_or_default();
                for (index, inner) in items {
                    let path = format!("{}[{}]", base, index);
                    collect(Some(&path), inner, out);
                }
            }
        }
    }
}

fn join(prefix: Option<&str>, field: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}.{}", p, field),
        _ => field.to_string(),
    }
}

fn default_message(code: &str) -> String {
    match code {
        "length" => "Has an invalid length".to_string(),
        "email" => "Must be a valid email address".to_string(),
        "range" => "Is out of the allowed range".to_string(),
        "required" => "This field is required".to_string(),
        other => format!("Failed the '{}' rule", other),
    }
}
