//! # Event Validation
//!
//! Turns an untyped JSON payload into an [`Event`], or explains why it cannot.
//! Validation is pure: it reads nothing but its input.

use event_store::Event;
use serde_json::{Map, Value};
use thiserror::Error;

/// Fields every event must carry as non-empty strings
pub const REQUIRED_FIELDS: [&str; 2] = ["site_id", "event_type"];

/// Why a payload was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.describe())]
pub struct ValidationError {
    /// Required fields that were absent, empty, or not strings
    pub missing_fields: Vec<&'static str>,
    /// Optional fields whose value could not be stored as text
    pub invalid_fields: Vec<&'static str>,
}

impl ValidationError {
    /// Human-readable list of the offending fields
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.missing_fields.is_empty() {
            parts.push(format!("missing required fields: {}", self.missing_fields.join(", ")));
        }
        if !self.invalid_fields.is_empty() {
            parts.push(format!("invalid fields: {}", self.invalid_fields.join(", ")));
        }
        parts.join("; ")
    }
}

/// Validate a raw payload.
///
/// Anything other than a JSON object is treated as missing both required fields.
pub fn validate(raw: &Value) -> Result<Event, ValidationError> {
    match raw.as_object() {
        Some(fields) => validate_fields(fields),
        None => Err(ValidationError {
            missing_fields: REQUIRED_FIELDS.to_vec(),
            invalid_fields: Vec::new(),
        }),
    }
}

/// Validate a payload that is already known to be a JSON object
pub fn validate_fields(fields: &Map<String, Value>) -> Result<Event, ValidationError> {
    let mut missing_fields = Vec::new();
    let mut invalid_fields = Vec::new();

    let site_id = required_text(fields, "site_id", &mut missing_fields);
    let event_type = required_text(fields, "event_type", &mut missing_fields);

    let path = optional_text(fields, "path", &mut invalid_fields);
    let user_id = optional_text(fields, "user_id", &mut invalid_fields);
    let timestamp = optional_text(fields, "timestamp", &mut invalid_fields);

    if !missing_fields.is_empty() || !invalid_fields.is_empty() {
        return Err(ValidationError { missing_fields, invalid_fields });
    }

    Ok(Event { site_id, event_type, path, user_id, timestamp })
}

fn required_text(
    fields: &Map<String, Value>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match fields.get(name) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

fn optional_text(
    fields: &Map<String, Value>,
    name: &'static str,
    invalid: &mut Vec<&'static str>,
) -> String {
    match fields.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => {
            invalid.push(name);
            String::new()
        }
    }
}
