//! Input validation for new pastes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::{Duration, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::config;
use crate::models::{format_timestamp, Fields};

const MAX_SUMMARY_CHARS: usize = 255;
const MAX_USER_CHARS: usize = 64;
const MAX_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Checks and normalizes raw input before it is stored.
pub trait Validator {
    /// The key that groups this validator's fields, if any. When set,
    /// `validate` returns its values nested under this key.
    fn belongs_to(&self) -> Option<&str>;

    fn validate(&self, data: &Fields) -> Result<Fields, ValidationErrors>;
}

/// Messages per rejected field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// The submission form for a paste.
#[derive(Debug, Clone)]
pub struct PasteForm {
    pub belongs_to: Option<String>,
    pub default_type: String,
    pub types: Vec<String>,
    pub max_content_size: usize,
}

impl PasteForm {
    pub fn from_config(form: &config::Form, limits: &config::Limits) -> Self {
        PasteForm {
            belongs_to: form.belongs_to.clone().filter(|key| !key.is_empty()),
            default_type: form.default_type.clone(),
            types: form.types.clone(),
            max_content_size: limits.max_content_size,
        }
    }

    fn content(&self, data: &Fields, errors: &mut ValidationErrors) -> Value {
        match text(data, "content") {
            Ok(Some(content)) if !content.trim().is_empty() => {
                if content.len() > self.max_content_size {
                    errors.add(
                        "content",
                        format!("must be at most {} bytes", self.max_content_size),
                    );
                }
                Value::String(content)
            }
            Ok(_) => {
                errors.add("content", "is required");
                Value::Null
            }
            Err(message) => {
                errors.add("content", message);
                Value::Null
            }
        }
    }

    fn kind(&self, data: &Fields, errors: &mut ValidationErrors) -> Value {
        let kind = match text(data, "type") {
            Ok(kind) => kind
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| self.default_type.clone()),
            Err(message) => {
                errors.add("type", message);
                return Value::Null;
            }
        };
        if !self.types.iter().any(|t| *t == kind) {
            errors.add("type", format!("unknown type {kind:?}"));
        }
        Value::String(kind)
    }
}

impl Validator for PasteForm {
    fn belongs_to(&self) -> Option<&str> {
        self.belongs_to.as_deref()
    }

    fn validate(&self, data: &Fields) -> Result<Fields, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut values = Fields::new();

        values.insert("type".into(), self.kind(data, &mut errors));
        values.insert(
            "summary".into(),
            bounded(data, "summary", MAX_SUMMARY_CHARS, &mut errors),
        );
        values.insert(
            "user".into(),
            bounded(data, "user", MAX_USER_CHARS, &mut errors),
        );
        values.insert("content".into(), self.content(data, &mut errors));
        values.insert("expires".into(), expires(data, &mut errors));
        values.insert("parent".into(), parent(data, &mut errors));

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(match &self.belongs_to {
            Some(key) => Fields::from_iter([(key.clone(), Value::Object(values))]),
            None => values,
        })
    }
}

/// A scalar field as text. Absent and null are `None`.
fn text(data: &Fields, field: &str) -> Result<Option<String>, &'static str> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err("must be a string"),
    }
}

/// Trimmed optional text with a length cap, defaulting to empty.
fn bounded(data: &Fields, field: &str, max_chars: usize, errors: &mut ValidationErrors) -> Value {
    match text(data, field) {
        Ok(value) => {
            let value = value.as_deref().unwrap_or_default().trim().to_owned();
            if value.chars().count() > max_chars {
                errors.add(field, format!("must be at most {max_chars} characters"));
            }
            Value::String(value)
        }
        Err(message) => {
            errors.add(field, message);
            Value::Null
        }
    }
}

/// A lifetime in seconds, turned into an absolute expiry time.
fn expires(data: &Fields, errors: &mut ValidationErrors) -> Value {
    let lifetime = match text(data, "expires") {
        Ok(lifetime) => lifetime.map(|l| l.trim().to_owned()).unwrap_or_default(),
        Err(message) => {
            errors.add("expires", message);
            return Value::Null;
        }
    };
    if lifetime.is_empty() || lifetime.eq_ignore_ascii_case("never") {
        return Value::Null;
    }

    let secs = if lifetime.bytes().all(|b| b.is_ascii_digit()) {
        lifetime.parse::<u64>().ok()
    } else {
        None
    };
    match secs {
        Some(secs) if (1..=MAX_LIFETIME_SECS).contains(&secs) => {
            // bounded above, so the cast and the addition cannot overflow
            let expires = Utc::now() + Duration::seconds(secs as i64);
            Value::String(format_timestamp(&expires))
        }
        Some(_) => {
            errors.add(
                "expires",
                format!("must be between 1 and {MAX_LIFETIME_SECS} seconds"),
            );
            Value::Null
        }
        None => {
            errors.add("expires", "must be a number of seconds or \"never\"");
            Value::Null
        }
    }
}

fn parent(data: &Fields, errors: &mut ValidationErrors) -> Value {
    static PASTE_ID: OnceLock<Regex> = OnceLock::new();
    let pattern = PASTE_ID.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap());

    match text(data, "parent") {
        Ok(Some(parent)) => {
            let parent = parent.trim();
            if parent.is_empty() {
                Value::Null
            } else if pattern.is_match(parent) {
                Value::String(parent.to_owned())
            } else {
                errors.add("parent", "is not a valid paste id");
                Value::Null
            }
        }
        Ok(None) => Value::Null,
        Err(message) => {
            errors.add("parent", message);
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::now_timestamp;

    fn form() -> PasteForm {
        PasteForm::from_config(&config::Form::default(), &config::Limits::default())
    }

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn minimal_input_gets_defaults() {
        let values = form()
            .validate(&fields(json!({ "content": "fn main() {}" })))
            .unwrap();
        assert_eq!(values["type"], "text");
        assert_eq!(values["summary"], "");
        assert_eq!(values["user"], "");
        assert_eq!(values["content"], "fn main() {}");
        assert_eq!(values["expires"], Value::Null);
        assert_eq!(values["parent"], Value::Null);
    }

    #[test]
    fn unknown_fields_are_dropped() {
        let values = form()
            .validate(&fields(json!({ "content": "x", "id": "chosen", "created": "1999" })))
            .unwrap();
        assert!(!values.contains_key("id"));
        assert!(!values.contains_key("created"));
    }

    #[test]
    fn every_bad_field_is_reported() {
        let errors = form()
            .validate(&fields(json!({
                "content": "   ",
                "type": "klingon",
                "user": "u".repeat(MAX_USER_CHARS + 1),
                "expires": "soon",
                "parent": "../etc",
            })))
            .unwrap_err();
        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(fields, ["content", "expires", "parent", "type", "user"]);
        assert_eq!(errors.field("content"), ["is required"]);
    }

    #[test]
    fn content_size_is_limited() {
        let mut form = form();
        form.max_content_size = 4;
        let errors = form
            .validate(&fields(json!({ "content": "hello" })))
            .unwrap_err();
        assert_eq!(errors.field("content"), ["must be at most 4 bytes"]);
    }

    #[test]
    fn type_is_normalized() {
        let values = form()
            .validate(&fields(json!({ "content": "x", "type": " Rust " })))
            .unwrap();
        assert_eq!(values["type"], "rust");
    }

    #[test]
    fn expires_becomes_a_future_timestamp() {
        let before = now_timestamp();
        for lifetime in [json!(3600), json!("3600")] {
            let values = form()
                .validate(&fields(json!({ "content": "x", "expires": lifetime })))
                .unwrap();
            let expires = values["expires"].as_str().unwrap();
            assert!(expires > before.as_str());
        }
    }

    #[test]
    fn expires_never_is_null() {
        for lifetime in [json!(""), json!("never"), json!(null)] {
            let values = form()
                .validate(&fields(json!({ "content": "x", "expires": lifetime })))
                .unwrap();
            assert_eq!(values["expires"], Value::Null);
        }
    }

    #[test]
    fn expires_out_of_range() {
        for lifetime in [json!(0), json!(-5), json!(MAX_LIFETIME_SECS + 1)] {
            let result = form().validate(&fields(json!({ "content": "x", "expires": lifetime })));
            assert!(result.is_err(), "lifetime {lifetime} accepted");
        }
    }

    #[test]
    fn output_nests_under_belongs_to() {
        let mut form = form();
        form.belongs_to = Some("paste".into());
        let values = form
            .validate(&fields(json!({ "content": "x", "parent": "abc123" })))
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["paste"]["parent"], "abc123");
    }

    #[test]
    fn errors_display_per_message() {
        let mut errors = ValidationErrors::default();
        errors.add("content", "is required");
        errors.add("type", "unknown type \"x\"");
        assert_eq!(
            errors.to_string(),
            "content: is required; type: unknown type \"x\""
        );
    }
}
