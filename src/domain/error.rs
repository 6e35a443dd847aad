use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NON_FIELD: &str = "non_field_errors";

/// Field-level validation failures, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_fields(self) -> BTreeMap<String, Vec<String>> {
        self.fields
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
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

impl std::error::Error for ValidationErrors {}

/// A string field read from a loosely typed request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField<'a> {
    /// Absent or `null`.
    Absent,
    Text(&'a str),
    WrongType,
}

impl<'a> TextField<'a> {
    pub fn read(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::String(text)) => Self::Text(text),
            Some(_) => Self::WrongType,
        }
    }

    /// Required, non-blank text. Failures are recorded under `field`.
    pub fn required(
        errors: &mut ValidationErrors,
        field: &str,
        value: Option<&'a Value>,
    ) -> Option<&'a str> {
        match Self::read(value) {
            Self::Absent => {
                errors.add(field, REQUIRED);
                None
            }
            Self::WrongType => {
                errors.add(field, NOT_A_STRING);
                None
            }
            Self::Text(raw) if raw.trim().is_empty() => {
                errors.add(field, BLANK);
                None
            }
            Self::Text(raw) => Some(raw),
        }
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}
