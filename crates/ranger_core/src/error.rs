use serde::{Deserialize, Serialize};
use std::fmt;

pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
pub const LOCKED: &str = "LOCKED";
pub const TERMINAL: &str = "TERMINAL";
pub const ACCESS_DENIED: &str = "ACCESS_DENIED";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const PATROL_SESSION_STATE: &str = "PATROL_SESSION_STATE";
pub const REMOTE_FAILURE: &str = "REMOTE_FAILURE";

/// One field-level problem found while validating a draft or patch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Single structured error shape used across the core and exposed to the console over RPC.
///
/// `field_errors` is only populated for `VALIDATION_FAILED` so the form layer can attach
/// messages to individual inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
            field_errors: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_field_errors(mut self, field_errors: Vec<FieldError>) -> Self {
        self.field_errors = field_errors;
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    pub fn validation(field_errors: Vec<FieldError>) -> Self {
        let fields = field_errors
            .iter()
            .map(|e| e.field.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(VALIDATION_FAILED, "Some fields are missing or invalid")
            .with_details(format!("fields={fields}"))
            .with_field_errors(field_errors)
    }

    pub fn not_found(label: &str, id: i64) -> Self {
        Self::new(NOT_FOUND, format!("{label} not found")).with_details(format!("id={id}"))
    }

    /// Wraps a failed write against the source of truth. The caller's copy of the record is left
    /// as it was, so a retry is always safe.
    pub fn remote_failure(source: AppError) -> Self {
        let details = match source.details {
            Some(d) => format!("[{}] {}: {}", source.code, source.message, d),
            None => format!("[{}] {}", source.code, source.message),
        };
        Self::new(REMOTE_FAILURE, "The change could not be saved")
            .with_details(details)
            .with_retryable(true)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
