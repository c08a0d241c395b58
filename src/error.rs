// src/error.rs

//! Unified error handling for the sync engine.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// A single field-level complaint returned by the destination.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Network-level failure, the request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The destination answered 404
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// 4xx with (optionally) structured field errors
    #[error("Validation failed ({status}): {message}{}", format_fields(.fields))]
    Validation {
        status: u16,
        message: String,
        fields: Vec<FieldError>,
    },

    /// 5xx
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Still throttled after the recovery retry
    #[error("Rate limited on {url} (retry after {retry_after:?}s)")]
    RateLimited {
        url: String,
        retry_after: Option<u64>,
    },

    /// Any other unexpected status
    #[error("HTTP error ({status}): {message}")]
    Http { status: u16, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A mapping filter rejected its input
    #[error("Transform error on field '{field}': {message}")]
    Transform { field: String, message: String },

    /// A destination body did not carry the expected identifiers
    #[error("Resolution error: {0}")]
    Resolution(String),
}

fn format_fields(fields: &[FieldError]) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let joined: Vec<String> = fields.iter().map(ToString::to_string).collect();
    format!(" [{}]", joined.join("; "))
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a transform error for a destination field.
    pub fn transform(field: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transform {
            field: field.into(),
            message: message.to_string(),
        }
    }

    /// Create a resolution error.
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    /// Whether this is the recoverable 404 that drives the create path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this is a 4xx validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Process exit code associated with this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Toml(_) => 2,
            Self::Transform { .. } => 3,
            Self::Validation { .. } => 4,
            Self::Server { .. } => 5,
            Self::Transport(_) => 6,
            Self::RateLimited { .. } => 7,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_fields() {
        let err = AppError::Validation {
            status: 422,
            message: "Bad request".into(),
            fields: vec![
                FieldError {
                    field: "name".into(),
                    message: "name is required".into(),
                },
                FieldError {
                    field: String::new(),
                    message: "generic".into(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Validation failed (422): Bad request [name: name is required; generic]"
        );
    }

    #[test]
    fn exit_codes_per_kind() {
        assert_eq!(AppError::config("x").exit_code(), 2);
        assert_eq!(AppError::transform("f", "bad").exit_code(), 3);
        assert_eq!(
            AppError::Server {
                status: 502,
                message: String::new()
            }
            .exit_code(),
            5
        );
        assert_eq!(AppError::resolution("x").exit_code(), 1);
    }

    #[test]
    fn not_found_is_recoverable() {
        let err = AppError::NotFound {
            url: "https://x/y".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }
}
