//! Structured error types for configuration resolution.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Parse errors
    MalformedVersion,

    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    UnknownJoinType,
    UnknownDatabaseType,
}

impl ErrorCode {
    /// Whether this code belongs to the parse family (as opposed to validation).
    pub fn is_parse(self) -> bool {
        matches!(self, ErrorCode::MalformedVersion)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::MalformedVersion => "MALFORMED_VERSION",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::UnknownJoinType => "UNKNOWN_JOIN_TYPE",
            ErrorCode::UnknownDatabaseType => "UNKNOWN_DATABASE_TYPE",
        };
        f.write_str(s)
    }
}

/// Resolution failure. Nothing is written when one of these is returned.
#[derive(Debug, Serialize, thiserror::Error)]
pub enum ResolveError {
    /// A version token was supplied but could not be parsed.
    #[error("parse error: {message}")]
    Parse {
        code: ErrorCode,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// The selected mode is missing required inputs or names an unknown mode.
    #[error("validation error: {message}")]
    Validation {
        code: ErrorCode,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
}

impl ResolveError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        if code.is_parse() {
            ResolveError::Parse {
                code,
                message,
                field: None,
            }
        } else {
            ResolveError::Validation {
                code,
                message,
                field: None,
            }
        }
    }

    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            ResolveError::Parse { field, .. } | ResolveError::Validation { field, .. } => {
                *field = Some(name.into());
            }
        }
        self
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ResolveError::Parse { code, .. } | ResolveError::Validation { code, .. } => *code,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ResolveError::Parse { field, .. } | ResolveError::Validation { field, .. } => {
                field.as_deref()
            }
        }
    }

    // Convenience constructors

    pub fn malformed_version(raw: &str) -> Self {
        Self::new(
            ErrorCode::MalformedVersion,
            format!("Malformed version token: {:?}", raw),
        )
    }

    pub fn missing_field(field: &str, mode: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required when {}", field, mode),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn unknown_join_type(value: &str) -> Self {
        Self::new(
            ErrorCode::UnknownJoinType,
            format!(
                "Unknown cluster join type: {} (expected aws, multicast or tcp_ip)",
                value
            ),
        )
        .with_field("ATL_CLUSTER_TYPE")
    }

    pub fn unknown_database_type(value: &str) -> Self {
        Self::new(
            ErrorCode::UnknownDatabaseType,
            format!("Unknown database type: {}", value),
        )
        .with_field("ATL_DB_TYPE")
    }
}

/// Result type for resolution operations.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
