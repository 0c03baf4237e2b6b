//! Error types for Crosslist.
//!
//! All errors in Crosslist are represented by the `CrosslistError` enum.
//! The domain kinds are `NotFound`, `Validation` and `Conflict`; everything else
//! comes from the surrounding stack (config, storage, conversions).

use std::{io::ErrorKind, string::FromUtf8Error};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Crosslist operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum CrosslistError {
    /// The referenced project, flow, node or connection does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A required payload field is missing or a structural check failed.
    ///
    /// Carries a single message for stage operations and the complete
    /// message list for flow validation.
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    /// The record changed between being read and being written back.
    #[error("{0}")]
    Conflict(String),

    /// Dashboard-level errors (startup, runtime construction).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// Content generator failures.
    #[error("{0}")]
    Content(String),

    /// Unresolved listing template placeholders.
    #[error("{0}")]
    Template(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),

    /// Event queue errors.
    #[error("{0}")]
    Queue(String),
}

impl CrosslistError {
    /// Builds a validation error carrying one message.
    pub fn validation(message: impl Into<String>) -> Self {
        CrosslistError::Validation(vec![message.into()])
    }

    /// Messages carried by a validation error, empty for other kinds.
    pub fn messages(&self) -> &[String] {
        match self {
            CrosslistError::Validation(messages) => messages,
            _ => &[],
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CrosslistError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CrosslistError::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CrosslistError::Conflict(_))
    }

    /// HTTP status the API layer reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CrosslistError::NotFound(_) => 404,
            CrosslistError::Validation(_) => 400,
            CrosslistError::Conflict(_) => 409,
            _ => 500,
        }
    }
}

impl From<CrosslistError> for String {
    fn from(val: CrosslistError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for CrosslistError {
    fn from(error: std::io::Error) -> Self {
        CrosslistError::IoError(error.to_string())
    }
}

impl From<CrosslistError> for std::io::Error {
    fn from(val: CrosslistError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<FromUtf8Error> for CrosslistError {
    fn from(_: FromUtf8Error) -> Self {
        CrosslistError::Convert("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for CrosslistError {
    fn from(error: serde_json::Error) -> Self {
        CrosslistError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for CrosslistError {
    fn from(error: toml::de::Error) -> Self {
        CrosslistError::Config(error.to_string())
    }
}

impl From<sqlx::Error> for CrosslistError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => CrosslistError::NotFound("record not found".to_string()),
            e => CrosslistError::Store(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_joins_messages() {
        let err = CrosslistError::Validation(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(err.to_string(), "first; second");
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(CrosslistError::NotFound("project p1 not found".into()).status_code(), 404);
        assert_eq!(CrosslistError::validation("Item name is required").status_code(), 400);
        assert_eq!(CrosslistError::Conflict("projects p1 was modified concurrently".into()).status_code(), 409);
        assert_eq!(CrosslistError::Store("disk full".into()).status_code(), 500);
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: CrosslistError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }
}
