//! Error types for board synchronization

use thiserror::Error;

/// Result type for remote access functions
pub type Result<T> = std::result::Result<T, KanbanError>;

/// Result type for raw backend requests
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// PostgREST code for "JSON object requested, multiple (or no) rows returned"
pub const NO_ROWS_CODE: &str = "PGRST116";

/// Failures reported by a data backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Structured fault returned by the data service
    #[error("{message}")]
    Fault {
        code: Option<String>,
        message: String,
    },

    /// A single-row request matched no row
    #[error("no rows found in {table}")]
    NotFound { table: String },

    /// Network or HTTP-level failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Row could not be encoded or decoded
    #[error("malformed row: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a fault without a code
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            code: None,
            message: message.into(),
        }
    }

    /// Create a fault carrying a backend error code
    pub fn fault_with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fault {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Create a not-found error for a table
    pub fn not_found(table: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
        }
    }

    /// Check if this is the "no matching row" condition
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Fault { code, .. } => code.as_deref() == Some(NO_ROWS_CODE),
            _ => false,
        }
    }
}

/// Errors surfaced by remote access functions
#[derive(Debug, Error)]
pub enum KanbanError {
    /// Backend request failed while performing an action
    #[error("Error {action}: {source}")]
    Backend {
        action: &'static str,
        #[source]
        source: BackendError,
    },

    /// Missing required field
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// Invalid or incomplete configuration
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl KanbanError {
    /// Wrap a backend error with the action that triggered it
    pub fn backend(action: &'static str, source: BackendError) -> Self {
        Self::Backend { action, source }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = KanbanError::backend("creating board", BackendError::fault("permission denied"));
        assert_eq!(err.to_string(), "Error creating board: permission denied");
    }

    #[test]
    fn test_not_found_detection() {
        assert!(BackendError::not_found("boards").is_not_found());
        assert!(BackendError::fault_with_code(NO_ROWS_CODE, "no rows").is_not_found());
        assert!(!BackendError::fault_with_code("23503", "fk violation").is_not_found());
        assert!(!BackendError::fault("boom").is_not_found());
    }

    #[test]
    fn test_missing_field() {
        let err = KanbanError::missing_field("title");
        assert_eq!(err.to_string(), "missing required field: title");
    }
}
