//! Error types for Tarifa
//!
//! Missing products and clients are not errors: they degrade to annotated
//! results. Only malformed configuration, caller misuse at batch level, and
//! infrastructure failures surface here.

use thiserror::Error;

/// Result type alias using TarifaError
pub type Result<T> = std::result::Result<T, TarifaError>;

/// Unified error type for Tarifa operations
#[derive(Debug, Error)]
pub enum TarifaError {
    // Rule configuration errors
    #[error("Invalid rule {rule_id}: {reason}")]
    InvalidRule { rule_id: String, reason: String },

    // Batch-level caller errors
    #[error("Pricing batch is empty")]
    EmptyBatch,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Arithmetic errors
    #[error("Pricing calculation overflow")]
    Overflow,

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TarifaError {
    /// Build an [`TarifaError::InvalidRule`] for the given rule label
    pub fn invalid_rule(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        TarifaError::InvalidRule {
            rule_id: rule_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller rather than by configuration or infrastructure
    pub fn is_client_error(&self) -> bool {
        matches!(self, TarifaError::EmptyBatch | TarifaError::InvalidRequest(_))
    }
}

impl From<serde_json::Error> for TarifaError {
    fn from(err: serde_json::Error) -> Self {
        TarifaError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for TarifaError {
    fn from(err: std::io::Error) -> Self {
        TarifaError::Storage(err.to_string())
    }
}
