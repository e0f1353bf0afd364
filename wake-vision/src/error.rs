//! Classified failures of the curation pipeline.

use thiserror::Error;

/// Failures that reject a configuration or a record.
///
/// The variants are wrapped into [anyhow::Error] and can be recovered with
/// `downcast_ref::<CurationError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurationError {
    #[error("invalid configuration value for '{field}': {reason}")]
    Config { field: String, reason: String },
    #[error("malformed record field '{field}': {reason}")]
    Schema { field: String, reason: String },
}

impl CurationError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
