//! Error types for binding generation

use thiserror::Error;

use crate::templates::TemplateError;

/// Errors that can occur while loading and enriching call records
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The calls database has an unexpected shape
    #[error("Invalid calls database: {0}")]
    InvalidDatabase(String),

    /// Generator configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A derivation failed for a call
    #[error(transparent)]
    Derivation(#[from] DerivationError),

    /// Template processing failed
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A derivation that could not be computed for one call.
///
/// Kept inside the enriched record and only raised when a template actually
/// asks for an attribute that depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Call {call}: {reason}")]
pub struct DerivationError {
    /// Call whose signature could not be derived
    pub call: String,
    /// What went wrong
    pub reason: String,
}

impl DerivationError {
    /// Create a derivation error for the given call
    pub fn new(call: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            call: call.into(),
            reason: reason.into(),
        }
    }
}
