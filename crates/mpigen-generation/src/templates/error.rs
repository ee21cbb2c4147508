//! Template processing errors

use std::path::PathBuf;

use thiserror::Error;

use crate::error::DerivationError;

/// Errors raised while processing a template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template file name does not end in a supported suffix
    #[error("Unsupported template {}: file name must end in .c.in, .h.in or .f90.in", path.display())]
    UnsupportedSuffix {
        /// Offending template path
        path: PathBuf,
    },

    /// Malformed placeholder syntax in a region
    #[error("Invalid template syntax at line {line}: {message}")]
    InvalidSyntax {
        /// Template line where the problem was found
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// A placeholder names no attribute available on the expanding call
    #[error("Call {call} has no attribute for placeholder {{{placeholder}}}")]
    MissingAttribute {
        /// Call being expanded
        call: String,
        /// Placeholder as written in the template
        placeholder: String,
    },

    /// An attribute used by the template could not be derived
    #[error(transparent)]
    Derivation(#[from] DerivationError),

    /// Template file could not be opened
    #[error("Cannot open template {}: {source}", path.display())]
    TemplateOpen {
        /// Template path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Output file could not be created
    #[error("Cannot create output {}: {source}", path.display())]
    OutputCreate {
        /// Output path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// IO error while streaming
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
