use mpigen_generation::{GenerationError, TemplateError};
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!(
                    "Invalid argument: {}\n\nRun 'mpigen --help' for usage information.",
                    message
                )
            }
            CliError::Config(e) => {
                format!(
                    "Configuration error: {}\n\nCheck the --config file and MPIGEN_* variables.",
                    e
                )
            }
            CliError::Generation(e) => format!("Binding generation failed: {}", e),
            CliError::Template(e) => format!("Template processing failed: {}", e),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
