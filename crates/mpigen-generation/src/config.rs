//! Generator configuration

use serde::Deserialize;

use crate::{
    error::GenerationError,
    models::{LibraryIdentity, StandardVersion},
    wrap::{BLOCK_CONTINUATION_INDENT, DEFAULT_LINE_WIDTH},
};

/// Settings shared by enrichment and template processing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Standard version generated code targets
    pub target_standard: StandardVersion,
    /// Free-form host library description, used for `broken_in` matching
    pub library_version: Option<String>,
    /// Maximum line length of generated Fortran
    pub fortran_line_width: usize,
    /// Indentation of continuation lines in wrapped argument lists
    pub continuation_indent: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            target_standard: StandardVersion::default(),
            library_version: None,
            fortran_line_width: DEFAULT_LINE_WIDTH,
            continuation_indent: BLOCK_CONTINUATION_INDENT,
        }
    }
}

impl GeneratorConfig {
    /// Host library identity parsed from `library_version`, if recognized
    pub fn library_identity(&self) -> Option<LibraryIdentity> {
        self.library_version.as_deref().and_then(LibraryIdentity::parse)
    }

    /// Reject settings the line wrapper cannot honor
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.fortran_line_width == 0 {
            return Err(GenerationError::InvalidConfig(
                "fortran_line_width must be greater than 0".to_string(),
            ));
        }
        // Continuation lines need room for the indent, one word and " &"
        if self.fortran_line_width <= self.continuation_indent + 2 {
            return Err(GenerationError::InvalidConfig(format!(
                "fortran_line_width ({}) must exceed continuation_indent ({}) plus the continuation marker",
                self.fortran_line_width, self.continuation_indent
            )));
        }
        Ok(())
    }
}
