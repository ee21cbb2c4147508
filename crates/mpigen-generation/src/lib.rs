#![warn(missing_docs)]

//! Binding generation for library call signatures
//!
//! Takes a declarative database of C function signatures, derives the
//! matching legacy Fortran and Fortran 2008 (ISO_C_BINDING) shapes, and
//! expands per-call regions of `.c.in`, `.h.in` and `.f90.in` templates.
//!
//! The pipeline is one-shot and deterministic:
//! raw [`CallSignature`] records are enriched once by the [`Enricher`],
//! then a [`TemplateProcessor`] streams one template into one output file.

pub mod config;
pub mod database;
pub mod enricher;
pub mod error;
pub mod fortran;
pub mod models;
pub mod signature;
pub mod templates;
pub mod wrap;

// Re-export public API
pub use config::GeneratorConfig;
pub use database::{load_database, load_symbol_list, parse_database};
pub use enricher::{enrich, BindingSet, EnrichedCall, EnrichedCalls, Enricher, F08Binding};
pub use error::{DerivationError, GenerationError};
pub use models::{CallSignature, LibraryIdentity, StandardVersion};
pub use signature::{extract_names, legacy_fortran_params, Parameter, ParameterError};
pub use templates::{process, ProcessSummary, TemplateError, TemplateFamily, TemplateProcessor};
pub use wrap::{collapse_blank_lines, wrap_block, wrap_list};
