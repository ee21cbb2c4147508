//! Template processing
//!
//! Scans `.c.in`/`.h.in`/`.f90.in` templates for directive regions and
//! expands each region once per matching call.

pub mod directive;
pub mod error;
pub mod parser;
pub mod processor;
pub mod resolver;

// Re-export public API
pub use directive::{Condition, Directive};
pub use error::TemplateError;
pub use parser::{BlockTemplate, Segment};
pub use processor::{process, ProcessSummary, TemplateFamily, TemplateProcessor};
pub use resolver::{lookup, AttrValue, Lookup};
