//! Loading the calls database
//!
//! The database is a JSON document with a top-level `mpi_calls` array.
//! Entries that are not objects (section headers kept as plain strings)
//! are skipped.

use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::GenerationError,
    models::{normalize_tags, CallSignature},
};

/// Key of the call array in the database document
pub const CALLS_KEY: &str = "mpi_calls";

/// Record layout as stored on disk
#[derive(Debug, Deserialize)]
struct RawCall {
    name: String,
    #[serde(alias = "cpar")]
    c_params: String,
    #[serde(default, alias = "fpar")]
    fortran_params: Option<String>,
    #[serde(default, alias = "f08par")]
    f08_decl: Option<String>,
    #[serde(default)]
    tags: Option<RawTags>,
    #[serde(default)]
    since: Option<String>,
    #[serde(default)]
    broken_in: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    disabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTags {
    List(Vec<String>),
    Text(String),
}

impl From<RawCall> for CallSignature {
    fn from(raw: RawCall) -> Self {
        let tags = match &raw.tags {
            Some(RawTags::List(list)) => normalize_tags(list.iter().map(String::as_str)),
            Some(RawTags::Text(text)) => normalize_tags(text.split(',')),
            None => normalize_tags(std::iter::empty()),
        };

        Self {
            name: raw.name,
            c_params: raw.c_params,
            fortran_params: raw.fortran_params.filter(|f| !f.trim().is_empty()),
            f08_decl: raw.f08_decl.filter(|f| !f.trim().is_empty()),
            tags,
            since: raw.since.filter(|s| !s.trim().is_empty()),
            broken_in: raw.broken_in,
            enabled: !raw.disabled,
        }
    }
}

/// Parse a calls database from JSON text
pub fn parse_database(json: &str) -> Result<Vec<CallSignature>, GenerationError> {
    let document: Value = serde_json::from_str(json)?;
    let entries = document
        .get(CALLS_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            GenerationError::InvalidDatabase(format!("missing `{}` array", CALLS_KEY))
        })?;

    let mut calls = Vec::with_capacity(entries.len());
    for entry in entries {
        if !entry.is_object() {
            debug!("Skipping non-record database entry: {}", entry);
            continue;
        }
        let raw: RawCall = serde_json::from_value(entry.clone())?;
        calls.push(CallSignature::from(raw));
    }

    Ok(calls)
}

/// Load a calls database from a JSON file
pub fn load_database(path: &Path) -> Result<Vec<CallSignature>, GenerationError> {
    let json = fs::read_to_string(path)?;
    let calls = parse_database(&json)?;
    debug!(path = %path.display(), count = calls.len(), "Loaded calls database");
    Ok(calls)
}

/// Load exported symbol names, one per line, blank lines ignored
pub fn load_symbol_list(path: &Path) -> Result<Vec<String>, GenerationError> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
