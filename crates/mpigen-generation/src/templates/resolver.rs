//! Attribute lookup for placeholders and conditions
//!
//! A static table maps each attribute name to a pure accessor over
//! [`EnrichedCall`]. The table is built once and never changes.

use std::{borrow::Cow, collections::HashMap, sync::OnceLock};

use crate::{
    enricher::{EnrichedCall, F08Binding},
    error::DerivationError,
};

/// Prefix of every rendered semantic tag
pub const SEMANTIC_TAG_PREFIX: &str = "MPI_SEMANTIC_";

/// Value of one attribute on one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue<'a> {
    /// Single-line text
    Text(Cow<'a, str>),
    /// Multi-line block, one entry per line
    Block(&'a [String]),
    /// Tag set
    Tags(&'a [String]),
    /// Boolean flag
    Flag(bool),
}

impl AttrValue<'_> {
    /// Render for substitution; block lines after the first get `indent`
    pub fn render(&self, indent: &str) -> String {
        match self {
            AttrValue::Text(text) => text.to_string(),
            AttrValue::Block(lines) => lines.join(format!("\n{}", indent).as_str()),
            AttrValue::Tags(tags) => tags
                .iter()
                .map(|tag| format!("{}{}", SEMANTIC_TAG_PREFIX, tag.to_uppercase()))
                .collect::<Vec<_>>()
                .join(" | "),
            AttrValue::Flag(flag) => String::from(if *flag { "1" } else { "0" }),
        }
    }

    /// Truthiness used by bare `where(field)` conditions
    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Text(text) => !text.is_empty(),
            AttrValue::Block(lines) | AttrValue::Tags(lines) => !lines.is_empty(),
            AttrValue::Flag(flag) => *flag,
        }
    }

    /// Containment used by `"lit" in field` conditions.
    ///
    /// Tags test membership (case-insensitive), text tests for a substring.
    pub fn contains(&self, literal: &str) -> bool {
        match self {
            AttrValue::Text(text) => text.contains(literal),
            AttrValue::Block(lines) => lines.iter().any(|line| line.contains(literal)),
            AttrValue::Tags(tags) => tags.iter().any(|tag| tag.eq_ignore_ascii_case(literal)),
            AttrValue::Flag(_) => false,
        }
    }
}

/// Result of looking up an attribute on a call.
///
/// `Ok(None)` means the call has no such attribute (e.g. F08 attributes on
/// a call without F08 declarations).
pub type Lookup<'a> = Result<Option<AttrValue<'a>>, &'a DerivationError>;

type Accessor = fn(&EnrichedCall) -> Lookup<'_>;

fn text(value: &str) -> Lookup<'_> {
    Ok(Some(AttrValue::Text(Cow::Borrowed(value))))
}

fn owned(value: String) -> Lookup<'static> {
    Ok(Some(AttrValue::Text(Cow::Owned(value))))
}

fn flag(value: bool) -> Lookup<'static> {
    Ok(Some(AttrValue::Flag(value)))
}

fn define(found: Option<bool>) -> Lookup<'static> {
    Ok(found.map(|found| AttrValue::Text(Cow::Borrowed(if found { "define" } else { "undef" }))))
}

fn with_f08<'a>(call: &'a EnrichedCall, pick: fn(&'a F08Binding) -> AttrValue<'a>) -> Lookup<'a> {
    Ok(call.f08()?.map(pick))
}

fn mpi_name(call: &EnrichedCall) -> Lookup<'_> {
    text(call.name())
}

fn mpi_lcase(call: &EnrichedCall) -> Lookup<'_> {
    owned(call.name().to_lowercase())
}

fn mpi_ucase(call: &EnrichedCall) -> Lookup<'_> {
    owned(call.name().to_uppercase())
}

fn mpi_keyname(call: &EnrichedCall) -> Lookup<'_> {
    text(call.key_name()?)
}

fn c_params(call: &EnrichedCall) -> Lookup<'_> {
    text(call.c_params())
}

fn c_arg_list(call: &EnrichedCall) -> Lookup<'_> {
    owned(call.bindings()?.c_arg_names.join(", "))
}

fn f_params(call: &EnrichedCall) -> Lookup<'_> {
    owned(call.bindings()?.legacy_fortran_params.join(", "))
}

fn f_arg_list(call: &EnrichedCall) -> Lookup<'_> {
    owned(call.bindings()?.legacy_fortran_arg_names.join(", "))
}

fn f08_arg_list(call: &EnrichedCall) -> Lookup<'_> {
    with_f08(call, |f08| AttrValue::Text(Cow::Borrowed(&f08.arg_list)))
}

fn f08_decls(call: &EnrichedCall) -> Lookup<'_> {
    with_f08(call, |f08| AttrValue::Block(&f08.param_decl_block))
}

fn f08_c_decls(call: &EnrichedCall) -> Lookup<'_> {
    with_f08(call, |f08| AttrValue::Block(&f08.c_interop_decl_block))
}

fn f08_precall(call: &EnrichedCall) -> Lookup<'_> {
    with_f08(call, |f08| AttrValue::Block(&f08.precall_statements))
}

fn f08_c_arg_list(call: &EnrichedCall) -> Lookup<'_> {
    with_f08(call, |f08| AttrValue::Text(Cow::Borrowed(&f08.to_c_arg_list)))
}

fn tags(call: &EnrichedCall) -> Lookup<'_> {
    Ok(Some(AttrValue::Tags(call.tags())))
}

fn since(call: &EnrichedCall) -> Lookup<'_> {
    text(call.since().unwrap_or_default())
}

fn define_f08(call: &EnrichedCall) -> Lookup<'_> {
    define(call.define_f08())
}

fn define_f08ts(call: &EnrichedCall) -> Lookup<'_> {
    define(call.define_f08ts())
}

fn has_f08(call: &EnrichedCall) -> Lookup<'_> {
    flag(call.has_f08())
}

fn has_strings(call: &EnrichedCall) -> Lookup<'_> {
    flag(call.bindings()?.string_count > 0)
}

fn has_callbacks(call: &EnrichedCall) -> Lookup<'_> {
    flag(call.has_callbacks())
}

fn has_assumed_rank(call: &EnrichedCall) -> Lookup<'_> {
    flag(call.has_assumed_rank())
}

fn enabled(call: &EnrichedCall) -> Lookup<'_> {
    flag(call.is_enabled())
}

fn attribute_table() -> &'static HashMap<&'static str, Accessor> {
    static TABLE: OnceLock<HashMap<&'static str, Accessor>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let entries: [(&'static str, Accessor); 23] = [
            ("mpi_name", mpi_name),
            ("mpi_lcase", mpi_lcase),
            ("mpi_ucase", mpi_ucase),
            ("mpi_keyname", mpi_keyname),
            ("c_params", c_params),
            ("c_arg_list", c_arg_list),
            ("f_params", f_params),
            ("f_arg_list", f_arg_list),
            ("f08_arg_list", f08_arg_list),
            ("f08_decls", f08_decls),
            ("f08_c_decls", f08_c_decls),
            ("f08_precall", f08_precall),
            ("f08_c_arg_list", f08_c_arg_list),
            ("tags", tags),
            ("since", since),
            ("define_f08", define_f08),
            ("define_f08ts", define_f08ts),
            ("has_f08", has_f08),
            ("has_strings", has_strings),
            ("has_callbacks", has_callbacks),
            ("has_assumed_rank", has_assumed_rank),
            ("enabled", enabled),
            ("is_enabled", enabled),
        ];
        entries.into_iter().collect()
    })
}

/// Whether `name` is a known attribute (case-insensitive)
pub fn is_known(name: &str) -> bool {
    attribute_table().contains_key(name.to_lowercase().as_str())
}

/// Look up attribute `name` (case-insensitive) on `call`.
///
/// Returns `None` when no attribute of that name exists at all.
pub fn lookup<'a>(call: &'a EnrichedCall, name: &str) -> Option<Lookup<'a>> {
    attribute_table()
        .get(name.to_lowercase().as_str())
        .map(|accessor| accessor(call))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{enricher::Enricher, models::CallSignature, StandardVersion};

    fn enrich(record: CallSignature) -> EnrichedCall {
        Enricher::new(StandardVersion::new(3, 1)).enrich_one(&record)
    }

    fn render(call: &EnrichedCall, name: &str) -> String {
        lookup(call, name).unwrap().unwrap().unwrap().render("")
    }

    #[test]
    fn test_naming_attributes() {
        let call = enrich(CallSignature::new("MPI_Example", "int x, char *msg"));
        assert_eq!(render(&call, "MPI_NAME"), "MPI_Example");
        assert_eq!(render(&call, "mpi_lcase"), "mpi_example");
        assert_eq!(render(&call, "MPI_UCASE"), "MPI_EXAMPLE");
        assert_eq!(render(&call, "MPI_KEYNAME"), "Example");
        assert_eq!(render(&call, "C_ARG_LIST"), "x, msg");
        assert_eq!(render(&call, "F_ARG_LIST"), "x, msg, ierror, msg_len");
        assert_eq!(render(&call, "has_strings"), "1");
    }

    #[test]
    fn test_tags_render_as_semantic_mask() {
        let call = enrich(CallSignature::new("MPI_Send", "void").with_tags("p2p, blocking"));
        assert_eq!(render(&call, "tags"), "MPI_SEMANTIC_P2P | MPI_SEMANTIC_BLOCKING");

        let value = lookup(&call, "tags").unwrap().unwrap().unwrap();
        assert!(value.contains("P2P"));
        assert!(!value.contains("p2"));
    }

    #[test]
    fn test_unknown_attribute() {
        let call = enrich(CallSignature::new("MPI_Send", "void"));
        assert!(lookup(&call, "no_such_field").is_none());
        assert!(!is_known("no_such_field"));
        assert!(is_known("F08_DECLS"));
    }

    #[test]
    fn test_f08_attributes_absent_without_declarations() {
        let call = enrich(CallSignature::new("MPI_Send", "void"));
        assert_eq!(lookup(&call, "f08_decls"), Some(Ok(None)));
        assert_eq!(lookup(&call, "define_f08"), Some(Ok(None)));
        assert_eq!(render(&call, "has_f08"), "0");
    }

    #[test]
    fn test_block_render_indents_continuation_lines() {
        let call = enrich(
            CallSignature::new("MPI_Comm_free", "MPI_Comm *comm")
                .with_f08_decl("TYPE(MPI_Comm), INTENT(INOUT) :: comm"),
        );
        let value = lookup(&call, "f08_decls").unwrap().unwrap().unwrap();
        assert_eq!(
            value.render("    "),
            "TYPE, BIND(C) :: MPI_Comm\n        INTEGER :: MPI_VAL\n    END TYPE MPI_Comm\n    TYPE(MPI_Comm), INTENT(INOUT) :: comm"
        );
    }

    #[test]
    fn test_failed_derivation_surfaces_on_lookup() {
        let call = enrich(CallSignature::new("MPI_Broken", "int"));
        assert!(matches!(lookup(&call, "c_arg_list"), Some(Err(_))));
        assert_eq!(render(&call, "mpi_name"), "MPI_Broken");
    }

    #[test]
    fn test_keyname_requires_library_prefix() {
        let call = enrich(CallSignature::new("MPIX_Query_cuda_support", "void"));
        assert!(matches!(
            lookup(&call, "mpi_keyname"),
            Some(Err(e)) if e.call == "MPIX_Query_cuda_support"
        ));
        assert_eq!(render(&call, "mpi_lcase"), "mpix_query_cuda_support");
    }
}
