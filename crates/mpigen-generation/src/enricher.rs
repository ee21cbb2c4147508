//! Signature enrichment
//!
//! Turns raw [`CallSignature`] records into immutable [`EnrichedCall`]s.
//! Each record is enriched by a pure function of its raw fields, the target
//! standard and the host library identity; nothing is mutated afterwards.

use tracing::debug;

use crate::{
    config::GeneratorConfig,
    error::DerivationError,
    fortran::{self, F08Declarations},
    models::{CallSignature, LibraryIdentity, StandardVersion},
    signature::{self, split_params, IERROR},
    wrap::{wrap_list, BLOCK_CONTINUATION_INDENT, DEFAULT_LINE_WIDTH},
};

/// Library prefixes a call name may start with
pub const LIBRARY_PREFIXES: &[&str] = &["PMPI_", "MPI_"];

/// Bindings derived from the C parameter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSet {
    /// C argument names in parameter order
    pub c_arg_names: Vec<String>,
    /// Legacy Fortran parameters, including the ierror and length tail
    pub legacy_fortran_params: Vec<String>,
    /// Names of the legacy Fortran parameters
    pub legacy_fortran_arg_names: Vec<String>,
    /// Number of character parameters
    pub string_count: usize,
    /// Fortran 2008 bindings, present when the record declares them
    pub f08: Option<Result<F08Binding, DerivationError>>,
}

/// Fortran 2008 bindings derived from the F08 declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F08Binding {
    /// Dummy argument list of the F08 subroutine, wrapped
    pub arg_list: String,
    /// Parameter declaration block
    pub param_decl_block: Vec<String>,
    /// Declaration block of the BIND(C) interface
    pub c_interop_decl_block: Vec<String>,
    /// Statements to run before calling into C
    pub precall_statements: Vec<String>,
    /// Arguments passed to the C binding, wrapped
    pub to_c_arg_list: String,
}

/// One call after enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedCall {
    name: String,
    key_name: Result<String, DerivationError>,
    enabled: bool,
    tags: Vec<String>,
    since: Option<String>,
    c_params: String,
    has_f08: bool,
    has_callbacks: bool,
    has_assumed_rank: bool,
    define_f08: Option<bool>,
    define_f08ts: Option<bool>,
    bindings: Result<BindingSet, DerivationError>,
}

impl EnrichedCall {
    /// Library-prefixed call name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call name without its library prefix
    pub fn key_name(&self) -> Result<&str, &DerivationError> {
        self.key_name.as_deref()
    }

    /// Whether the call takes part in template expansion
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Lower-cased tags
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Minimum standard version as written in the database
    pub fn since(&self) -> Option<&str> {
        self.since.as_deref()
    }

    /// C parameter list with the constness macro resolved
    pub fn c_params(&self) -> &str {
        &self.c_params
    }

    /// Whether the record declares Fortran 2008 parameters
    pub fn has_f08(&self) -> bool {
        self.has_f08
    }

    /// Whether the F08 declarations contain callbacks
    pub fn has_callbacks(&self) -> bool {
        self.has_callbacks
    }

    /// Whether the F08 declarations contain an assumed-rank choice buffer
    pub fn has_assumed_rank(&self) -> bool {
        self.has_assumed_rank
    }

    /// Whether an exported `<name>_f08` symbol was found; `None` without a symbol list
    pub fn define_f08(&self) -> Option<bool> {
        self.define_f08
    }

    /// Whether an exported `<name>_f08ts` symbol was found; `None` without a symbol list
    pub fn define_f08ts(&self) -> Option<bool> {
        self.define_f08ts
    }

    /// Bindings derived from the C parameter list
    pub fn bindings(&self) -> Result<&BindingSet, &DerivationError> {
        self.bindings.as_ref()
    }

    /// Fortran 2008 bindings; `Ok(None)` when the record declares none
    pub fn f08(&self) -> Result<Option<&F08Binding>, &DerivationError> {
        match self.bindings()?.f08.as_ref() {
            None => Ok(None),
            Some(Ok(f08)) => Ok(Some(f08)),
            Some(Err(e)) => Err(e),
        }
    }
}

/// Immutable, ordered collection of enriched calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichedCalls {
    calls: Vec<EnrichedCall>,
}

impl EnrichedCalls {
    /// Iterate over enabled calls in database order
    pub fn enabled(&self) -> impl Iterator<Item = &EnrichedCall> {
        self.calls.iter().filter(|call| call.is_enabled())
    }

    /// Find a call by name
    pub fn get(&self, name: &str) -> Option<&EnrichedCall> {
        self.calls.iter().find(|call| call.name == name)
    }

    /// Number of calls, disabled ones included
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Derives bindings for raw call records
#[derive(Debug, Clone)]
pub struct Enricher {
    target_standard: StandardVersion,
    host: Option<LibraryIdentity>,
    f08_symbols: Option<Vec<String>>,
    line_width: usize,
    continuation_indent: usize,
}

impl Enricher {
    /// Create an enricher for the given target standard
    pub fn new(target_standard: StandardVersion) -> Self {
        Self {
            target_standard,
            host: None,
            f08_symbols: None,
            line_width: DEFAULT_LINE_WIDTH,
            continuation_indent: BLOCK_CONTINUATION_INDENT,
        }
    }

    /// Create an enricher from generator settings
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            target_standard: config.target_standard,
            host: config.library_identity(),
            f08_symbols: None,
            line_width: config.fortran_line_width,
            continuation_indent: config.continuation_indent,
        }
    }

    /// Set the host library identity used for `broken_in` matching
    pub fn with_host(mut self, host: Option<LibraryIdentity>) -> Self {
        self.host = host;
        self
    }

    /// Set the exported F08 symbol fragments found in the host library
    pub fn with_f08_symbols(mut self, symbols: Vec<String>) -> Self {
        self.f08_symbols = Some(symbols);
        self
    }

    /// Enrich every record, preserving order
    pub fn enrich(&self, records: &[CallSignature]) -> EnrichedCalls {
        let calls: Vec<EnrichedCall> = records
            .iter()
            .map(|record| self.enrich_one(record))
            .collect();

        debug!(
            total = calls.len(),
            enabled = calls.iter().filter(|c| c.enabled).count(),
            standard = %self.target_standard,
            "Enriched call records"
        );
        EnrichedCalls { calls }
    }

    /// Enrich a single record.
    ///
    /// Never fails; derivations that cannot be computed are kept on the
    /// record and raised when a template uses them.
    pub fn enrich_one(&self, raw: &CallSignature) -> EnrichedCall {
        let key_name = LIBRARY_PREFIXES
            .iter()
            .find_map(|prefix| raw.name.strip_prefix(prefix))
            .map(str::to_string)
            .ok_or_else(|| {
                DerivationError::new(&raw.name, "name does not carry a recognized library prefix")
            });

        let enabled = self.is_enabled(raw);
        let c_params = signature::resolve_const_macro(&raw.c_params, self.target_standard);
        let decls = raw.f08_decl.as_deref().map(F08Declarations::parse);
        let bindings = self.derive_bindings(raw, &c_params, decls.as_ref());

        let lcase = raw.name.to_lowercase();
        let f08_symbol = format!("{}_f08", lcase);
        let f08ts_symbol = format!("{}_f08ts", lcase);

        EnrichedCall {
            key_name,
            enabled,
            tags: raw.tags.clone(),
            since: raw.since.clone(),
            c_params,
            has_f08: decls.is_some(),
            has_callbacks: decls.as_ref().is_some_and(F08Declarations::has_procedures),
            has_assumed_rank: decls.as_ref().is_some_and(F08Declarations::has_assumed_rank),
            define_f08: self.f08_symbols.as_ref().map(|symbols| {
                symbols.iter().any(|s| is_f08_symbol(s, &f08_symbol))
            }),
            define_f08ts: self
                .f08_symbols
                .as_ref()
                .map(|symbols| symbols.iter().any(|s| s.contains(&f08ts_symbol))),
            bindings,
            name: raw.name.clone(),
        }
    }

    fn is_enabled(&self, raw: &CallSignature) -> bool {
        if !raw.enabled {
            debug!(call = %raw.name, "Call disabled in database");
            return false;
        }

        if let Some(since) = raw.since.as_deref().and_then(StandardVersion::parse) {
            if since > self.target_standard {
                debug!(call = %raw.name, %since, "Call newer than target standard");
                return false;
            }
        }

        if let Some(host) = &self.host {
            if raw.is_broken_in(host) {
                debug!(
                    call = %raw.name,
                    library = %host.name,
                    version = %host.version,
                    "Call broken in host library"
                );
                return false;
            }
        }

        true
    }

    fn derive_bindings(
        &self,
        raw: &CallSignature,
        c_params: &str,
        decls: Option<&F08Declarations>,
    ) -> Result<BindingSet, DerivationError> {
        let fail = |e: signature::ParameterError| DerivationError::new(&raw.name, e.to_string());

        let c_arg_names = signature::extract_names(c_params).map_err(fail)?;

        let legacy_fortran_params = match raw.fortran_params.as_deref() {
            Some(fpar) => {
                let fpar = signature::resolve_const_macro(fpar, self.target_standard);
                split_params(&fpar).into_iter().map(str::to_string).collect()
            }
            None => signature::legacy_fortran_params(c_params).map_err(fail)?,
        };
        let legacy_fortran_arg_names =
            signature::extract_names(&legacy_fortran_params.join(", ")).map_err(fail)?;

        let string_count = split_params(c_params)
            .into_iter()
            .filter_map(signature::Parameter::parse)
            .filter(|p| p.kind() == signature::CKind::Character)
            .count();

        let f08 = decls.map(|decls| {
            self.derive_f08(&legacy_fortran_params, &legacy_fortran_arg_names, decls)
                .map_err(fail)
        });

        Ok(BindingSet {
            c_arg_names,
            legacy_fortran_params,
            legacy_fortran_arg_names,
            string_count,
            f08,
        })
    }

    fn derive_f08(
        &self,
        legacy_params: &[String],
        legacy_names: &[String],
        decls: &F08Declarations,
    ) -> Result<F08Binding, signature::ParameterError> {
        // Everything after ierror is a hidden string length
        let ierror_at = legacy_names.iter().position(|name| name == IERROR);
        let (dummy_names, length_names) = match ierror_at {
            Some(i) => legacy_names.split_at(i + 1),
            None => (legacy_names, &[][..]),
        };

        let indent = " ".repeat(self.continuation_indent);
        let to_c_args = fortran::to_c_arg_list(legacy_params, decls)?;

        Ok(F08Binding {
            arg_list: wrap_list(&dummy_names.join(", "), self.line_width, &indent),
            param_decl_block: fortran::param_decl_block(decls),
            c_interop_decl_block: fortran::c_interop_decl_block(decls, length_names),
            precall_statements: fortran::precall_statements(decls),
            to_c_arg_list: wrap_list(&to_c_args.join(", "), self.line_width, &indent),
        })
    }
}

/// `<name>_f08` optionally followed by trailing underscores, but not `_f08ts`
fn is_f08_symbol(symbol: &str, f08_symbol: &str) -> bool {
    symbol
        .strip_prefix(f08_symbol)
        .is_some_and(|rest| rest.chars().all(|c| c == '_'))
}

/// Enrich `records` for `target_standard`, gating on the host library identity.
pub fn enrich(
    records: &[CallSignature],
    target_standard: StandardVersion,
    host: Option<&LibraryIdentity>,
) -> EnrichedCalls {
    Enricher::new(target_standard)
        .with_host(host.cloned())
        .enrich(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u32, minor: u32) -> StandardVersion {
        StandardVersion::new(major, minor)
    }

    #[test]
    fn test_naming() {
        let call = Enricher::new(v(3, 1))
            .enrich_one(&CallSignature::new("MPI_Comm_rank", "MPI_Comm comm, int *rank"));
        assert_eq!(call.name(), "MPI_Comm_rank");
        assert_eq!(call.key_name(), Ok("Comm_rank"));
        assert!(call.is_enabled());
    }

    #[test]
    fn test_unrecognized_prefix_is_deferred() {
        let call =
            Enricher::new(v(3, 1)).enrich_one(&CallSignature::new("Foo_Bar", "void"));
        let err = call.key_name().unwrap_err();
        assert_eq!(err.call, "Foo_Bar");
        assert!(err.reason.contains("prefix"));
        assert_eq!(call.name(), "Foo_Bar");
    }

    #[test]
    fn test_disabled_record_with_unrecognized_prefix() {
        let records = vec![
            CallSignature::new("MPIX_Query_cuda_support", "void").disabled(),
            CallSignature::new("MPI_Send", "void"),
        ];
        let calls = enrich(&records, v(3, 1), None);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls.enabled().map(|c| c.name()).collect::<Vec<_>>(), vec!["MPI_Send"]);
        assert_eq!(calls.get("MPI_Send").unwrap().key_name(), Ok("Send"));
    }

    #[test]
    fn test_since_gating() {
        let record = CallSignature::new("MPI_Isendrecv", "void").with_since("4.0");
        assert!(!Enricher::new(v(3, 1)).enrich_one(&record).is_enabled());
        assert!(Enricher::new(v(4, 0)).enrich_one(&record).is_enabled());
    }

    #[test]
    fn test_broken_in_gating() {
        let record = CallSignature::new("MPI_Foo", "void").with_broken_in("LibX", &["2\\.1.*"]);

        let broken = LibraryIdentity::new("LibX", "2.1.3");
        let calls = enrich(std::slice::from_ref(&record), v(3, 1), Some(&broken));
        assert!(!calls.get("MPI_Foo").unwrap().is_enabled());

        let fixed = LibraryIdentity::new("LibX", "2.2.0");
        let calls = enrich(std::slice::from_ref(&record), v(3, 1), Some(&fixed));
        assert!(calls.get("MPI_Foo").unwrap().is_enabled());

        let calls = enrich(std::slice::from_ref(&record), v(3, 1), None);
        assert!(calls.get("MPI_Foo").unwrap().is_enabled());
    }

    #[test]
    fn test_disabled_record_stays_in_collection() {
        let records = vec![
            CallSignature::new("MPI_A", "void").disabled(),
            CallSignature::new("MPI_B", "void"),
        ];
        let calls = enrich(&records, v(3, 1), None);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls.enabled().map(|c| c.name()).collect::<Vec<_>>(), vec!["MPI_B"]);
    }

    #[test]
    fn test_const_macro_resolved_before_parsing() {
        let record = CallSignature::new("MPI_Send", "MPI3_CONST void *buf, int count");
        let modern = Enricher::new(v(3, 0)).enrich_one(&record);
        assert_eq!(modern.c_params(), "const void *buf, int count");

        let legacy = Enricher::new(v(2, 2)).enrich_one(&record);
        assert_eq!(legacy.c_params(), "void *buf, int count");
        assert_eq!(legacy.bindings().unwrap().c_arg_names, vec!["buf", "count"]);
    }

    #[test]
    fn test_legacy_bindings() {
        let call = Enricher::new(v(3, 1))
            .enrich_one(&CallSignature::new("MPI_Example", "int x, char *msg"));
        let bindings = call.bindings().unwrap();
        assert_eq!(bindings.c_arg_names, vec!["x", "msg"]);
        assert_eq!(
            bindings.legacy_fortran_params,
            vec!["MPI_Fint *x", "char *msg", "MPI_Fint *ierror", "int msg_len"]
        );
        assert_eq!(bindings.legacy_fortran_arg_names, vec!["x", "msg", "ierror", "msg_len"]);
        assert_eq!(bindings.string_count, 1);
        assert!(bindings.f08.is_none());
        assert_eq!(call.f08(), Ok(None));
    }

    #[test]
    fn test_explicit_fortran_params_are_kept() {
        let record = CallSignature::new("MPI_Init", "int *argc, char ***argv")
            .with_fortran_params("MPI_Fint *ierror");
        let call = Enricher::new(v(3, 1)).enrich_one(&record);
        let bindings = call.bindings().unwrap();
        assert_eq!(bindings.legacy_fortran_params, vec!["MPI_Fint *ierror"]);
        assert_eq!(bindings.legacy_fortran_arg_names, vec!["ierror"]);
    }

    #[test]
    fn test_derivation_failure_is_deferred() {
        let call = Enricher::new(v(3, 1))
            .enrich_one(&CallSignature::new("MPI_Broken", "int"));
        let err = call.bindings().unwrap_err();
        assert_eq!(err.call, "MPI_Broken");
        assert!(err.reason.contains("int"));
    }

    #[test]
    fn test_f08_bindings() {
        let record = CallSignature::new(
            "MPI_Comm_set_name",
            "MPI_Comm comm, MPI3_CONST char *comm_name",
        )
        .with_f08_decl(
            "TYPE(MPI_Comm), INTENT(IN) :: comm; \
             CHARACTER(LEN=*), INTENT(IN) :: comm_name; \
             INTEGER, OPTIONAL, INTENT(OUT) :: ierror",
        );
        let call = Enricher::new(v(3, 1)).enrich_one(&record);
        assert!(call.has_f08());
        assert!(!call.has_callbacks());

        let f08 = call.f08().unwrap().unwrap();
        assert_eq!(f08.arg_list, "comm, comm_name, ierror");
        assert_eq!(f08.to_c_arg_list, "comm%MPI_VAL, comm_name, c_ierror, len(comm_name)");
        assert_eq!(
            f08.c_interop_decl_block.last().map(String::as_str),
            Some("INTEGER, INTENT(IN) :: comm_name_len")
        );
        assert_eq!(f08.param_decl_block[0], "TYPE, BIND(C) :: MPI_Comm");
        assert!(f08.precall_statements.is_empty());
    }

    #[test]
    fn test_long_f08_arg_list_is_wrapped() {
        let params = (0..20)
            .map(|i| format!("int argument_number_{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let record =
            CallSignature::new("MPI_Wide", params).with_f08_decl("INTEGER :: argument_number_0");
        let call = Enricher::new(v(3, 1)).enrich_one(&record);
        let f08 = call.f08().unwrap().unwrap();
        assert!(f08.to_c_arg_list.contains(" &\n        "));
        assert!(f08.to_c_arg_list.lines().all(|line| line.len() <= 100));
    }

    #[test]
    fn test_f08_symbol_gating() {
        let symbols = vec![
            "mpi_send_f08__".to_string(),
            "mpi_recv_f08ts".to_string(),
            "mpi_sendrecv_f08".to_string(),
        ];
        let enricher = Enricher::new(v(3, 1)).with_f08_symbols(symbols);

        let send = enricher.enrich_one(&CallSignature::new("MPI_Send", "void"));
        assert_eq!(send.define_f08(), Some(true));
        assert_eq!(send.define_f08ts(), Some(false));

        let recv = enricher.enrich_one(&CallSignature::new("MPI_Recv", "void"));
        assert_eq!(recv.define_f08(), Some(false));
        assert_eq!(recv.define_f08ts(), Some(true));

        let plain = Enricher::new(v(3, 1))
            .enrich_one(&CallSignature::new("MPI_Send", "void"));
        assert_eq!(plain.define_f08(), None);
    }
}
