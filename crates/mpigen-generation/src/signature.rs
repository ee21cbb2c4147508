//! C parameter-list parsing and legacy Fortran derivation
//!
//! There is no C grammar here: a parameter list is split on top-level
//! commas and each token is matched against a single `type name[dims]`
//! pattern. Anything that does not fit that shape is reported back to the
//! caller, which attaches the offending call name.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::StandardVersion;

/// Parameter-list text meaning "no parameters"
pub const VOID_SENTINEL: &str = "void";

/// Source-level constness macro resolved before any parsing
pub const CONST_MACRO: &str = "MPI3_CONST";

/// Name of the trailing error argument of every legacy Fortran binding
pub const IERROR: &str = "ierror";

/// Errors raised while parsing parameter text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// Token does not look like `type name[dims]`
    #[error("unmatched parameter token `{0}`")]
    Unmatched(String),

    /// Token cannot be mapped to an F08-to-C call argument
    #[error("unclassifiable parameter token `{0}`")]
    Unclassifiable(String),
}

/// Classification of a C parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CKind {
    /// `char *name`: a string needing a hidden length argument in Fortran
    Character,
    /// `void *name`: passed through untouched
    VoidPointer,
    /// Any other scalar, handle or array
    Other,
}

/// One parsed parameter token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Type text as written, including qualifiers and pointer stars
    pub ty: String,
    /// Parameter name
    pub name: String,
    /// Trailing array brackets, possibly empty
    pub dims: String,
}

impl Parameter {
    /// Parse a single parameter token
    pub fn parse(token: &str) -> Option<Self> {
        static PARAM: OnceLock<Regex> = OnceLock::new();
        let re = PARAM.get_or_init(|| {
            Regex::new(r"^(?P<ty>.*[\s*&])(?P<name>[A-Za-z_]\w*)\s*(?P<dims>(?:\[[^\]]*\]\s*)*)$")
                .expect("Invalid parameter regex")
        });

        let caps = re.captures(token.trim())?;
        let ty = caps.name("ty")?.as_str().trim().to_string();
        if ty.is_empty() {
            return None;
        }

        Some(Self {
            ty,
            name: caps.name("name")?.as_str().to_string(),
            dims: caps.name("dims").map_or("", |m| m.as_str()).trim().to_string(),
        })
    }

    /// Type words without qualifiers or pointer stars
    fn base_type(&self) -> String {
        self.ty
            .replace('*', " ")
            .split_whitespace()
            .filter(|word| *word != "const" && *word != "volatile")
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn pointer_depth(&self) -> usize {
        self.ty.matches('*').count()
    }

    /// Whether the type carries a `const` qualifier
    pub fn is_const(&self) -> bool {
        self.ty.replace('*', " ").split_whitespace().any(|w| w == "const")
    }

    /// Classify the parameter
    pub fn kind(&self) -> CKind {
        let base = self.base_type();
        let depth = self.pointer_depth();

        if base == "char" && depth == 1 && self.dims.is_empty() {
            CKind::Character
        } else if base == "void" && depth >= 1 {
            CKind::VoidPointer
        } else {
            CKind::Other
        }
    }

    /// Whether this is a plain integer scalar (`int` or `MPI_Fint`)
    pub fn is_integer(&self) -> bool {
        let base = self.base_type();
        (base == "int" || base == "MPI_Fint") && self.dims.is_empty()
    }
}

/// Resolve the constness macro for `standard`.
///
/// From standard 3.0 on the macro becomes the `const` keyword, before that
/// it is removed together with its trailing whitespace.
pub fn resolve_const_macro(text: &str, standard: StandardVersion) -> String {
    static MACRO: OnceLock<Regex> = OnceLock::new();
    let re = MACRO.get_or_init(|| {
        Regex::new(&format!(r"\b{}\b\s*", CONST_MACRO)).expect("Invalid const macro regex")
    });

    if standard >= StandardVersion::new(3, 0) {
        text.replace(CONST_MACRO, "const")
    } else {
        re.replace_all(text, "").into_owned()
    }
}

/// Split a parameter list on top-level commas.
///
/// `void` and empty text yield no tokens.
pub fn split_params(params: &str) -> Vec<&str> {
    let params = params.trim();
    if params.is_empty() || params == VOID_SENTINEL {
        return Vec::new();
    }

    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in params.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                tokens.push(params[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    tokens.push(params[start..].trim());
    tokens
}

/// Extract parameter names from a parameter list, dropping array brackets.
///
/// ```
/// use mpigen_generation::extract_names;
///
/// assert_eq!(extract_names("int a, char *b[]").unwrap(), vec!["a", "b"]);
/// assert!(extract_names("void").unwrap().is_empty());
/// ```
pub fn extract_names(params: &str) -> Result<Vec<String>, ParameterError> {
    split_params(params)
        .into_iter()
        .map(|token| {
            Parameter::parse(token)
                .map(|p| p.name)
                .ok_or_else(|| ParameterError::Unmatched(token.to_string()))
        })
        .collect()
}

/// Derive the legacy Fortran parameter list from a C parameter list.
///
/// `void *` and `char *` parameters pass through unchanged, everything else
/// becomes `[const ]MPI_Fint *name`. The list always ends with
/// `MPI_Fint *ierror` followed by one `int <name>_len` per character
/// parameter, in encounter order.
pub fn legacy_fortran_params(c_params: &str) -> Result<Vec<String>, ParameterError> {
    let mut params = Vec::new();
    let mut strings = Vec::new();

    for token in split_params(c_params) {
        let param =
            Parameter::parse(token).ok_or_else(|| ParameterError::Unmatched(token.to_string()))?;

        match param.kind() {
            CKind::Character => {
                params.push(token.to_string());
                strings.push(param.name);
            }
            CKind::VoidPointer => params.push(token.to_string()),
            CKind::Other => {
                let qualifier = if param.is_const() { "const " } else { "" };
                params.push(format!("{}MPI_Fint *{}", qualifier, param.name));
            }
        }
    }

    params.push(format!("MPI_Fint *{}", IERROR));
    params.extend(strings.iter().map(|name| format!("int {}_len", name)));
    Ok(params)
}
