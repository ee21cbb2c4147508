//! Fortran 2008 declaration analysis and derived blocks
//!
//! Declarations come in as `attrs :: vars` statements separated by
//! semicolons. Each statement is classified by its leading type spec:
//! `TYPE(MPI_x)` opaque handles, `PROCEDURE(x)` callbacks, `CHARACTER`
//! strings, and everything else.

use std::{collections::VecDeque, sync::OnceLock};

use regex::Regex;

use crate::signature::{split_params, CKind, Parameter, ParameterError, IERROR};

/// Component name holding the integer inside a handle wrapper type
pub const HANDLE_FIELD: &str = "MPI_VAL";

/// Prefix of the function-pointer local generated for each callback
pub const FUNPTR_PREFIX: &str = "cfunptr_";

/// Classification of one declaration statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum F08Kind {
    /// `TYPE(MPI_x)`: opaque handle wrapping one integer
    Handle(String),
    /// `PROCEDURE(x)`: callback
    Procedure(String),
    /// `CHARACTER(...)`: string
    Character,
    /// Anything else
    Other,
}

/// One declared dummy argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F08Variable {
    /// Variable name
    pub name: String,
    /// Declared as an assumed-size array (`(*)`)
    pub assumed_size: bool,
}

/// One declaration statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F08Declaration {
    /// Statement text as written
    pub line: String,
    /// Type classification
    pub kind: F08Kind,
    /// Variables declared by this statement
    pub variables: Vec<F08Variable>,
}

impl F08Declaration {
    fn parse(line: &str) -> Self {
        static HANDLE: OnceLock<Regex> = OnceLock::new();
        static PROCEDURE: OnceLock<Regex> = OnceLock::new();
        static DIMS: OnceLock<Regex> = OnceLock::new();
        static ASSUMED_SIZE: OnceLock<Regex> = OnceLock::new();

        let handle = HANDLE.get_or_init(|| {
            Regex::new(r"(?i)^TYPE\s*\(\s*(MPI_\w+)\s*\)").expect("Invalid handle regex")
        });
        let procedure = PROCEDURE.get_or_init(|| {
            Regex::new(r"(?i)^PROCEDURE\s*\(\s*(\w+)\s*\)").expect("Invalid procedure regex")
        });
        let dims = DIMS.get_or_init(|| {
            Regex::new(r"^(?P<name>[A-Za-z_]\w*)\s*(?:\((?P<dims>.*)\))?")
                .expect("Invalid dims regex")
        });
        let assumed_size = ASSUMED_SIZE.get_or_init(|| {
            Regex::new(r"(?i)DIMENSION\s*\(\s*\*\s*\)").expect("Invalid dimension regex")
        });

        let (attrs, vars) = line.split_once("::").unwrap_or(("", line));
        let attrs = attrs.trim();

        let kind = if let Some(caps) = handle.captures(attrs) {
            F08Kind::Handle(caps[1].to_string())
        } else if let Some(caps) = procedure.captures(attrs) {
            F08Kind::Procedure(caps[1].to_string())
        } else if attrs.to_uppercase().starts_with("CHARACTER") {
            F08Kind::Character
        } else {
            F08Kind::Other
        };

        let attr_assumed_size = assumed_size.is_match(attrs);
        let variables = split_params(vars)
            .into_iter()
            .filter_map(|var| dims.captures(var))
            .map(|caps| {
                let var_dims = caps.name("dims").map(|m| m.as_str().trim());
                F08Variable {
                    name: caps["name"].to_string(),
                    assumed_size: var_dims == Some("*")
                        || (var_dims.is_none() && attr_assumed_size),
                }
            })
            .collect();

        Self {
            line: line.to_string(),
            kind,
            variables,
        }
    }
}

/// All declaration statements of one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct F08Declarations {
    decls: Vec<F08Declaration>,
}

impl F08Declarations {
    /// Parse semicolon-separated declaration statements
    pub fn parse(text: &str) -> Self {
        let decls = text
            .split(';')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(F08Declaration::parse)
            .collect();
        Self { decls }
    }

    /// Iterate over the declaration statements
    pub fn iter(&self) -> impl Iterator<Item = &F08Declaration> {
        self.decls.iter()
    }

    /// Find the declaration of a variable (case-insensitive, as in Fortran)
    pub fn variable(&self, name: &str) -> Option<(&F08Kind, &F08Variable)> {
        self.decls.iter().find_map(|decl| {
            decl.variables
                .iter()
                .find(|var| var.name.eq_ignore_ascii_case(name))
                .map(|var| (&decl.kind, var))
        })
    }

    /// Distinct handle types in order of first appearance
    pub fn handle_types(&self) -> Vec<&str> {
        self.distinct_types(|kind| match kind {
            F08Kind::Handle(ty) => Some(ty.as_str()),
            _ => None,
        })
    }

    /// Distinct callback types in order of first appearance
    pub fn procedure_types(&self) -> Vec<&str> {
        self.distinct_types(|kind| match kind {
            F08Kind::Procedure(ty) => Some(ty.as_str()),
            _ => None,
        })
    }

    fn distinct_types<'a>(&'a self, pick: impl Fn(&'a F08Kind) -> Option<&'a str>) -> Vec<&'a str> {
        let mut types: Vec<&str> = Vec::new();
        for ty in self.decls.iter().filter_map(|decl| pick(&decl.kind)) {
            if !types.iter().any(|seen| seen.eq_ignore_ascii_case(ty)) {
                types.push(ty);
            }
        }
        types
    }

    /// Names of all procedure-typed variables, in declaration order
    pub fn procedure_variables(&self) -> Vec<&str> {
        self.decls
            .iter()
            .filter(|decl| matches!(decl.kind, F08Kind::Procedure(_)))
            .flat_map(|decl| decl.variables.iter().map(|var| var.name.as_str()))
            .collect()
    }

    /// Whether any callback is declared
    pub fn has_procedures(&self) -> bool {
        self.decls.iter().any(|decl| matches!(decl.kind, F08Kind::Procedure(_)))
    }

    /// Whether a choice buffer of assumed rank is declared
    pub fn has_assumed_rank(&self) -> bool {
        static ASSUMED_RANK: OnceLock<Regex> = OnceLock::new();
        let re = ASSUMED_RANK.get_or_init(|| {
            Regex::new(r"(?i)CHOICE_BUFFER_TYPE|DIMENSION\s*\(\s*\.\.\s*\)")
                .expect("Invalid assumed rank regex")
        });
        self.decls.iter().any(|decl| re.is_match(&decl.line))
    }

    fn references_c_ptr(&self) -> bool {
        static C_PTR: OnceLock<Regex> = OnceLock::new();
        let re = C_PTR.get_or_init(|| Regex::new(r"(?i)\bC_PTR\b").expect("Invalid C_PTR regex"));
        self.decls.iter().any(|decl| re.is_match(&decl.line))
    }
}

/// Build the F08 parameter declaration block.
///
/// Original statements are kept verbatim. In front of them go the
/// `ISO_C_BINDING` use clause (only for referenced intrinsics), one BIND(C)
/// wrapper type per distinct handle type and one abstract interface per
/// distinct callback type. After them go the function-pointer locals.
pub fn param_decl_block(decls: &F08Declarations) -> Vec<String> {
    let mut block = Vec::new();

    let mut intrinsics = Vec::new();
    if decls.references_c_ptr() {
        intrinsics.push("C_PTR");
    }
    if decls.has_procedures() {
        intrinsics.extend(["C_FUNPTR", "c_funloc"]);
    }
    if !intrinsics.is_empty() {
        block.push(format!(
            "use, intrinsic :: ISO_C_BINDING, only : {}",
            intrinsics.join(", ")
        ));
    }

    for handle in decls.handle_types() {
        block.push(format!("TYPE, BIND(C) :: {}", handle));
        block.push(format!("    INTEGER :: {}", HANDLE_FIELD));
        block.push(format!("END TYPE {}", handle));
    }

    for procedure in decls.procedure_types() {
        block.push("ABSTRACT INTERFACE".to_string());
        block.push(format!("    SUBROUTINE {}() BIND(C)", procedure));
        block.push(format!("    END SUBROUTINE {}", procedure));
        block.push("END INTERFACE".to_string());
    }

    block.extend(decls.iter().map(|decl| decl.line.clone()));

    block.extend(
        decls
            .procedure_variables()
            .into_iter()
            .map(|var| format!("TYPE(C_FUNPTR) :: {}{}", FUNPTR_PREFIX, var)),
    );

    block
}

/// Build the declaration block of the BIND(C) interface the F08 wrapper calls.
///
/// `length_names` are the hidden string-length arguments, taken from the tail
/// of the legacy argument-name list.
pub fn c_interop_decl_block(decls: &F08Declarations, length_names: &[String]) -> Vec<String> {
    static REWRITES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let rewrites = REWRITES.get_or_init(|| {
        [
            (r"(?i)TYPE\s*\(\s*MPI_\w+\s*\)", "INTEGER"),
            (r"(?i),\s*(?:OPTIONAL|ASYNCHRONOUS)\b", ""),
            (r"(?i)CHARACTER\s*\(\s*LEN\s*=\s*\*\s*\)", "CHARACTER(KIND=C_CHAR), DIMENSION(*)"),
            (r"(?i)PROCEDURE\s*\(\s*\w+\s*\)", "TYPE(C_FUNPTR), VALUE"),
        ]
        .into_iter()
        .map(|(re, with)| (Regex::new(re).expect("Invalid interop regex"), with))
        .collect()
    });

    let mut block: Vec<String> = decls
        .iter()
        .map(|decl| {
            rewrites.iter().fold(decl.line.clone(), |line, (re, with)| {
                re.replace_all(&line, *with).into_owned()
            })
        })
        .collect();

    block.extend(length_names.iter().map(|name| format!("INTEGER, INTENT(IN) :: {}", name)));
    block
}

/// One `cfunptr_<var> = c_funloc(<var>)` statement per callback variable
pub fn precall_statements(decls: &F08Declarations) -> Vec<String> {
    decls
        .procedure_variables()
        .into_iter()
        .map(|var| format!("{}{} = c_funloc({})", FUNPTR_PREFIX, var, var))
        .collect()
}

/// Build the argument list the F08 wrapper passes to the C binding.
///
/// Walks the legacy parameter list in order. Character arguments are
/// queued as they are seen and consumed first-in first-out by the integer
/// length parameters that follow `ierror`.
pub fn to_c_arg_list(
    legacy_params: &[String],
    decls: &F08Declarations,
) -> Result<Vec<String>, ParameterError> {
    let mut args = Vec::with_capacity(legacy_params.len());
    let mut pending_strings = VecDeque::new();
    let mut seen_ierror = false;

    for token in legacy_params {
        let param = Parameter::parse(token)
            .ok_or_else(|| ParameterError::Unclassifiable(token.clone()))?;
        let name = param.name.as_str();

        if name == IERROR {
            seen_ierror = true;
            args.push("c_ierror".to_string());
            continue;
        }

        if seen_ierror && param.is_integer() {
            let string = pending_strings
                .pop_front()
                .ok_or_else(|| ParameterError::Unclassifiable(token.clone()))?;
            args.push(format!("len({})", string));
            continue;
        }

        let arg = match decls.variable(name) {
            Some((F08Kind::Handle(_), var)) if var.assumed_size => {
                format!("{}(1:1)%{}", name, HANDLE_FIELD)
            }
            Some((F08Kind::Handle(_), _)) => format!("{}%{}", name, HANDLE_FIELD),
            Some((F08Kind::Procedure(_), _)) => format!("{}{}", FUNPTR_PREFIX, name),
            Some((F08Kind::Character, _)) => {
                pending_strings.push_back(name.to_string());
                name.to_string()
            }
            None if param.kind() == CKind::Character => {
                pending_strings.push_back(name.to_string());
                name.to_string()
            }
            _ => name.to_string(),
        };
        args.push(arg);
    }

    Ok(args)
}
