//! Start-marker directives
//!
//! The start-marker line of a region may carry a `where(...)` inclusion
//! condition and an `exclude(...)` name pattern. Clauses that cannot be
//! parsed fall back to their defaults with a warning.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::{enricher::EnrichedCall, templates::error::TemplateError};

use super::resolver::{self, AttrValue};

/// Inclusion condition of a region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `"lit" in field` or `"lit" not in field`
    Contains {
        /// Attribute tested
        field: String,
        /// Literal searched for
        literal: String,
        /// Whether the test is `not in`
        negated: bool,
    },
    /// `field` or `not field`
    BoolAttribute {
        /// Attribute tested
        field: String,
        /// Whether the test is negated
        negated: bool,
    },
    /// No condition
    Always,
}

impl Condition {
    /// Parse the `where(...)` clause of a start-marker line.
    ///
    /// A missing clause is [`Condition::Always`]; so is any clause that
    /// cannot be parsed or names an unknown attribute.
    pub fn parse(line: &str) -> Self {
        static WHERE: OnceLock<Regex> = OnceLock::new();
        let re = WHERE
            .get_or_init(|| Regex::new(r"\bwhere\s*\(").expect("Invalid where regex"));

        match clause_body(line, re, "where") {
            Some(expr) => Self::parse_expr(expr.trim()),
            None => Condition::Always,
        }
    }

    fn parse_expr(expr: &str) -> Self {
        static CONTAINS: OnceLock<Regex> = OnceLock::new();
        static BOOL: OnceLock<Regex> = OnceLock::new();
        let contains = CONTAINS.get_or_init(|| {
            Regex::new(
                r#"^(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')\s+(?P<not>not\s+)?in\s+(?:mpi_call\.)?(?P<field>\w+)$"#,
            )
            .expect("Invalid contains regex")
        });
        let boolean = BOOL.get_or_init(|| {
            Regex::new(r"^(?P<not>not\s+)?(?:mpi_call\.)?(?P<field>\w+)$")
                .expect("Invalid boolean regex")
        });

        let condition = if let Some(caps) = contains.captures(expr) {
            let literal = caps.name("dq").or_else(|| caps.name("sq"));
            Condition::Contains {
                field: caps["field"].to_lowercase(),
                literal: literal.map(|m| m.as_str().to_string()).unwrap_or_default(),
                negated: caps.name("not").is_some(),
            }
        } else if let Some(caps) = boolean.captures(expr) {
            Condition::BoolAttribute {
                field: caps["field"].to_lowercase(),
                negated: caps.name("not").is_some(),
            }
        } else {
            warn!(condition = %expr, "Unparseable where clause, treating as always true");
            return Condition::Always;
        };

        match condition.field() {
            Some(field) if !resolver::is_known(field) => {
                warn!(%field, "Unknown attribute in where clause, treating as always true");
                Condition::Always
            }
            _ => condition,
        }
    }

    fn field(&self) -> Option<&str> {
        match self {
            Condition::Contains { field, .. } | Condition::BoolAttribute { field, .. } => {
                Some(field)
            }
            Condition::Always => None,
        }
    }

    /// Evaluate the condition for `call`.
    ///
    /// Absent attributes neither contain anything nor are true.
    pub fn evaluate(&self, call: &EnrichedCall) -> Result<bool, TemplateError> {
        let Some(field) = self.field() else {
            return Ok(true);
        };

        let value: Option<AttrValue<'_>> = match resolver::lookup(call, field) {
            Some(Ok(value)) => value,
            Some(Err(e)) => return Err(TemplateError::Derivation(e.clone())),
            None => return Ok(true),
        };

        Ok(match self {
            Condition::Contains {
                literal, negated, ..
            } => value.is_some_and(|v| v.contains(literal)) != *negated,
            Condition::BoolAttribute { negated, .. } => {
                value.is_some_and(|v| v.is_truthy()) != *negated
            }
            Condition::Always => true,
        })
    }
}

/// Parsed start-marker clauses of one region
#[derive(Debug, Clone)]
pub struct Directive {
    /// Inclusion condition
    pub condition: Condition,
    /// Names matching this pattern are skipped
    pub exclude: Option<Regex>,
}

impl Directive {
    /// Parse the remainder of a start-marker line
    pub fn parse(line: &str) -> Self {
        Self {
            condition: Condition::parse(line),
            exclude: parse_exclude(line),
        }
    }

    /// Whether `call` is expanded in this region.
    ///
    /// Disabled calls are filtered out by the caller before this is asked.
    pub fn includes(&self, call: &EnrichedCall) -> Result<bool, TemplateError> {
        if self.is_excluded(call.name()) {
            return Ok(false);
        }
        self.condition.evaluate(call)
    }

    /// Whether `name` matches the exclude pattern
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.as_ref().is_some_and(|re| re.is_match(name))
    }
}

/// Text between the parentheses of a `keyword(...)` clause.
///
/// Nested parentheses are balanced; quoted or `\`-escaped ones do not count.
/// `None` when the clause is absent or never closed.
fn clause_body<'a>(line: &'a str, opening: &Regex, keyword: &str) -> Option<&'a str> {
    let start = opening.find(line)?.end();
    let mut depth = 1;
    let mut quote = None;
    let mut escaped = false;

    for (i, ch) in line[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(&line[start..start + i]);
                }
            }
            _ => {}
        }
    }

    warn!(clause = keyword, "Unbalanced parentheses in directive clause, ignoring it");
    None
}

fn parse_exclude(line: &str) -> Option<Regex> {
    static EXCLUDE: OnceLock<Regex> = OnceLock::new();
    let re = EXCLUDE
        .get_or_init(|| Regex::new(r"\bexclude\s*\(").expect("Invalid exclude regex"));

    let pattern = clause_body(line, re, "exclude")?.trim();
    if pattern.is_empty() {
        return None;
    }

    match Regex::new(&format!("(?i)^(?:{})", pattern)) {
        Ok(exclude) => Some(exclude),
        Err(e) => {
            warn!(%pattern, error = %e, "Invalid exclude pattern, excluding nothing");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{enricher::Enricher, models::CallSignature, StandardVersion};

    fn enrich(record: CallSignature) -> EnrichedCall {
        Enricher::new(StandardVersion::new(3, 1)).enrich_one(&record)
    }

    #[test]
    fn test_parse_contains() {
        assert_eq!(
            Condition::parse(r#"#pragma pygen start where("p2p" in mpi_call.tags)"#),
            Condition::Contains {
                field: "tags".to_string(),
                literal: "p2p".to_string(),
                negated: false,
            }
        );
        assert_eq!(
            Condition::parse("where('collectives' not in tags)"),
            Condition::Contains {
                field: "tags".to_string(),
                literal: "collectives".to_string(),
                negated: true,
            }
        );
    }

    #[test]
    fn test_parse_bool_attribute() {
        assert_eq!(
            Condition::parse("where(not mpi_call.has_f08)"),
            Condition::BoolAttribute {
                field: "has_f08".to_string(),
                negated: true,
            }
        );
        assert_eq!(
            Condition::parse("where( has_strings )"),
            Condition::BoolAttribute {
                field: "has_strings".to_string(),
                negated: false,
            }
        );
    }

    #[test]
    fn test_unparseable_conditions_degrade() {
        assert_eq!(Condition::parse("no clause here"), Condition::Always);
        assert_eq!(Condition::parse("where(a and b or c)"), Condition::Always);
        assert_eq!(Condition::parse("where(no_such_attribute)"), Condition::Always);
        assert_eq!(Condition::parse("where()"), Condition::Always);
    }

    #[test]
    fn test_evaluate() {
        let send =
            enrich(CallSignature::new("MPI_Send", "const void *buf, int count").with_tags("p2p"));
        let open = enrich(CallSignature::new("MPI_File_open", "const char *filename"));

        let p2p = Condition::parse(r#"where("p2p" in tags)"#);
        assert!(p2p.evaluate(&send).unwrap());
        assert!(!p2p.evaluate(&open).unwrap());

        let strings = Condition::parse("where(has_strings)");
        assert!(!strings.evaluate(&send).unwrap());
        assert!(strings.evaluate(&open).unwrap());

        let const_free = Condition::parse(r#"where("const" not in c_params)"#);
        assert!(!const_free.evaluate(&send).unwrap());
    }

    #[test]
    fn test_evaluate_absent_attribute() {
        let call = enrich(CallSignature::new("MPI_Send", "void"));
        assert!(!Condition::parse(r#"where("comm" in f08_decls)"#).evaluate(&call).unwrap());
        assert!(Condition::parse(r#"where("comm" not in f08_decls)"#).evaluate(&call).unwrap());
        assert!(!Condition::parse("where(define_f08)").evaluate(&call).unwrap());
    }

    #[test]
    fn test_evaluate_derivation_failure() {
        let call = enrich(CallSignature::new("MPI_Broken", "int"));
        let condition = Condition::parse("where(has_strings)");
        assert!(matches!(condition.evaluate(&call), Err(TemplateError::Derivation(_))));
        assert!(Condition::parse("where(has_f08)").evaluate(&call).is_ok());
    }

    #[test]
    fn test_exclude_is_start_anchored_and_case_insensitive() {
        let directive = Directive::parse("#pragma pygen start exclude(mpi_comm_.*)");
        assert!(directive.is_excluded("MPI_Comm_rank"));
        assert!(!directive.is_excluded("PMPI_Comm_rank"));
        assert!(!directive.is_excluded("MPI_Send"));
    }

    #[test]
    fn test_clause_order_does_not_matter() {
        let send = enrich(CallSignature::new("MPI_Send", "void").with_tags("p2p"));
        let recv = enrich(CallSignature::new("MPI_Recv", "void").with_tags("p2p"));

        for line in [
            r#"exclude(MPI_Send) where("p2p" in tags)"#,
            r#"where("p2p" in tags) exclude(MPI_Send)"#,
        ] {
            let directive = Directive::parse(line);
            assert_eq!(
                directive.exclude.as_ref().map(Regex::as_str),
                Some("(?i)^(?:MPI_Send)")
            );
            assert!(!directive.includes(&send).unwrap());
            assert!(directive.includes(&recv).unwrap());
        }
    }

    #[test]
    fn test_exclude_pattern_with_groups() {
        let directive = Directive::parse("exclude(MPI_(Send|Recv)) where(enabled)");
        assert!(directive.is_excluded("MPI_Send"));
        assert!(directive.is_excluded("MPI_Recv"));
        assert!(!directive.is_excluded("MPI_Bcast"));
        assert_eq!(
            directive.condition,
            Condition::BoolAttribute {
                field: "enabled".to_string(),
                negated: false,
            }
        );
    }

    #[test]
    fn test_quoted_parenthesis_in_where() {
        assert_eq!(
            Condition::parse(r#"where(")" in c_params) exclude(MPI_Send)"#),
            Condition::Contains {
                field: "c_params".to_string(),
                literal: ")".to_string(),
                negated: false,
            }
        );
    }

    #[test]
    fn test_invalid_exclude_degrades() {
        let directive = Directive::parse("exclude(MPI_(Send)");
        assert!(directive.exclude.is_none());
        assert!(!directive.is_excluded("MPI_Send"));
    }

    #[test]
    fn test_where_and_exclude_together() {
        let directive = Directive::parse(r#"!$PYGEN start where("p2p" in tags) exclude(MPI_Send)"#);
        let send = enrich(CallSignature::new("MPI_Send", "void").with_tags("p2p"));
        let recv = enrich(CallSignature::new("MPI_Recv", "void").with_tags("p2p"));
        let bcast = enrich(CallSignature::new("MPI_Bcast", "void").with_tags("collectives"));

        assert!(!directive.includes(&send).unwrap());
        assert!(directive.includes(&recv).unwrap());
        assert!(!directive.includes(&bcast).unwrap());
    }
}
