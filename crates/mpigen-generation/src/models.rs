//! Data models for call signature records

use std::{collections::BTreeMap, fmt, str::FromStr, sync::OnceLock};

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

/// Tag assigned to records that do not declare any
pub const UNKNOWN_TAG: &str = "unknown";

/// One function's full description as stored in the calls database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSignature {
    /// Library-prefixed symbol name (e.g. `MPI_Send`)
    pub name: String,
    /// Raw C parameter-list text, or `void`
    pub c_params: String,
    /// Legacy Fortran parameter list; derived from `c_params` when absent
    pub fortran_params: Option<String>,
    /// Semicolon-separated Fortran 2008 declarations; absence means no F08 artifacts
    pub f08_decl: Option<String>,
    /// Lower-cased classification tags
    pub tags: Vec<String>,
    /// Minimum standard version that provides this call
    pub since: Option<String>,
    /// Library name to version patterns known to break this call
    pub broken_in: BTreeMap<String, Vec<String>>,
    /// Whether the record takes part in generation at all
    pub enabled: bool,
}

impl CallSignature {
    /// Create a record with only the required fields set
    pub fn new(name: impl Into<String>, c_params: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            c_params: c_params.into(),
            fortran_params: None,
            f08_decl: None,
            tags: vec![UNKNOWN_TAG.to_string()],
            since: None,
            broken_in: BTreeMap::new(),
            enabled: true,
        }
    }

    /// Set an explicit legacy Fortran parameter list
    pub fn with_fortran_params(mut self, params: impl Into<String>) -> Self {
        self.fortran_params = Some(params.into());
        self
    }

    /// Set the Fortran 2008 declarations
    pub fn with_f08_decl(mut self, decl: impl Into<String>) -> Self {
        self.f08_decl = Some(decl.into());
        self
    }

    /// Set the tags from a comma-separated list
    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags = normalize_tags(tags.split(','));
        self
    }

    /// Set the minimum standard version
    pub fn with_since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    /// Add broken version patterns for one library
    pub fn with_broken_in(mut self, library: impl Into<String>, patterns: &[&str]) -> Self {
        self.broken_in
            .entry(library.into())
            .or_default()
            .extend(patterns.iter().map(|p| p.to_string()));
        self
    }

    /// Mark the record as disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Check whether `identity` matches one of the `broken_in` patterns.
    ///
    /// Patterns are regular expressions anchored at the start of the
    /// concrete version string. Invalid patterns never match.
    pub fn is_broken_in(&self, identity: &LibraryIdentity) -> bool {
        let Some(patterns) = self.broken_in.get(&identity.name) else {
            return false;
        };

        patterns.iter().any(|pattern| {
            match Regex::new(&format!("^(?:{})", pattern)) {
                Ok(re) => re.is_match(&identity.version),
                Err(e) => {
                    warn!(call = %self.name, %pattern, "Ignoring invalid broken_in pattern: {}", e);
                    false
                }
            }
        })
    }
}

/// Trim, lower-case and de-empty tags, falling back to [`UNKNOWN_TAG`]
pub(crate) fn normalize_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if tags.is_empty() {
        vec![UNKNOWN_TAG.to_string()]
    } else {
        tags
    }
}

/// A `major.minor` standard version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "VersionInput")]
pub struct StandardVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
}

impl StandardVersion {
    /// Create a version from its parts
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse the first `N[.M]` group found in `text`
    pub fn parse(text: &str) -> Option<Self> {
        static VERSION: OnceLock<Regex> = OnceLock::new();
        let re = VERSION.get_or_init(|| {
            Regex::new(r"(\d+)(?:\.(\d+))?").expect("Invalid version regex")
        });

        let caps = re.captures(text)?;
        let major = caps.get(1)?.as_str().parse().ok()?;
        let minor = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        Some(Self { major, minor })
    }
}

impl Default for StandardVersion {
    fn default() -> Self {
        Self::new(5, 0)
    }
}

impl fmt::Display for StandardVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for StandardVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("not a version: {}", s))
    }
}

/// Versions may be written as strings or bare numbers in config files
#[derive(Deserialize)]
#[serde(untagged)]
enum VersionInput {
    Text(String),
    Number(f64),
}

impl TryFrom<VersionInput> for StandardVersion {
    type Error = String;

    fn try_from(input: VersionInput) -> Result<Self, Self::Error> {
        match input {
            VersionInput::Text(text) => text.parse(),
            VersionInput::Number(n) => n.to_string().parse(),
        }
    }
}

/// Name and version of the host library implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryIdentity {
    /// Library name as used in `broken_in` keys (e.g. `Open MPI`)
    pub name: String,
    /// Concrete version string (e.g. `4.1.2`)
    pub version: String,
}

impl LibraryIdentity {
    /// Create an identity from its parts
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse a free-form library description such as the one reported by
    /// `MPI_Get_library_version`.
    ///
    /// Returns `None` for implementations that are not recognized.
    pub fn parse(description: &str) -> Option<Self> {
        static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
        let patterns = PATTERNS.get_or_init(|| {
            [
                ("Open MPI", r"open mpi v(\d+\.\d+\.\d+)"),
                ("MPICH", r"mpich version:\s*(\d+\.\d+\.\d+)"),
                ("Intel MPI", r"intel\(r\) mpi library\s+(\d+\.\d+)"),
            ]
            .into_iter()
            .map(|(name, re)| (name, Regex::new(re).expect("Invalid library regex")))
            .collect()
        });

        let description = description.trim().to_lowercase();
        patterns.iter().find_map(|(name, re)| {
            re.captures(&description)
                .and_then(|caps| caps.get(1))
                .map(|version| Self::new(*name, version.as_str()))
        })
    }
}
