//! Command-line arguments

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use mpigen_generation::StandardVersion;

use crate::error::{CliError, CliResult};

/// Generate MPI C and Fortran bindings from a calls database
#[derive(Debug, Clone, Parser)]
#[command(name = "mpigen", version)]
#[command(about = "Expand binding templates against a database of MPI call signatures")]
pub struct Cli {
    /// Template to expand (.c.in, .h.in or .f90.in)
    #[arg(short, long, requires = "output_file", requires = "calls_database")]
    pub input_file: Option<PathBuf>,

    /// File the expanded template is written to
    #[arg(short, long, requires = "input_file")]
    pub output_file: Option<PathBuf>,

    /// JSON database of call signatures
    #[arg(short = 'm', long)]
    pub calls_database: Option<PathBuf>,

    /// Standard version to target, e.g. 3.1
    #[arg(short, long)]
    pub standard: Option<StandardVersion>,

    /// Library description as reported by MPI_Get_library_version
    #[arg(short, long)]
    pub library_version: Option<String>,

    /// File listing the exported Fortran symbols of the host library
    #[arg(short, long)]
    pub f08_symbols: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Check argument combinations.
    ///
    /// The parser enforces these too; this covers values built in code.
    pub fn validate(&self) -> CliResult<()> {
        if self.input_file.is_some() != self.output_file.is_some() {
            return Err(CliError::InvalidArgument {
                message: "--input-file and --output-file must be given together".to_string(),
            });
        }
        if self.input_file.is_some() && self.calls_database.is_none() {
            return Err(CliError::InvalidArgument {
                message: "--input-file requires --calls-database".to_string(),
            });
        }
        Ok(())
    }
}
