//! mpigen command-line front end
//!
//! Parses arguments, layers configuration and drives the generation
//! pipeline: load the calls database, enrich it, expand one template.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;

use mpigen_generation::{load_database, load_symbol_list, Enricher, TemplateProcessor};
use tracing::{debug, info};

// Re-export public API
pub use crate::cli::Cli;
pub use crate::config::load_config;
pub use crate::error::{CliError, CliResult};
pub use crate::logging::init_logging;

/// Run one invocation
pub fn run(cli: &Cli) -> CliResult<()> {
    cli.validate()?;
    let config = load_config(cli)?;

    let Some(database) = &cli.calls_database else {
        debug!("No calls database given, nothing to do");
        return Ok(());
    };
    let records = load_database(database)?;

    let mut enricher = Enricher::from_config(&config);
    if let Some(path) = &cli.f08_symbols {
        let symbols = load_symbol_list(path)?;
        debug!(count = symbols.len(), "Loaded exported Fortran symbols");
        enricher = enricher.with_f08_symbols(symbols);
    }
    let calls = enricher.enrich(&records);

    match (&cli.input_file, &cli.output_file) {
        (Some(input), Some(output)) => {
            TemplateProcessor::new(&calls)
                .with_line_width(config.fortran_line_width)
                .process(input, output)?;
        }
        _ => info!(
            calls = calls.len(),
            enabled = calls.enabled().count(),
            "Calls database is valid"
        ),
    }

    Ok(())
}
