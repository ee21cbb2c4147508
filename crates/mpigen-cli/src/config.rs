//! Layered configuration
//!
//! Defaults, then the optional `--config` TOML file, then `MPIGEN_*`
//! environment variables, then explicit command-line flags.

use config::{Config, Environment, File};
use mpigen_generation::GeneratorConfig;
use tracing::debug;

use crate::{cli::Cli, error::CliResult};

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "MPIGEN";

/// Build the generator configuration for a command line
pub fn load_config(cli: &Cli) -> CliResult<GeneratorConfig> {
    let mut builder = Config::builder();
    if let Some(path) = &cli.config {
        builder = builder.add_source(File::from(path.clone()));
    }
    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

    let mut config: GeneratorConfig = builder.build()?.try_deserialize()?;

    if let Some(standard) = cli.standard {
        config.target_standard = standard;
    }
    if let Some(library_version) = &cli.library_version {
        config.library_version = Some(library_version.clone());
    }

    config.validate()?;
    debug!(?config, "Loaded configuration");
    Ok(config)
}
