//! mpigen entry point

use anyhow::Context;
use clap::Parser;
use mpigen_cli::{init_logging, run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    run(&cli)
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("mpigen failed")
}
