//! modserve - development web server for native ES modules.
//!
//! Entry point: parses arguments, initializes logging and colors, and
//! hands off to the run loop.

use clap::Parser;
use miette::Result;
use modserve_cli::{cli, error, logger, run, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors();

    run::execute(args).await.map_err(error::cli_error_to_miette)
}
