//! Treesync CLI Binary

use anyhow::Context;
use clap::Parser;
use std::process;
use treesync::cli::{Cli, CliContext};
use treesync::logging::init_logging;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut context = CliContext::new(cli.root.clone(), cli.config.clone())
        .context("Error initializing project")?;
    context.apply_logging_overrides(&cli);
    init_logging(Some(&context.config().logging)).context("Error initializing logging")?;

    let output = context.execute(&cli.command)?;
    println!("{}", output);
    Ok(())
}
