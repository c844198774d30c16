//! Flash Filesystem CLI Tool - Main Entry Point

use anyhow::Result;
use clap::Parser;
use flashfs_cli::cli;

fn main() -> Result<()> {
    env_logger::init();
    let cli = cli::Cli::parse();
    cli::run(cli, &mut std::io::stdout().lock())
}
