//! Tether - live document sync for a browser-based visual editor.

#![allow(dead_code)]

mod actor;
mod cli;
mod client;
mod config;
mod core;
mod logger;
mod protocol;
mod reload;
mod serializer;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SyncConfig;
use core::ServerContext;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = SyncConfig::load(&cli)?;

    match &cli.command {
        Commands::Serve { .. } => {
            let ctx = Arc::new(ServerContext::new(Arc::new(config)));
            cli::serve::serve(ctx)
        }
        Commands::Tree { components, .. } => cli::client::tree(&config, *components),
        Commands::Push { page, file, .. } => cli::client::push(&config, page, file),
        Commands::Attach { page, .. } => cli::client::attach(&config, page.as_deref()),
        Commands::Format { file } => cli::format::format_file(file),
    }
}
