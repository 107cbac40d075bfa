//! Hotview - incremental view compiler with a hot-swapping runtime.

mod actor;
mod bridge;
mod cache;
mod cli;
mod collab;
mod compiler;
mod config;
mod core;
mod freshness;
mod logger;
mod runtime;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{HotviewConfig, init_config};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = init_config(HotviewConfig::load(cli)?);

    match &cli.command {
        Commands::Build { name, .. } => cli::build::build_package(config, name, false).map(|_| ()),
        Commands::Serve { .. } => cli::serve::serve(config),
    }
}
