// SPDX-License-Identifier: GPL-3.0-only

use camera_settings::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-settings")]
#[command(about = "Inspect and change camera settings and their constraints")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Device capabilities JSON file
    #[arg(long)]
    capabilities: PathBuf,

    /// Camera id used to pick the settings file (default: id in the capabilities file)
    #[arg(short, long)]
    camera: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List active settings with their values and domains
    Show,

    /// Set a setting to a value
    Set { key: String, value: String },

    /// Set a setting by position in its supported values
    SetIndex { key: String, index: usize },

    /// List settings this camera cannot offer
    Filtered,

    /// Show what a setting controls and what controls it
    Deps { key: String },

    /// Forget saved values and return to defaults
    Restore,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // Initialize logging
    // RUST_LOG takes precedence over the configured filter
    // Examples: RUST_LOG=debug, RUST_LOG=camera_settings=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let mut manager = cli::open_manager(&config, &cli.capabilities, cli.camera.as_deref())?;

    match cli.command {
        Commands::Show => cli::show(&manager),
        Commands::Set { key, value } => cli::set(&mut manager, &key, &value),
        Commands::SetIndex { key, index } => cli::set_index(&mut manager, &key, index),
        Commands::Filtered => cli::filtered(&manager),
        Commands::Deps { key } => cli::deps(&manager, &key),
        Commands::Restore => cli::restore(&mut manager),
    }
}
