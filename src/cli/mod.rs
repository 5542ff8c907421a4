//! Command-line interface.
//!
//! `demo` drives a headless player through a full lifecycle; `schema` and
//! `config` inspect configuration.

mod demo;
pub mod formatting;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::{config::ConfigError, services::PlayerError};

pub use demo::{DemoOptions, run_demo};

/// Errors surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration could not be loaded or rendered
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A player operation failed
    #[error("player error: {0}")]
    Player(#[from] PlayerError),

    /// JSON output could not be produced
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Report text could not be written
    #[error("output error: {0}")]
    Output(#[from] std::fmt::Error),
}

/// Mirror one media player into many views.
#[derive(Parser, Debug)]
#[command(name = "mirrorplay", version, about)]
pub struct Cli {
    /// Configuration file; defaults to the standard location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to the rolling log file
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a headless player with mirrored views and report sync passes
    Demo(DemoOptions),

    /// Print the configuration JSON schema
    Schema,

    /// Print the effective configuration as TOML
    Config,
}
