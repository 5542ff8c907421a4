//! mirrorplay - run and inspect mirrored media players from the command line.

use std::{error::Error, process};

use clap::Parser;
use mirrorplay::{
    cli::{Cli, CliError, Command, formatting::format_error, run_demo},
    config::{Config, ConfigError},
    tracing_config,
};
use tracing::{Level, span};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string()));
            process::exit(1);
        }
    };

    let log_guard = if cli.log_file {
        Some(tracing_config::init_with_file(config.general.log_level)?)
    } else {
        tracing_config::init(config.general.log_level)?;
        None
    };

    let result = {
        let _span = span!(Level::INFO, "mirrorplay").entered();
        execute(&cli.command, &config).await
    };

    match result {
        Ok(output) => {
            if !output.trim().is_empty() {
                println!("{output}");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string()));
            drop(log_guard);
            process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    match &cli.config {
        Some(path) => Config::load(path),
        None => Config::load_main(),
    }
}

async fn execute(command: &Command, config: &Config) -> Result<String, CliError> {
    match command {
        Command::Demo(options) => run_demo(config, options).await,
        Command::Schema => {
            let schema = schemars::schema_for!(Config);
            Ok(serde_json::to_string_pretty(&schema)?)
        }
        Command::Config => Ok(config.to_toml_string()?),
    }
}
