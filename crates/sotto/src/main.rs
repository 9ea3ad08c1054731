// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sotto - an encrypted conversational relay for customer-support chat.
//!
//! This is the binary entry point for the relay server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sotto_config::SottoConfig;

mod serve;

/// Sotto - an encrypted conversational relay for customer-support chat.
#[derive(Parser, Debug)]
#[command(name = "sotto", version, about, long_about = None)]
struct Cli {
    /// Path to a config file, bypassing the XDG lookup.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the bind address from the config.
    #[arg(long, global = true, value_name = "ADDR")]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay server (the default when no subcommand is given).
    Run,
    /// Load and validate configuration, then exit.
    CheckConfig,
    /// Print the effective configuration with secrets redacted.
    PrintConfig,
}

fn load(cli: &Cli) -> Result<SottoConfig, Vec<sotto_config::ConfigError>> {
    match &cli.config {
        Some(path) => sotto_config::load_and_validate_path(path),
        None => sotto_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match load(&cli) {
        Ok(config) => config,
        Err(errors) => {
            sotto_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::CheckConfig => {
            println!("configuration ok");
        }
        Commands::PrintConfig => match toml::to_string_pretty(&config.redacted()) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("error: failed to render configuration: {e}");
                std::process::exit(2);
            }
        },
        Commands::Run => {
            if let Err(errors) = sotto_config::validate_for_serve(&config) {
                sotto_config::render_errors(&errors);
                std::process::exit(1);
            }
            if let Err(e) = serve::run(config).await {
                eprintln!("error: {e}");
                std::process::exit(2);
            }
        }
    }
}
