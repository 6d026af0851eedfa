// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatgate - a chat-request gateway.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use chatgate_config::{ChatgateConfig, ConfigError};
use clap::{Parser, Subcommand};

/// Chatgate - routes chat turns to direct, tool, or workflow backends.
#[derive(Parser, Debug)]
#[command(name = "chatgate", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server.
    Serve,
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Load and validate configuration, reporting every problem found.
    Check,
}

fn load(path: Option<&PathBuf>) -> Result<ChatgateConfig, Vec<ConfigError>> {
    match path {
        Some(path) => chatgate_config::load_and_validate_path(path),
        None => chatgate_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            chatgate_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("chatgate: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => {
            println!(
                "chatgate: config OK (gateway.name={}, listen={}:{}, storage={:?})",
                config.gateway.name,
                config.gateway.host,
                config.gateway.port,
                config.storage.backend
            );
        }
        None => {
            println!("chatgate: use --help for available commands");
        }
    }
}
