//! CLI argument definitions using clap
//!
//! Commands:
//! - apiquery serve --config <path> [--port <port>]
//! - apiquery plan --config <path>
//! - apiquery check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// apiquery - translate HTTP query parameters into safe query plans
#[derive(Parser, Debug)]
#[command(name = "apiquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve `GET /api/{entity}` over HTTP
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./apiquery.json")]
        config: PathBuf,

        /// Overrides server.port from the configuration
        #[arg(long)]
        port: Option<u16>,
    },

    /// Read one request from stdin and print its plan and SQL
    Plan {
        /// Path to configuration file
        #[arg(long, default_value = "./apiquery.json")]
        config: PathBuf,
    },

    /// Validate the configuration, schema and seed data, then exit
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./apiquery.json")]
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
