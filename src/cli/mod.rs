//! CLI module
//!
//! Provides command-line interface for:
//! - serve: load configuration, schema and data, then serve HTTP
//! - plan: one-shot translation of a request read from stdin
//! - check-config: validate configuration and exit

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, plan, raw_params, run, run_command, serve};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_request, read_request, write_error, write_response};
