//! Command-line interface handling for the relay.
//!
//! This module provides command-line argument parsing using the `clap`
//! builder API.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// This structure holds the command-line options that override
/// configuration file settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Whether to log every chunk received on every server
    pub debug: bool,
}

impl CliArgs {
    /// Parses the process arguments.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            debug: matches.get_flag("debug"),
        }
    }
}

fn command() -> Command {
    Command::new("Game Status Relay")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Relays backend game server messages and status updates to chat channels")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (.toml, or .json for legacy configs)")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Log every chunk received from every backend server")
                .action(clap::ArgAction::SetTrue),
        )
}
