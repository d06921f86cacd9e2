//! Command-line interface handling for the platform binary.
//!
//! Uses the `clap` builder API. Options override values from the
//! configuration file; the subcommand picks what runs once the platform has
//! booted.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// What to run after boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Boot, report registry statistics and exit.
    Check,
    /// Save fixture entities, run a query descriptor and print the page.
    Query { fixtures: PathBuf, query: PathBuf },
}

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Extra plugins to enable after the configured ones
    pub plugins: Vec<String>,
    pub command: AppCommand,
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let command = match matches.subcommand() {
            Some(("query", sub)) => AppCommand::Query {
                fixtures: sub.get_one::<PathBuf>("fixtures").cloned().unwrap_or_default(),
                query: sub.get_one::<PathBuf>("query").cloned().unwrap_or_default(),
            },
            _ => AppCommand::Check,
        };

        Self {
            config_path: matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("platform.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            plugins: matches
                .get_many::<String>("plugin")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
            command,
        }
    }
}

fn command() -> Command {
    Command::new("platform")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Event-driven entity platform")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("platform.toml"),
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
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("plugin")
                .short('p')
                .long("plugin")
                .value_name("NAME")
                .help("Enable a plugin in addition to the configured ones (repeatable)")
                .action(ArgAction::Append),
        )
        .subcommand(Command::new("check").about("Boot the platform and report registry statistics"))
        .subcommand(
            Command::new("query")
                .about("Save fixture entities and run a query descriptor against them")
                .arg(
                    Arg::new("fixtures")
                        .long("fixtures")
                        .value_name("FILE")
                        .help("JSON array of entities to save")
                        .value_parser(clap::value_parser!(PathBuf))
                        .required(true),
                )
                .arg(
                    Arg::new("query")
                        .long("query")
                        .value_name("FILE")
                        .help("JSON query descriptor")
                        .value_parser(clap::value_parser!(PathBuf))
                        .required(true),
                ),
        )
}
