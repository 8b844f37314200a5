//! Command-line interface handling for the BlockWords service.
//!
//! Options given here override the matching configuration file settings.

use clap::{Arg, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the broker host
    pub broker_host: Option<String>,
    /// Optional override for the broker port
    pub broker_port: Option<u16>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Start a session at boot without waiting for a start sequence
    pub force_start: bool,
}

impl CliArgs {
    /// Builds the clap command. Split out so tests can parse fixed argument
    /// lists.
    fn command() -> Command {
        Command::new("BlockWords")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Session coordinator for BlockWords letter cubes")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("blockwords.toml"),
            )
            .arg(
                Arg::new("broker")
                    .short('b')
                    .long("broker")
                    .value_name("HOST")
                    .help("MQTT broker host"),
            )
            .arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_name("PORT")
                    .help("MQTT broker port")
                    .value_parser(clap::value_parser!(u16)),
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
                Arg::new("start")
                    .long("start")
                    .help("Start a session immediately on the keyboard station")
                    .action(clap::ArgAction::SetTrue),
            )
    }

    /// Parses the process arguments.
    ///
    /// Exits with a usage message when the arguments are invalid.
    pub fn parse() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    /// Parses an explicit argument list, program name first.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&Self::command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("blockwords.toml")),
            broker_host: matches.get_one::<String>("broker").cloned(),
            broker_port: matches.get_one::<u16>("port").copied(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            force_start: matches.get_flag("start"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["blockwords"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("blockwords.toml"));
        assert!(args.broker_host.is_none());
        assert!(!args.json_logs);
        assert!(!args.force_start);
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "blockwords",
            "--config",
            "test.toml",
            "--broker",
            "10.0.0.5",
            "--port",
            "1884",
            "-l",
            "debug",
            "--json-logs",
            "--start",
        ])
        .unwrap();
        assert_eq!(args.config_path, PathBuf::from("test.toml"));
        assert_eq!(args.broker_host.as_deref(), Some("10.0.0.5"));
        assert_eq!(args.broker_port, Some(1884));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert!(args.force_start);
    }

    #[test]
    fn test_bad_port_is_rejected() {
        assert!(CliArgs::try_parse_from(["blockwords", "--port", "99999"]).is_err());
    }
}
