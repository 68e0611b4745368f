use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented tree plus a summary line
    #[default]
    Text,
    /// One JSON collect report per declaration unit
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Runner configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Default test timeout in milliseconds, overriding the config file
    #[arg(long)]
    pub test_timeout: Option<u64>,

    /// Shuffle the file-level suite, overriding the config file
    #[arg(long)]
    pub shuffle: bool,

    /// Output format of the collected trees
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parsing_defaults() {
        let args = Args::parse_from(["collecta"]);

        assert!(args.config.is_none());
        assert!(args.test_timeout.is_none());
        assert!(!args.shuffle);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.log_level(), log::LevelFilter::Warn);
    }

    #[test]
    fn test_cli_parsing_with_config() {
        let args = Args::parse_from(["collecta", "--config", "collecta.toml"]);

        assert_eq!(args.config, Some(PathBuf::from("collecta.toml")));
    }

    #[test]
    fn test_cli_parsing_overrides() {
        let args = Args::parse_from(["collecta", "--test-timeout", "250", "--shuffle"]);

        assert_eq!(args.test_timeout, Some(250));
        assert!(args.shuffle);
    }

    #[test]
    fn test_cli_parsing_format() {
        let args = Args::parse_from(["collecta", "--format", "json"]);

        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_verbosity() {
        let args = Args::parse_from(["collecta", "-vv"]);

        assert_eq!(args.verbose, 2);
        assert_eq!(args.log_level(), log::LevelFilter::Trace);
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        let result = Args::try_parse_from(["collecta", "--format", "xml"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help_generation() {
        let mut cmd = Args::command();
        let help = cmd.render_help();

        assert!(help.to_string().contains("test-timeout"));
        assert!(help.to_string().contains("shuffle"));
        assert!(help.to_string().contains("format"));
    }
}
