//! Test declaration and collection engine.
//!
//! `describe`/`it`-style declarations are queued on suite collectors and
//! resolved into a finalized tree of suites, tests and custom tasks, one tree
//! per declaration unit. Tests carry a context and a timeout-wrapped body;
//! running them is left to the caller.

use clap::Parser;

pub mod cli;
pub mod collection;
pub mod collection_integration;
pub mod config;
pub mod error;
pub mod runner;
pub mod worker;

pub use collection::*;
pub use collection_integration::{
    collect_unit, collect_units, display_collection_results, CollectedFile, DeclarationUnit,
};
pub use config::RunnerConfig;
pub use error::{
    BodyResult, BoxError, CollectError, ConfigError, FactoryResult, FailureKind, HarnessError,
    TestFailure,
};
pub use runner::Runner;

use cli::{Args, OutputFormat};
use collection::report::CollectReport;
use std::sync::Arc;

/// Builds the runner from the config file named in `args`, then applies the
/// command-line overrides.
pub fn build_runner(args: &Args) -> Result<Runner, ConfigError> {
    let mut config = match &args.config {
        Some(path) => RunnerConfig::from_file(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(timeout) = args.test_timeout {
        config.test_timeout = timeout;
    }
    if args.shuffle {
        config.sequence.shuffle = true;
    }
    Ok(Runner::new(config))
}

/// Collects `units` and prints the result. Returns the process exit code:
/// `1` when any unit failed to collect.
pub fn run_harness(args: &Args, units: &[DeclarationUnit]) -> Result<i32, HarnessError> {
    let runner = Arc::new(build_runner(args)?);
    log::debug!("Collecting {} declaration units", units.len());

    let collected = collect_units(runner, units);
    match args.format {
        OutputFormat::Text => display_collection_results(&collected),
        OutputFormat::Json => {
            let reports: Vec<CollectReport> =
                collected.iter().map(CollectedFile::report).collect();
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    Ok(i32::from(collected.iter().any(CollectedFile::is_failed)))
}

/// Entry point for collect-only binaries: parses the command line, sets up
/// logging and collects `units`.
pub fn harness_main(units: &[DeclarationUnit]) -> i32 {
    let args = Args::parse();
    let _ = env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .try_init();

    match run_harness(&args, units) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_runner_defaults() {
        let args = Args::parse_from(["collecta"]);
        let runner = build_runner(&args).unwrap();

        assert_eq!(runner.config, RunnerConfig::default());
    }

    #[test]
    fn test_build_runner_overrides_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "test_timeout = 100\n[sequence]\nshuffle = false").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let args = Args::parse_from(["collecta", "--config", &path, "--shuffle"]);
        let runner = build_runner(&args).unwrap();
        assert_eq!(runner.config.test_timeout, 100);
        assert!(runner.config.sequence.shuffle);

        let args = Args::parse_from(["collecta", "--config", &path, "--test-timeout", "7"]);
        let runner = build_runner(&args).unwrap();
        assert_eq!(runner.config.test_timeout, 7);
        assert!(!runner.config.sequence.shuffle);
    }

    #[test]
    fn test_build_runner_missing_config() {
        let args = Args::parse_from(["collecta", "--config", "/nonexistent/collecta.toml"]);

        assert!(matches!(build_runner(&args), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_run_harness_exit_code() {
        let args = Args::parse_from(["collecta", "--format", "json"]);
        let ok = [DeclarationUnit::new("ok.rs", || {
            it("passes", |_| Ok(()));
            Ok(())
        })];
        assert_eq!(run_harness(&args, &ok).unwrap(), 0);

        let broken = [DeclarationUnit::new("broken.rs", || Err("cannot load".into()))];
        assert_eq!(run_harness(&args, &broken).unwrap(), 1);
    }
}
