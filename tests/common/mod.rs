//! Common test utilities and helpers.

use collecta::{Runner, RunnerConfig, Suite, Task};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Runner with default configuration.
#[allow(dead_code)]
pub fn runner() -> Arc<Runner> {
    Arc::new(Runner::default())
}

/// Runner with a custom default test timeout, in milliseconds.
#[allow(dead_code)]
pub fn runner_with_timeout(test_timeout: u64) -> Arc<Runner> {
    let config = RunnerConfig {
        test_timeout,
        ..RunnerConfig::default()
    };
    Arc::new(Runner::new(config))
}

/// Writes a runner config file into a fresh temporary directory.
#[allow(dead_code)]
pub fn write_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("collecta.toml");
    fs::write(&path, content).expect("Failed to write config file");
    (temp_dir, path)
}

/// Names of a suite's direct children, in order.
#[allow(dead_code)]
pub fn names(suite: &Suite) -> Vec<String> {
    suite.tasks().iter().map(|t| t.name().to_string()).collect()
}

/// Every node below `suite`, depth first.
#[allow(dead_code)]
pub fn descendants(suite: &Suite) -> Vec<Task> {
    let mut out = Vec::new();
    for task in suite.tasks() {
        if let Task::Suite(child) = &task {
            let nested = descendants(child);
            out.push(task);
            out.extend(nested);
        } else {
            out.push(task);
        }
    }
    out
}

/// Path to the demo binary built alongside the integration tests.
#[allow(dead_code)]
pub fn collecta_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_collecta"))
}
