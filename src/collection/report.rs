//! Collection reporting functionality.

use super::mode::RunMode;
use super::types::{Suite, Task};
use crate::error::CollectError;
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionOutcome {
    Passed,
    Failed,
}

/// Serializable view of one collected node. Test contexts and bodies are
/// never part of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub id: String,
    pub name: String,
    pub kind: &'static str,
    pub mode: RunMode,
    pub concurrent: bool,
    pub shuffle: bool,
    pub fails: bool,
    pub retry: Option<u32>,
    pub repeats: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TaskReport>,
}

impl TaskReport {
    pub fn from_task(task: &Task) -> Self {
        let mut report = Self {
            id: task.id(),
            name: task.name().to_string(),
            kind: task.kind(),
            mode: task.mode(),
            concurrent: false,
            shuffle: false,
            fails: false,
            retry: None,
            repeats: None,
            timeout_ms: None,
            children: Vec::new(),
        };
        match task {
            Task::Suite(suite) => {
                report.concurrent = suite.concurrent;
                report.shuffle = suite.shuffle;
                report.repeats = suite.repeats;
                report.children = suite.tasks().iter().map(Self::from_task).collect();
            }
            Task::Test(test) => {
                report.concurrent = test.concurrent;
                report.shuffle = test.shuffle;
                report.fails = test.fails;
                report.retry = test.retry;
                report.repeats = test.repeats;
                report.timeout_ms = Some(millis(test.timeout));
            }
            Task::Custom(_) => {}
        }
        report
    }

    /// Number of test leaves at or below this node.
    pub fn test_count(&self) -> usize {
        match self.kind {
            "test" => 1,
            _ => self.children.iter().map(Self::test_count).sum(),
        }
    }
}

/// Collection report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectReport {
    pub nodeid: String,
    pub outcome: CollectionOutcome,
    pub longrepr: Option<String>,
    pub duration_ms: u64,
    pub result: Vec<TaskReport>,
}

impl CollectReport {
    pub fn passed(nodeid: String, root: &Suite, duration: Duration) -> Self {
        Self {
            nodeid,
            outcome: CollectionOutcome::Passed,
            longrepr: None,
            duration_ms: millis(duration),
            result: root.tasks().iter().map(TaskReport::from_task).collect(),
        }
    }

    pub fn failed(nodeid: String, error: &CollectError, duration: Duration) -> Self {
        Self {
            nodeid,
            outcome: CollectionOutcome::Failed,
            longrepr: Some(error_chain(error)),
            duration_ms: millis(duration),
            result: Vec::new(),
        }
    }

    pub fn test_count(&self) -> usize {
        self.result.iter().map(TaskReport::test_count).sum()
    }

    /// Indented listing of the collected tree, one node per line.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "<File {}>", self.nodeid);
        for task in &self.result {
            render_task(&mut out, task, 1);
        }
        out
    }
}

fn render_task(out: &mut String, task: &TaskReport, depth: usize) {
    let indent = "  ".repeat(depth);
    let kind = match task.kind {
        "suite" => "Suite",
        "test" => "Test",
        _ => "Custom",
    };
    let mut markers = Vec::new();
    if task.mode != RunMode::Run {
        markers.push(task.mode.to_string());
    }
    if task.concurrent {
        markers.push("concurrent".to_string());
    }
    if task.fails {
        markers.push("fails".to_string());
    }
    if markers.is_empty() {
        let _ = writeln!(out, "{indent}<{kind} {}>", task.name);
    } else {
        let _ = writeln!(out, "{indent}<{kind} {}> [{}]", task.name, markers.join(", "));
    }
    for child in &task.children {
        render_task(out, child, depth + 1);
    }
}

/// The error message followed by each `source` on its own line.
fn error_chain(error: &CollectError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            let _ = write!(message, "\n  caused by: {cause_text}");
        }
        source = cause.source();
    }
    message
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
