//! Collection of declaration units into finalized, numbered trees.

use crate::collection::context::{clear_collector_context, default_suite};
use crate::collection::report::{CollectReport, CollectionOutcome};
use crate::collection::types::{set_suite_id, File, Suite, Task};
use crate::error::{CollectError, FactoryResult};
use crate::runner::Runner;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Length of the hex prefix used as a file id.
const FILE_ID_LENGTH: usize = 10;

/// One file's top-level declarations.
pub struct DeclarationUnit {
    pub filepath: PathBuf,
    declare: Box<dyn Fn() -> FactoryResult>,
}

impl DeclarationUnit {
    pub fn new<F>(filepath: impl Into<PathBuf>, declare: F) -> Self
    where
        F: Fn() -> FactoryResult + 'static,
    {
        Self {
            filepath: filepath.into(),
            declare: Box::new(declare),
        }
    }

    pub fn declare(&self) -> FactoryResult {
        (self.declare)()
    }
}

impl fmt::Debug for DeclarationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarationUnit")
            .field("filepath", &self.filepath)
            .finish_non_exhaustive()
    }
}

/// Outcome of collecting one declaration unit.
#[derive(Debug)]
pub struct CollectedFile {
    pub file: Arc<File>,
    pub root: Option<Arc<Suite>>,
    pub error: Option<CollectError>,
    pub duration: Duration,
}

impl CollectedFile {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn report(&self) -> CollectReport {
        let nodeid = self.file.name.clone();
        match (&self.root, &self.error) {
            (_, Some(error)) => CollectReport::failed(nodeid, error, self.duration),
            (Some(root), None) => CollectReport::passed(nodeid, root, self.duration),
            (None, None) => CollectReport {
                nodeid,
                outcome: CollectionOutcome::Passed,
                longrepr: None,
                duration_ms: 0,
                result: Vec::new(),
            },
        }
    }
}

/// Collects one unit: resets the ambient context, runs the unit's
/// declarations against the file-level collector and resolves the tree.
pub fn collect_unit(runner: &Arc<Runner>, unit: &DeclarationUnit) -> CollectedFile {
    let file = File::new(unit.filepath.clone());
    let start = Instant::now();
    log::debug!("Collecting {}", file.name);

    clear_collector_context(Arc::clone(runner));
    let result = unit
        .declare()
        .map_err(|source| CollectError::Declaration {
            path: unit.filepath.clone(),
            source,
        })
        .and_then(|()| default_suite().collect(Some(&file)));

    let duration = start.elapsed();
    match result {
        Ok(root) => {
            assign_ids(&file, &root);
            log::debug!(
                "Collected {} in {}ms",
                file.name,
                duration.as_millis()
            );
            CollectedFile {
                file,
                root: Some(root),
                error: None,
                duration,
            }
        }
        Err(error) => {
            log::warn!("Failed to collect {}: {}", file.name, error);
            CollectedFile {
                file,
                root: None,
                error: Some(error),
                duration,
            }
        }
    }
}

/// Collects every unit in order. A failing unit never stops the others.
pub fn collect_units(runner: Arc<Runner>, units: &[DeclarationUnit]) -> Vec<CollectedFile> {
    units
        .iter()
        .map(|unit| collect_unit(&runner, unit))
        .collect()
}

/// Short stable id for a file path.
pub fn file_id(path: &Path) -> String {
    let hash = blake3::hash(path.to_string_lossy().as_bytes());
    hash.to_hex().as_str()[..FILE_ID_LENGTH].to_string()
}

/// Numbers the tree: the file and its root suite get the file id, every
/// other node `{parent}_{index}`.
pub fn assign_ids(file: &File, root: &Suite) {
    let id = file_id(file.path());
    file.set_id(id.clone());
    set_suite_id(root, id.clone());
    assign_child_ids(&id, root);
}

fn assign_child_ids(parent_id: &str, suite: &Suite) {
    for (idx, task) in suite.tasks().iter().enumerate() {
        let id = format!("{parent_id}_{idx}");
        log::trace!("Assigned id {} to '{}'", id, task.name());
        task.set_id(id.clone());
        if let Task::Suite(child) = task {
            assign_child_ids(&id, child);
        }
    }
}

/// Prints failed units, the collected trees and a one-line summary
pub fn display_collection_results(files: &[CollectedFile]) {
    // ANSI color codes
    const RED: &str = "\x1b[31m";
    const BOLD_RED: &str = "\x1b[1;31m";
    const RESET: &str = "\x1b[0m";

    let reports: Vec<CollectReport> = files.iter().map(CollectedFile::report).collect();
    let failed: Vec<&CollectReport> = reports
        .iter()
        .filter(|r| r.outcome == CollectionOutcome::Failed)
        .collect();

    if !failed.is_empty() {
        println!(
            "===================================== ERRORS ======================================"
        );
        for report in &failed {
            println!("{BOLD_RED}_ ERROR collecting {} _{RESET}", report.nodeid);
            if let Some(longrepr) = &report.longrepr {
                for line in longrepr.lines() {
                    println!("{RED}E   {line}{RESET}");
                }
            }
        }
    }

    for report in reports.iter().filter(|r| r.outcome == CollectionOutcome::Passed) {
        print!("{}", report.render_tree());
    }

    let item_count: usize = reports.iter().map(CollectReport::test_count).sum();
    let error_count = failed.len();
    if item_count == 0 && error_count == 0 {
        println!("No tests collected.");
        return;
    }

    let mut summary_parts = Vec::new();
    if item_count > 0 {
        summary_parts.push(format!(
            "collected {} item{}",
            item_count,
            if item_count == 1 { "" } else { "s" }
        ));
    }
    if error_count > 0 {
        summary_parts.push(format!(
            "{} error{}",
            error_count,
            if error_count == 1 { "" } else { "s" }
        ));
    }
    println!("{}", summary_parts.join(" / "));
}
