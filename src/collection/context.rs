//! Ambient collection context.
//!
//! Nested declarations find their enclosing collector through a thread-local
//! slot instead of an explicit parameter. [`run_with_suite`] swaps a collector
//! in for the duration of a factory call and restores the previous one on
//! exit, including on panic. The slot also holds the file-level default
//! collector and the runner whose configuration applies to new tests.

use super::collector::SuiteCollector;
use super::expect::{full_name, AssertionEngine};
use super::mode::Modifiers;
use super::types::{File, Suite, Test};
use crate::runner::Runner;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Weak};

#[derive(Default)]
struct CollectorContext {
    current: Option<SuiteCollector>,
    default_suite: Option<SuiteCollector>,
    runner: Option<Arc<Runner>>,
}

thread_local! {
    static COLLECTOR_CONTEXT: RefCell<CollectorContext> = RefCell::new(CollectorContext::default());
}

fn default_collector(runner: &Runner) -> SuiteCollector {
    let flags = Modifiers {
        shuffle: runner.config.sequence.shuffle,
        ..Modifiers::default()
    };
    SuiteCollector::new("", None, flags, Default::default())
}

/// Prepares the context for a new declaration unit: installs `runner`,
/// clears the default collector and makes it current.
pub fn clear_collector_context(runner: Arc<Runner>) {
    let default = COLLECTOR_CONTEXT.with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        let wanted_shuffle = runner.config.sequence.shuffle;
        let reuse = ctx
            .default_suite
            .as_ref()
            .is_some_and(|d| d.is_shuffle() == wanted_shuffle);
        if !reuse {
            ctx.default_suite = Some(default_collector(&runner));
        }
        ctx.runner = Some(runner);
        ctx.default_suite.clone()
    });

    if let Some(default) = default {
        default.clear();
        COLLECTOR_CONTEXT.with(|ctx| ctx.borrow_mut().current = Some(default));
    }
}

/// The runner used for new declarations. Falls back to a default runner.
pub fn current_runner() -> Arc<Runner> {
    COLLECTOR_CONTEXT.with(|ctx| {
        ctx.borrow_mut()
            .runner
            .get_or_insert_with(|| Arc::new(Runner::default()))
            .clone()
    })
}

/// The file-level collector, created on first use.
pub fn default_suite() -> SuiteCollector {
    let runner = current_runner();
    COLLECTOR_CONTEXT.with(|ctx| {
        ctx.borrow_mut()
            .default_suite
            .get_or_insert_with(|| default_collector(&runner))
            .clone()
    })
}

/// The collector new declarations attach to.
pub fn current_suite() -> SuiteCollector {
    COLLECTOR_CONTEXT
        .with(|ctx| ctx.borrow().current.clone())
        .unwrap_or_else(default_suite)
}

/// Runs `f` with `collector` as the current collector.
pub fn run_with_suite<R>(collector: &SuiteCollector, f: impl FnOnce() -> R) -> R {
    let previous =
        COLLECTOR_CONTEXT.with(|ctx| ctx.borrow_mut().current.replace(collector.clone()));
    let _restore = scopeguard::guard(previous, |previous| {
        COLLECTOR_CONTEXT.with(|ctx| ctx.borrow_mut().current = previous);
    });
    f()
}

/// Per-test context handed to the test body.
///
/// Holds only a weak handle to its test, so it never keeps the tree alive and
/// is not a child of the test.
#[derive(Clone)]
pub struct TestContext {
    task: Weak<Test>,
    expect: Arc<dyn AssertionEngine>,
}

impl TestContext {
    pub(crate) fn new(task: Weak<Test>, expect: Arc<dyn AssertionEngine>) -> Self {
        Self { task, expect }
    }

    pub fn task(&self) -> Option<Arc<Test>> {
        self.task.upgrade()
    }

    pub fn expect(&self) -> &dyn AssertionEngine {
        self.expect.as_ref()
    }

    /// Downcasts the assertion engine to its concrete type.
    pub fn engine<E: AssertionEngine + 'static>(&self) -> Option<&E> {
        self.expect.as_any().downcast_ref::<E>()
    }

    pub fn suite(&self) -> Option<Arc<Suite>> {
        self.task()?.suite()
    }

    pub fn file(&self) -> Option<Arc<File>> {
        self.task()?.file()
    }

    pub fn full_name(&self) -> Option<String> {
        self.task().map(|t| full_name(&t))
    }
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("task", &self.task().map(|t| t.name.clone()))
            .finish_non_exhaustive()
    }
}
