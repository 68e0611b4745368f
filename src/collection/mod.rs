//! Test declaration and collection.
//!
//! Declarations made through the chainable API queue children on the current
//! [`SuiteCollector`]; `collect` resolves the queue into a finalized tree of
//! [`Suite`], [`Test`] and [`CustomTask`] nodes.

pub mod chain;
pub mod collector;
pub mod context;
pub mod each;
pub mod expect;
pub mod format;
pub mod mode;
pub mod report;
pub mod types;

pub use chain::{
    after_all, after_each, before_all, before_each, describe, it, suite, test, Chain, Each,
    SuiteApi, TestApi,
};
pub use collector::{SuiteCollector, TestBodyFn, TestOptions};
pub use context::{
    clear_collector_context, current_runner, current_suite, default_suite, run_with_suite,
    TestContext,
};
pub use each::Cases;
pub use mode::{Modifiers, RunMode};
pub use types::{CustomTask, File, Hook, Suite, SuiteHooks, Task, Test};
