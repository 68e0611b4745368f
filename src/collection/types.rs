//! Collection types: the finalized task tree.
//!
//! Nodes are shared through `Arc`. Parent links are `Weak` single-assignment
//! cells filled after the owning suite has resolved its children. Ids and file
//! references are refreshed on every collection and numbering pass, since
//! nodes declared outside a factory survive a re-collect.

use super::context::TestContext;
use super::mode::RunMode;
use crate::config::DEFAULT_HOOK_TIMEOUT_MS;
use crate::error::{BodyResult, FailureKind, TestFailure};
use crate::worker::{with_timeout, BodyFn, TimedBody};
use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, Weak};
use std::time::Duration;

/// The declaration unit a tree was collected from.
#[derive(Debug)]
pub struct File {
    pub name: String,
    pub filepath: PathBuf,
    id: OnceLock<String>,
}

impl File {
    pub fn new(filepath: impl Into<PathBuf>) -> Arc<Self> {
        let filepath = filepath.into();
        Arc::new(Self {
            name: filepath.to_string_lossy().into_owned(),
            filepath,
            id: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.filepath
    }

    pub fn id(&self) -> &str {
        self.id.get().map(String::as_str).unwrap_or("")
    }

    pub fn set_id(&self, id: String) {
        let _ = self.id.set(id);
    }
}

pub type SuiteHookFn = Arc<dyn Fn(&Suite) -> BodyResult + Send + Sync>;
pub type TestHookFn = Arc<dyn Fn(&TestContext, &Suite) -> BodyResult + Send + Sync>;

/// A callback registered on a suite with `on`.
#[derive(Clone)]
pub enum Hook {
    BeforeAll(SuiteHookFn),
    AfterAll(SuiteHookFn),
    BeforeEach(TestHookFn),
    AfterEach(TestHookFn),
}

impl Hook {
    pub fn before_all<F>(f: F) -> Self
    where
        F: Fn(&Suite) -> BodyResult + Send + Sync + 'static,
    {
        Self::BeforeAll(Arc::new(f))
    }

    pub fn after_all<F>(f: F) -> Self
    where
        F: Fn(&Suite) -> BodyResult + Send + Sync + 'static,
    {
        Self::AfterAll(Arc::new(f))
    }

    pub fn before_each<F>(f: F) -> Self
    where
        F: Fn(&TestContext, &Suite) -> BodyResult + Send + Sync + 'static,
    {
        Self::BeforeEach(Arc::new(f))
    }

    pub fn after_each<F>(f: F) -> Self
    where
        F: Fn(&TestContext, &Suite) -> BodyResult + Send + Sync + 'static,
    {
        Self::AfterEach(Arc::new(f))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BeforeAll(_) => "before_all",
            Self::AfterAll(_) => "after_all",
            Self::BeforeEach(_) => "before_each",
            Self::AfterEach(_) => "after_each",
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook::{}", self.name())
    }
}

#[derive(Default, Clone)]
pub struct SuiteHooks {
    pub before_all: Vec<SuiteHookFn>,
    pub after_all: Vec<SuiteHookFn>,
    pub before_each: Vec<TestHookFn>,
    pub after_each: Vec<TestHookFn>,
}

impl SuiteHooks {
    pub fn push(&mut self, hook: Hook) {
        match hook {
            Hook::BeforeAll(f) => self.before_all.push(f),
            Hook::AfterAll(f) => self.after_all.push(f),
            Hook::BeforeEach(f) => self.before_each.push(f),
            Hook::AfterEach(f) => self.after_each.push(f),
        }
    }

    pub fn len(&self) -> usize {
        self.before_all.len() + self.after_all.len() + self.before_each.len() + self.after_each.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SuiteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteHooks")
            .field("before_all", &self.before_all.len())
            .field("after_all", &self.after_all.len())
            .field("before_each", &self.before_each.len())
            .field("after_each", &self.after_each.len())
            .finish()
    }
}

/// Back-reference and file slots shared by every node kind.
#[derive(Debug, Default)]
pub(crate) struct Links {
    id: RwLock<String>,
    suite: OnceLock<Weak<Suite>>,
    file: RwLock<Option<Arc<File>>>,
}

impl Links {
    fn id(&self) -> String {
        self.id.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_id(&self, id: String) {
        *self.id.write().unwrap_or_else(PoisonError::into_inner) = id;
    }

    fn suite(&self) -> Option<Arc<Suite>> {
        self.suite.get().and_then(Weak::upgrade)
    }

    fn file(&self) -> Option<Arc<File>> {
        self.file.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_file(&self, file: &Arc<File>) {
        *self.file.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(file));
    }
}

/// Internal node.
#[derive(Debug)]
pub struct Suite {
    pub name: String,
    pub mode: RunMode,
    pub shuffle: bool,
    pub concurrent: bool,
    pub repeats: Option<u32>,
    tasks: RwLock<Vec<Task>>,
    hooks: Mutex<SuiteHooks>,
    hook_timeout: RwLock<Duration>,
    links: Links,
}

impl Suite {
    pub(crate) fn placeholder(
        name: &str,
        mode: RunMode,
        shuffle: bool,
        concurrent: bool,
        repeats: Option<u32>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            mode,
            shuffle,
            concurrent,
            repeats,
            tasks: RwLock::new(Vec::new()),
            hooks: Mutex::new(SuiteHooks::default()),
            hook_timeout: RwLock::new(Duration::from_millis(DEFAULT_HOOK_TIMEOUT_MS)),
            links: Links::default(),
        })
    }

    /// Children in collection order. Empty until collection completes.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_tasks(&self, tasks: Vec<Task>) {
        *self.tasks.write().unwrap_or_else(PoisonError::into_inner) = tasks;
    }

    pub fn hooks(&self) -> MutexGuard<'_, SuiteHooks> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bound applied to each hook call. `0` disables it.
    pub fn hook_timeout(&self) -> Duration {
        *self.hook_timeout.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_hook_timeout(&self, timeout: Duration) {
        *self.hook_timeout.write().unwrap_or_else(PoisonError::into_inner) = timeout;
    }

    /// Runs the `before_all` hooks in registration order.
    pub fn run_before_all(self: &Arc<Self>) -> Result<(), TestFailure> {
        let hooks = self.hooks().before_all.clone();
        hooks.into_iter().try_for_each(|hook| self.call_hook(hook))
    }

    /// Runs the `after_all` hooks, last registered first.
    pub fn run_after_all(self: &Arc<Self>) -> Result<(), TestFailure> {
        let hooks = self.hooks().after_all.clone();
        hooks.into_iter().rev().try_for_each(|hook| self.call_hook(hook))
    }

    fn call_hook(self: &Arc<Self>, hook: SuiteHookFn) -> Result<(), TestFailure> {
        let suite = Arc::clone(self);
        bounded_hook(Arc::new(move || hook(&suite)), self.hook_timeout())
    }

    pub fn id(&self) -> String {
        self.links.id()
    }

    pub fn suite(&self) -> Option<Arc<Suite>> {
        self.links.suite()
    }

    pub fn file(&self) -> Option<Arc<File>> {
        self.links.file()
    }

    pub(crate) fn links(&self) -> &Links {
        &self.links
    }
}

/// Runs one hook with the hook timeout, reporting a hook-specific message.
fn bounded_hook(hook: BodyFn, timeout: Duration) -> Result<(), TestFailure> {
    with_timeout(hook, timeout)().map_err(|failure| {
        if failure.is_timeout() {
            TestFailure::hook_timeout(timeout)
        } else {
            failure
        }
    })
}

/// Leaf node holding a timeout-wrapped body.
pub struct Test {
    pub name: String,
    pub mode: RunMode,
    pub concurrent: bool,
    pub shuffle: bool,
    pub fails: bool,
    pub retry: Option<u32>,
    pub repeats: Option<u32>,
    pub timeout: Duration,
    context: TestContext,
    body: TimedBody,
    links: Links,
}

pub(crate) struct TestInit {
    pub name: String,
    pub mode: RunMode,
    pub concurrent: bool,
    pub shuffle: bool,
    pub fails: bool,
    pub retry: Option<u32>,
    pub repeats: Option<u32>,
    pub timeout: Duration,
}

impl Test {
    pub(crate) fn new(init: TestInit, context: TestContext, body: TimedBody) -> Self {
        Self {
            name: init.name,
            mode: init.mode,
            concurrent: init.concurrent,
            shuffle: init.shuffle,
            fails: init.fails,
            retry: init.retry,
            repeats: init.repeats,
            timeout: init.timeout,
            context,
            body,
            links: Links::default(),
        }
    }

    pub fn context(&self) -> &TestContext {
        &self.context
    }

    /// Runs the wrapped body, then lets the assertion engine check its
    /// expectations. A timeout leaves the body running in the background.
    ///
    /// For a `fails` test the outcome is inverted: any failure passes and a
    /// pass is reported as an error.
    pub fn run(&self) -> Result<(), TestFailure> {
        self.settle(self.run_body())
    }

    /// Like [`Test::run`], wrapped in the `before_each` hooks of every
    /// enclosing suite (outermost first) and their `after_each` hooks
    /// (innermost first). `after_each` hooks run even when the body fails.
    pub fn run_with_hooks(&self) -> Result<(), TestFailure> {
        let suites = self.ancestors();
        let outcome = suites
            .iter()
            .rev()
            .try_for_each(|suite| {
                let hooks = suite.hooks().before_each.clone();
                hooks
                    .into_iter()
                    .try_for_each(|hook| self.call_hook(suite, hook))
            })
            .and_then(|()| self.run_body());
        let cleanup = suites.iter().try_for_each(|suite| {
            let hooks = suite.hooks().after_each.clone();
            hooks
                .into_iter()
                .rev()
                .try_for_each(|hook| self.call_hook(suite, hook))
        });
        self.settle(outcome.and(cleanup))
    }

    fn run_body(&self) -> Result<(), TestFailure> {
        (self.body)()?;
        self.context.expect().verify()
    }

    fn settle(&self, outcome: Result<(), TestFailure>) -> Result<(), TestFailure> {
        match (self.fails, outcome) {
            (false, outcome) => outcome,
            (true, Ok(())) => Err(TestFailure::new(
                FailureKind::Error,
                "Expect test to fail",
            )),
            (true, Err(failure)) => {
                log::debug!("Test '{}' failed as expected: {}", self.name, failure);
                Ok(())
            }
        }
    }

    /// Enclosing suites, innermost first.
    fn ancestors(&self) -> Vec<Arc<Suite>> {
        let mut suites = Vec::new();
        let mut next = self.suite();
        while let Some(suite) = next {
            next = suite.suite();
            suites.push(suite);
        }
        suites
    }

    fn call_hook(&self, suite: &Arc<Suite>, hook: TestHookFn) -> Result<(), TestFailure> {
        let context = self.context.clone();
        let owner = Arc::clone(suite);
        bounded_hook(Arc::new(move || hook(&context, &owner)), suite.hook_timeout())
    }

    pub fn id(&self) -> String {
        self.links.id()
    }

    pub fn suite(&self) -> Option<Arc<Suite>> {
        self.links.suite()
    }

    pub fn file(&self) -> Option<Arc<File>> {
        self.links.file()
    }

    pub(crate) fn links(&self) -> &Links {
        &self.links
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("concurrent", &self.concurrent)
            .field("shuffle", &self.shuffle)
            .field("fails", &self.fails)
            .field("retry", &self.retry)
            .field("repeats", &self.repeats)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Non-executable leaf for extensions with their own execution semantics.
pub struct CustomTask {
    pub name: String,
    pub mode: RunMode,
    payload: OnceLock<Arc<dyn Any + Send + Sync>>,
    links: Links,
}

impl CustomTask {
    pub(crate) fn new(name: &str, mode: RunMode) -> Self {
        Self {
            name: name.to_string(),
            mode,
            payload: OnceLock::new(),
            links: Links::default(),
        }
    }

    /// Attaches extension data. Returns `false` if a payload was already set.
    pub fn attach<T: Any + Send + Sync>(&self, payload: T) -> bool {
        self.payload.set(Arc::new(payload)).is_ok()
    }

    pub fn payload<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.payload.get().and_then(|p| p.downcast_ref::<T>())
    }

    pub fn id(&self) -> String {
        self.links.id()
    }

    pub fn suite(&self) -> Option<Arc<Suite>> {
        self.links.suite()
    }

    pub fn file(&self) -> Option<Arc<File>> {
        self.links.file()
    }

    pub(crate) fn links(&self) -> &Links {
        &self.links
    }
}

impl fmt::Debug for CustomTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTask")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Any node of a finalized tree.
#[derive(Debug, Clone)]
pub enum Task {
    Suite(Arc<Suite>),
    Test(Arc<Test>),
    Custom(Arc<CustomTask>),
}

impl Task {
    pub fn name(&self) -> &str {
        match self {
            Self::Suite(s) => &s.name,
            Self::Test(t) => &t.name,
            Self::Custom(c) => &c.name,
        }
    }

    pub fn mode(&self) -> RunMode {
        match self {
            Self::Suite(s) => s.mode,
            Self::Test(t) => t.mode,
            Self::Custom(c) => c.mode,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Suite(_) => "suite",
            Self::Test(_) => "test",
            Self::Custom(_) => "custom",
        }
    }

    pub fn id(&self) -> String {
        self.links().id()
    }

    pub fn suite(&self) -> Option<Arc<Suite>> {
        self.links().suite()
    }

    pub fn file(&self) -> Option<Arc<File>> {
        self.links().file()
    }

    pub fn as_suite(&self) -> Option<&Arc<Suite>> {
        match self {
            Self::Suite(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_test(&self) -> Option<&Arc<Test>> {
        match self {
            Self::Test(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_custom(&self) -> Option<&Arc<CustomTask>> {
        match self {
            Self::Custom(c) => Some(c),
            _ => None,
        }
    }

    fn links(&self) -> &Links {
        match self {
            Self::Suite(s) => s.links(),
            Self::Test(t) => t.links(),
            Self::Custom(c) => c.links(),
        }
    }

    /// Sets the parent link. Only the first assignment sticks.
    pub(crate) fn set_suite(&self, parent: &Arc<Suite>) {
        let _ = self.links().suite.set(Arc::downgrade(parent));
    }

    /// Replaces the file reference left by a previous collection.
    pub(crate) fn set_file(&self, file: &Arc<File>) {
        self.links().set_file(file);
    }

    pub(crate) fn set_id(&self, id: String) {
        self.links().set_id(id);
    }
}

pub(crate) fn set_suite_file(suite: &Suite, file: &Arc<File>) {
    suite.links().set_file(file);
}

pub(crate) fn set_suite_id(suite: &Suite, id: String) {
    suite.links().set_id(id);
}
