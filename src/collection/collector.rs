//! Suite collectors: transient builders that queue declarations and resolve
//! them into a finalized [`Suite`].

use super::chain::{SuiteApi, TestApi};
use super::context::{current_runner, run_with_suite, TestContext};
use super::mode::{resolve_repeats, Modifiers, RunMode};
use super::types::{
    set_suite_file, CustomTask, File, Hook, Suite, SuiteHooks, Task, Test, TestInit,
};
use crate::error::{BodyResult, CollectError, CollectionResult, FactoryResult};
use crate::worker::with_timeout;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Weak};
use std::time::Duration;

pub(crate) type Factory = Box<dyn FnMut() -> FactoryResult>;

/// A test body before timeout wrapping.
pub type TestBodyFn = Arc<dyn Fn(&TestContext) -> BodyResult + Send + Sync>;

/// Per-declaration options. Unset fields fall back to the enclosing suite's
/// options, and the timeout finally to the runner's `test_timeout`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestOptions {
    pub timeout: Option<Duration>,
    pub retry: Option<u32>,
    pub repeats: Option<u32>,
}

impl TestOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_repeats(mut self, repeats: u32) -> Self {
        self.repeats = Some(repeats);
        self
    }

    fn or(self, fallback: TestOptions) -> TestOptions {
        TestOptions {
            timeout: self.timeout.or(fallback.timeout),
            retry: self.retry.or(fallback.retry),
            repeats: self.repeats.or(fallback.repeats),
        }
    }
}

/// A bare number is a timeout in milliseconds.
impl From<u64> for TestOptions {
    fn from(ms: u64) -> Self {
        Self::default().with_timeout(Duration::from_millis(ms))
    }
}

/// Unsuffixed literals land here. A negative number means no bound.
impl From<i32> for TestOptions {
    fn from(ms: i32) -> Self {
        Self::from(u64::try_from(ms).unwrap_or(0))
    }
}

impl From<Duration> for TestOptions {
    fn from(timeout: Duration) -> Self {
        Self::default().with_timeout(timeout)
    }
}

#[derive(Clone)]
struct Queued<T> {
    item: T,
    /// Queued while this collector's factory was running.
    from_factory: bool,
}

#[derive(Clone)]
enum Leaf {
    Test(Arc<Test>),
    Custom(Arc<CustomTask>),
}

impl Leaf {
    fn into_task(self) -> Task {
        match self {
            Self::Test(t) => Task::Test(t),
            Self::Custom(c) => Task::Custom(c),
        }
    }
}

struct Inner {
    name: String,
    flags: Modifiers,
    mode: RunMode,
    options: TestOptions,
    factory: RefCell<Option<Factory>>,
    tasks: RefCell<Vec<Queued<Leaf>>>,
    factory_queue: RefCell<Vec<Queued<SuiteCollector>>>,
    hooks: RefCell<Vec<Queued<Hook>>>,
    suite: RefCell<Arc<Suite>>,
    in_factory: Cell<bool>,
}

/// Builder for one suite. Cloning yields another handle to the same
/// collector.
#[derive(Clone)]
pub struct SuiteCollector {
    inner: Rc<Inner>,
}

impl SuiteCollector {
    /// Creates a collector without registering it anywhere. `flags` carry the
    /// effective (already inherited) `concurrent` and `shuffle` values.
    pub(crate) fn new(
        name: &str,
        factory: Option<Factory>,
        flags: Modifiers,
        options: TestOptions,
    ) -> Self {
        let mode = flags.mode();
        let suite = init_suite(name, mode, &flags, &options);
        Self {
            inner: Rc::new(Inner {
                name: name.to_string(),
                flags,
                mode,
                options,
                factory: RefCell::new(factory),
                tasks: RefCell::new(Vec::new()),
                factory_queue: RefCell::new(Vec::new()),
                hooks: RefCell::new(Vec::new()),
                suite: RefCell::new(suite),
                in_factory: Cell::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn mode(&self) -> RunMode {
        self.inner.mode
    }

    pub fn is_concurrent(&self) -> bool {
        self.inner.flags.concurrent
    }

    pub fn is_shuffle(&self) -> bool {
        self.inner.flags.shuffle
    }

    pub fn options(&self) -> TestOptions {
        self.inner.options
    }

    /// The suite this collector fills. Its tasks stay empty until `collect`.
    pub fn suite(&self) -> Arc<Suite> {
        Arc::clone(&self.inner.suite.borrow())
    }

    /// Number of queued, unresolved children.
    pub fn pending(&self) -> usize {
        self.inner.tasks.borrow().len() + self.inner.factory_queue.borrow().len()
    }

    /// Test declarations bound to this collector.
    pub fn test(&self) -> TestApi {
        TestApi::bound(self.clone())
    }

    /// Nested suite declarations bound to this collector.
    pub fn describe(&self) -> SuiteApi {
        SuiteApi::bound(self.clone())
    }

    pub(crate) fn add_test(
        &self,
        flags: Modifiers,
        name: &str,
        body: Option<TestBodyFn>,
        options: TestOptions,
    ) {
        let mode = flags.mode();
        let options = options.or(self.inner.options);
        let runner = current_runner();
        let timeout = options
            .timeout
            .unwrap_or_else(|| runner.config.test_timeout());

        let init = TestInit {
            name: name.to_string(),
            mode,
            concurrent: flags.concurrent || self.inner.flags.concurrent,
            shuffle: self.inner.flags.shuffle,
            fails: flags.fails,
            retry: options.retry,
            repeats: resolve_repeats(mode, options.repeats),
            timeout,
        };
        let body: TestBodyFn =
            body.unwrap_or_else(|| Arc::new(|_: &TestContext| -> BodyResult { Ok(()) }));

        let test = Arc::new_cyclic(|task: &Weak<Test>| {
            let context = TestContext::new(task.clone(), runner.engine().create(task));
            let bound = context.clone();
            let timed = with_timeout(Arc::new(move || body(&bound)), timeout);
            Test::new(init, context, timed)
        });

        log::trace!("Queued test '{}' in '{}' ({})", name, self.inner.name, mode);
        self.push_leaf(Leaf::Test(test));
    }

    /// Queues a placeholder leaf and returns it so an extension can attach
    /// its payload.
    pub fn custom(&self, name: &str) -> Arc<CustomTask> {
        self.custom_with(Modifiers::default(), name)
    }

    pub fn custom_with(&self, flags: Modifiers, name: &str) -> Arc<CustomTask> {
        let task = Arc::new(CustomTask::new(name, flags.mode()));
        log::trace!("Queued custom task '{}' in '{}'", name, self.inner.name);
        self.push_leaf(Leaf::Custom(Arc::clone(&task)));
        task
    }

    fn push_leaf(&self, leaf: Leaf) {
        let from_factory = self.inner.in_factory.get();
        self.inner.tasks.borrow_mut().push(Queued {
            item: leaf,
            from_factory,
        });
    }

    /// Queues a nested collector.
    pub(crate) fn register(&self, child: &SuiteCollector) {
        let from_factory = self.inner.in_factory.get();
        log::trace!("Queued suite '{}' in '{}'", child.name(), self.inner.name);
        self.inner.factory_queue.borrow_mut().push(Queued {
            item: child.clone(),
            from_factory,
        });
    }

    /// Drops every queued child and starts over with a fresh suite: new
    /// hooks, empty tasks, mode recomputed from the captured flags.
    pub fn clear(&self) {
        self.inner.tasks.borrow_mut().clear();
        self.inner.factory_queue.borrow_mut().clear();
        self.inner.hooks.borrow_mut().clear();
        *self.inner.suite.borrow_mut() =
            init_suite(&self.inner.name, self.inner.mode, &self.inner.flags, &self.inner.options);
    }

    /// Appends hooks to the suite, keeping registration order.
    pub fn on(&self, hooks: impl IntoIterator<Item = Hook>) {
        let from_factory = self.inner.in_factory.get();
        let suite = self.suite();
        let mut registered = suite.hooks();
        let mut queued = self.inner.hooks.borrow_mut();
        for hook in hooks {
            log::trace!("Registered {} hook on '{}'", hook.name(), self.inner.name);
            registered.push(hook.clone());
            queued.push(Queued {
                item: hook,
                from_factory,
            });
        }
    }

    /// Forgets everything the factory declared on a previous run, hooks
    /// included.
    fn discard_factory_entries(&self) {
        let inner = &self.inner;
        inner.tasks.borrow_mut().retain(|q| !q.from_factory);
        inner.factory_queue.borrow_mut().retain(|q| !q.from_factory);

        let mut queued = inner.hooks.borrow_mut();
        if queued.iter().any(|q| q.from_factory) {
            queued.retain(|q| !q.from_factory);
            let mut rebuilt = SuiteHooks::default();
            for q in queued.iter() {
                rebuilt.push(q.item.clone());
            }
            *self.suite().hooks() = rebuilt;
        }
    }

    /// Runs the factory and resolves every queued child into the suite.
    ///
    /// Nested collectors come first, in registration order, each fully
    /// collected before the next; direct test and custom declarations follow
    /// in declaration order. Children queued by a previous factory run are
    /// replaced, so collecting twice never duplicates them.
    pub fn collect(&self, file: Option<&Arc<File>>) -> CollectionResult<Arc<Suite>> {
        let inner = &self.inner;
        if inner.in_factory.get() {
            return Err(CollectError::Reentrant(inner.name.clone()));
        }
        log::debug!("Collecting suite '{}'", inner.name);

        self.discard_factory_entries();
        self.run_factory()?;

        let nested: Vec<SuiteCollector> = inner
            .factory_queue
            .borrow()
            .iter()
            .map(|q| q.item.clone())
            .collect();
        let leaves: Vec<Leaf> = inner.tasks.borrow().iter().map(|q| q.item.clone()).collect();

        let mut children = Vec::with_capacity(nested.len() + leaves.len());
        for collector in nested {
            children.push(Task::Suite(collector.collect(file)?));
        }
        children.extend(leaves.into_iter().map(Leaf::into_task));

        let suite = self.suite();
        suite.set_hook_timeout(current_runner().config.hook_timeout());
        if let Some(file) = file {
            set_suite_file(&suite, file);
        }
        suite.set_tasks(children.clone());
        for child in &children {
            child.set_suite(&suite);
            if let Some(file) = file {
                child.set_file(file);
            }
        }

        log::debug!(
            "Collected suite '{}' with {} tasks",
            inner.name,
            children.len()
        );
        Ok(suite)
    }

    fn run_factory(&self) -> CollectionResult<()> {
        let inner = &self.inner;
        let mut slot = inner
            .factory
            .try_borrow_mut()
            .map_err(|_| CollectError::Reentrant(inner.name.clone()))?;
        let Some(factory) = slot.as_mut() else {
            return Ok(());
        };

        inner.in_factory.set(true);
        let result = {
            let _reset = scopeguard::guard((), |_| inner.in_factory.set(false));
            run_with_suite(self, factory)
        };

        result.map_err(|source| {
            self.discard_factory_entries();
            CollectError::Factory {
                suite: inner.name.clone(),
                source,
            }
        })
    }
}

fn init_suite(name: &str, mode: RunMode, flags: &Modifiers, options: &TestOptions) -> Arc<Suite> {
    Suite::placeholder(
        name,
        mode,
        flags.shuffle,
        flags.concurrent,
        resolve_repeats(mode, options.repeats),
    )
}

impl fmt::Debug for SuiteCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteCollector")
            .field("name", &self.inner.name)
            .field("mode", &self.inner.mode)
            .field("tasks", &self.inner.tasks.borrow().len())
            .field("factory_queue", &self.inner.factory_queue.borrow().len())
            .finish()
    }
}
