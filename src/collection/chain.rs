//! Chainable declaration builders.
//!
//! `suite()` and `test()` return an immutable [`Chain`]. Every modifier
//! consumes the chain and returns a copy with one more flag set; the terminal
//! `declare`/`stub` call resolves the accumulated flags at once, so
//! `test().skip().concurrent()` and `test().concurrent().skip()` are the same
//! declaration.

use super::collector::{SuiteCollector, TestOptions};
use super::context::{current_suite, TestContext};
use super::each::{expand, Cases};
use super::mode::Modifiers;
use super::types::{Hook, Suite};
use crate::error::{BodyResult, FactoryResult};
use serde_json::Value;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

/// Marker for suite declarations.
#[derive(Debug, Clone, Copy)]
pub struct SuiteKind;

/// Marker for test declarations.
#[derive(Debug, Clone, Copy)]
pub struct TestKind;

#[derive(Debug, Clone)]
pub struct Chain<K> {
    flags: Modifiers,
    target: Option<SuiteCollector>,
    kind: PhantomData<K>,
}

pub type SuiteApi = Chain<SuiteKind>;
pub type TestApi = Chain<TestKind>;

impl<K> Chain<K> {
    fn ambient() -> Self {
        Self {
            flags: Modifiers::default(),
            target: None,
            kind: PhantomData,
        }
    }

    /// A chain that declares into `collector` instead of the current one.
    pub(crate) fn bound(collector: SuiteCollector) -> Self {
        Self {
            target: Some(collector),
            ..Self::ambient()
        }
    }

    pub fn flags(&self) -> Modifiers {
        self.flags
    }

    fn collector(&self) -> SuiteCollector {
        self.target.clone().unwrap_or_else(current_suite)
    }

    fn with(mut self, set: impl FnOnce(&mut Modifiers)) -> Self {
        set(&mut self.flags);
        self
    }

    pub fn concurrent(self) -> Self {
        self.with(|f| f.concurrent = true)
    }

    pub fn skip(self) -> Self {
        self.with(|f| f.skip = true)
    }

    pub fn only(self) -> Self {
        self.with(|f| f.only = true)
    }

    pub fn todo(self) -> Self {
        self.with(|f| f.todo = true)
    }

    pub fn repeats(self) -> Self {
        self.with(|f| f.repeats = true)
    }

    /// Skip-chained when `condition` holds. Flags set so far are kept.
    pub fn skip_if(self, condition: bool) -> Self {
        if condition {
            self.skip()
        } else {
            self
        }
    }

    /// Skip-chained unless `condition` holds.
    pub fn run_if(self, condition: bool) -> Self {
        self.skip_if(!condition)
    }

    /// Parameterizes the declaration over `cases`.
    pub fn each(self, cases: impl Into<Cases>) -> Each<K> {
        Each {
            chain: self,
            cases: cases.into().into_values(),
        }
    }
}

impl Chain<SuiteKind> {
    pub fn shuffle(self) -> Self {
        self.with(|f| f.shuffle = true)
    }

    pub fn declare<F>(self, name: &str, factory: F) -> SuiteCollector
    where
        F: FnMut() + 'static,
    {
        self.declare_with(name, factory, TestOptions::default())
    }

    pub fn declare_with<F>(
        self,
        name: &str,
        mut factory: F,
        options: impl Into<TestOptions>,
    ) -> SuiteCollector
    where
        F: FnMut() + 'static,
    {
        self.try_declare_with(
            name,
            move || -> FactoryResult {
                factory();
                Ok(())
            },
            options,
        )
    }

    pub fn try_declare<F>(self, name: &str, factory: F) -> SuiteCollector
    where
        F: FnMut() -> FactoryResult + 'static,
    {
        self.try_declare_with(name, factory, TestOptions::default())
    }

    pub fn try_declare_with<F>(
        self,
        name: &str,
        factory: F,
        options: impl Into<TestOptions>,
    ) -> SuiteCollector
    where
        F: FnMut() -> FactoryResult + 'static,
    {
        self.create(name, Some(Box::new(factory)), options.into())
    }

    /// Declares a suite without a factory.
    pub fn stub(self, name: &str) -> SuiteCollector {
        self.create(name, None, TestOptions::default())
    }

    fn create(
        self,
        name: &str,
        factory: Option<super::collector::Factory>,
        options: TestOptions,
    ) -> SuiteCollector {
        let parent = self.collector();
        let flags = Modifiers {
            concurrent: self.flags.concurrent || parent.is_concurrent(),
            shuffle: self.flags.shuffle || parent.is_shuffle(),
            ..self.flags
        };
        let child = SuiteCollector::new(name, factory, flags, options);
        parent.register(&child);
        child
    }
}

impl Chain<TestKind> {
    /// Marks the test as expected to fail.
    pub fn fails(self) -> Self {
        self.with(|f| f.fails = true)
    }

    pub fn declare<F>(self, name: &str, body: F)
    where
        F: Fn(&TestContext) -> BodyResult + Send + Sync + 'static,
    {
        self.declare_with(name, body, TestOptions::default())
    }

    pub fn declare_with<F>(self, name: &str, body: F, options: impl Into<TestOptions>)
    where
        F: Fn(&TestContext) -> BodyResult + Send + Sync + 'static,
    {
        self.collector()
            .add_test(self.flags, name, Some(Arc::new(body)), options.into());
    }

    /// Declares a test whose body does nothing.
    pub fn stub(self, name: &str) {
        self.stub_with(name, TestOptions::default());
    }

    pub fn stub_with(self, name: &str, options: impl Into<TestOptions>) {
        self.collector()
            .add_test(self.flags, name, None, options.into());
    }
}

/// A chain paired with its expanded cases.
#[derive(Debug, Clone)]
pub struct Each<K> {
    chain: Chain<K>,
    cases: Vec<Value>,
}

impl<K> Each<K> {
    pub fn cases(&self) -> &[Value] {
        &self.cases
    }
}

impl Each<TestKind> {
    /// Declares one test per case; `body` receives the case arguments.
    pub fn declare<F>(self, name: &str, body: F)
    where
        F: Fn(&[Value]) -> BodyResult + Send + Sync + 'static,
    {
        self.declare_with(name, body, TestOptions::default())
    }

    pub fn declare_with<F>(self, name: &str, body: F, options: impl Into<TestOptions>)
    where
        F: Fn(&[Value]) -> BodyResult + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        let options = options.into();
        for case in expand(name, &self.cases) {
            let body = Arc::clone(&body);
            let args = case.args;
            self.chain
                .clone()
                .declare_with(&case.title, move |_: &TestContext| body(args.as_slice()), options);
        }
    }
}

impl Each<SuiteKind> {
    /// Declares one suite per case; `factory` receives the case arguments.
    pub fn declare<F>(self, name: &str, factory: F) -> Vec<SuiteCollector>
    where
        F: Fn(&[Value]) + 'static,
    {
        self.try_declare(name, move |args: &[Value]| -> FactoryResult {
            factory(args);
            Ok(())
        })
    }

    pub fn declare_with<F>(
        self,
        name: &str,
        factory: F,
        options: impl Into<TestOptions>,
    ) -> Vec<SuiteCollector>
    where
        F: Fn(&[Value]) + 'static,
    {
        self.try_declare_with(
            name,
            move |args: &[Value]| -> FactoryResult {
                factory(args);
                Ok(())
            },
            options,
        )
    }

    pub fn try_declare<F>(self, name: &str, factory: F) -> Vec<SuiteCollector>
    where
        F: Fn(&[Value]) -> FactoryResult + 'static,
    {
        self.try_declare_with(name, factory, TestOptions::default())
    }

    pub fn try_declare_with<F>(
        self,
        name: &str,
        factory: F,
        options: impl Into<TestOptions>,
    ) -> Vec<SuiteCollector>
    where
        F: Fn(&[Value]) -> FactoryResult + 'static,
    {
        let factory = Rc::new(factory);
        let options = options.into();
        expand(name, &self.cases)
            .into_iter()
            .map(|case| {
                let factory = Rc::clone(&factory);
                let args = case.args;
                self.chain
                    .clone()
                    .try_declare_with(&case.title, move || factory(args.as_slice()), options)
            })
            .collect()
    }
}

/// Suite declarations on the current collector.
pub fn suite() -> SuiteApi {
    Chain::ambient()
}

/// Test declarations on the current collector.
pub fn test() -> TestApi {
    Chain::ambient()
}

/// Declares a suite on the current collector.
pub fn describe<F>(name: &str, factory: F) -> SuiteCollector
where
    F: FnMut() + 'static,
{
    suite().declare(name, factory)
}

/// Declares a test on the current collector.
pub fn it<F>(name: &str, body: F)
where
    F: Fn(&TestContext) -> BodyResult + Send + Sync + 'static,
{
    test().declare(name, body)
}

pub fn before_all<F>(hook: F)
where
    F: Fn(&Suite) -> BodyResult + Send + Sync + 'static,
{
    current_suite().on([Hook::before_all(hook)]);
}

pub fn after_all<F>(hook: F)
where
    F: Fn(&Suite) -> BodyResult + Send + Sync + 'static,
{
    current_suite().on([Hook::after_all(hook)]);
}

pub fn before_each<F>(hook: F)
where
    F: Fn(&TestContext, &Suite) -> BodyResult + Send + Sync + 'static,
{
    current_suite().on([Hook::before_each(hook)]);
}

pub fn after_each<F>(hook: F)
where
    F: Fn(&TestContext, &Suite) -> BodyResult + Send + Sync + 'static,
{
    current_suite().on([Hook::after_each(hook)]);
}
