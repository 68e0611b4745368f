//! Assertion-engine capability attached to every test context.
//!
//! The collector only needs to create one engine per test and hand it to the
//! body. [`Expect`] is the default engine: it counts assertions and checks
//! `assertions(n)` / `has_assertions()` expectations once the body is done.

use super::types::Test;
use crate::error::TestFailure;
use std::any::Any;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError, Weak};

pub trait AssertionEngine: Send + Sync {
    /// Records one assertion; fails with `message` when `passed` is false.
    fn assert(&self, passed: bool, message: &str) -> Result<(), TestFailure>;

    /// Checks expectations about the assertions made during the body.
    fn verify(&self) -> Result<(), TestFailure>;

    fn as_any(&self) -> &dyn Any;
}

/// Creates the assertion engine of a test. Receives a weak handle because the
/// test is still under construction when its context is built.
pub trait EngineFactory: Send + Sync {
    fn create(&self, test: &Weak<Test>) -> Arc<dyn AssertionEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn(&Weak<Test>) -> Arc<dyn AssertionEngine> + Send + Sync,
{
    fn create(&self, test: &Weak<Test>) -> Arc<dyn AssertionEngine> {
        self(test)
    }
}

/// Factory for the default [`Expect`] engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpectFactory;

impl EngineFactory for ExpectFactory {
    fn create(&self, test: &Weak<Test>) -> Arc<dyn AssertionEngine> {
        Arc::new(Expect::new(test.clone()))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MatcherState {
    pub assertion_calls: usize,
    pub is_expecting_assertions: bool,
    pub expected_assertions_number: Option<usize>,
    pub current_test_name: Option<String>,
    pub test_path: Option<String>,
}

pub struct Expect {
    test: Weak<Test>,
    state: Mutex<ExpectState>,
}

#[derive(Debug, Default)]
struct ExpectState {
    assertion_calls: usize,
    is_expecting_assertions: bool,
    expected_assertions_number: Option<usize>,
}

impl Expect {
    pub fn new(test: Weak<Test>) -> Self {
        Self {
            test,
            state: Mutex::new(ExpectState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ExpectState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Expects exactly `expected` assertions by the end of the test.
    pub fn assertions(&self, expected: usize) {
        self.lock().expected_assertions_number = Some(expected);
    }

    /// Expects at least one assertion by the end of the test.
    pub fn has_assertions(&self) {
        self.lock().is_expecting_assertions = true;
    }

    pub fn assert_eq<T: PartialEq + Debug>(&self, actual: T, expected: T) -> Result<(), TestFailure> {
        let passed = actual == expected;
        self.assert(
            passed,
            &format!("expected {actual:?} to equal {expected:?}"),
        )
    }

    pub fn state(&self) -> MatcherState {
        let state = self.lock();
        let test = self.test.upgrade();
        MatcherState {
            assertion_calls: state.assertion_calls,
            is_expecting_assertions: state.is_expecting_assertions,
            expected_assertions_number: state.expected_assertions_number,
            current_test_name: test.as_deref().map(full_name),
            test_path: test
                .as_deref()
                .and_then(Test::file)
                .map(|f| f.filepath.to_string_lossy().into_owned()),
        }
    }
}

impl AssertionEngine for Expect {
    fn assert(&self, passed: bool, message: &str) -> Result<(), TestFailure> {
        self.lock().assertion_calls += 1;
        if passed {
            Ok(())
        } else {
            Err(TestFailure::assertion(message))
        }
    }

    fn verify(&self) -> Result<(), TestFailure> {
        let state = self.lock();
        if let Some(expected) = state.expected_assertions_number {
            if expected != state.assertion_calls {
                return Err(TestFailure::assertion(format!(
                    "expected number of assertions to be {expected}, but got {}",
                    state.assertion_calls
                )));
            }
        }
        if state.is_expecting_assertions && state.assertion_calls == 0 {
            return Err(TestFailure::assertion(
                "expected any number of assertion, but got none",
            ));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `outer > inner > test`, skipping the unnamed file-level suite.
pub fn full_name(test: &Test) -> String {
    let mut names = vec![test.name.clone()];
    let mut parent = test.suite();
    while let Some(suite) = parent {
        if !suite.name.is_empty() {
            names.push(suite.name.clone());
        }
        parent = suite.suite();
    }
    names.reverse();
    names.join(" > ")
}
