//! Integration tests for test contexts and timeout-wrapped bodies.

use collecta::error::BodyResult;
use collecta::expect::Expect;
use collecta::{
    after_each, before_all, before_each, clear_collector_context, default_suite, describe, it,
    test, FailureKind, Runner, RunnerConfig, Suite, TestContext, TestOptions,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

mod common;

fn only_test() -> Arc<collecta::Test> {
    let root = default_suite().collect(None).expect("collect");
    let tasks = root.tasks();
    Arc::clone(tasks[0].as_test().expect("test node"))
}

#[test]
fn test_timeout_is_a_failure_not_an_error() {
    clear_collector_context(common::runner());
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    test().declare_with(
        "sleeps",
        move |_| {
            thread::sleep(Duration::from_millis(300));
            flag.store(true, Ordering::SeqCst);
            Ok(())
        },
        50,
    );

    let sleeps = only_test();
    let start = Instant::now();
    let failure = sleeps.run().expect_err("should time out");

    assert_eq!(failure.kind, FailureKind::Timeout);
    assert!(failure.message.starts_with("Test timed out in 50ms."));
    assert!(start.elapsed() < Duration::from_millis(300));
    assert!(!finished.load(Ordering::SeqCst));

    // the body keeps running in the background
    thread::sleep(Duration::from_millis(500));
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn test_configured_timeout_applies_by_default() {
    clear_collector_context(common::runner_with_timeout(30));
    it("slow", |_| {
        thread::sleep(Duration::from_millis(200));
        Ok(())
    });

    let failure = only_test().run().expect_err("should time out");
    assert!(failure.is_timeout());
}

#[test]
fn test_zero_timeout_disables_bound() {
    clear_collector_context(common::runner());
    test().declare_with(
        "unbounded",
        |_| {
            thread::sleep(Duration::from_millis(20));
            Ok(())
        },
        TestOptions::default().with_timeout(Duration::ZERO),
    );

    assert!(only_test().run().is_ok());
}

#[test]
fn test_panicking_body_is_reported() {
    clear_collector_context(common::runner());
    it("panics", |_| panic!("boom"));

    let failure = only_test().run().expect_err("should fail");
    assert_eq!(failure.kind, FailureKind::Panicked);
    assert_eq!(failure.message, "boom");
}

#[test]
fn test_siblings_unaffected_by_timeout() {
    clear_collector_context(common::runner());
    test().declare_with(
        "hangs",
        |_| {
            thread::sleep(Duration::from_millis(200));
            Ok(())
        },
        10,
    );
    it("fine", |_| Ok(()));

    let root = default_suite().collect(None).expect("collect");
    let results: Vec<bool> = root
        .tasks()
        .iter()
        .map(|t| t.as_test().unwrap().run().is_ok())
        .collect();
    assert_eq!(results, vec![false, true]);
}

#[test]
fn test_context_exposes_suite_and_full_name() {
    clear_collector_context(common::runner());
    describe("math", || {
        describe("addition", || {
            it("carries", |ctx: &TestContext| {
                let suite = ctx.suite().ok_or("missing suite")?;
                if suite.name != "addition" {
                    return Err(format!("wrong suite {}", suite.name).into());
                }
                let name = ctx.full_name().ok_or("missing task")?;
                ctx.expect()
                    .assert(name == "math > addition > carries", &name)?;
                Ok(())
            });
        });
    });

    let root = default_suite().collect(None).expect("collect");
    let math = root.tasks()[0].as_suite().unwrap().clone();
    let addition = math.tasks()[0].as_suite().unwrap().clone();
    let carries = Arc::clone(addition.tasks()[0].as_test().unwrap());
    carries.run().expect("context resolves");
}

#[test]
fn test_expected_assertion_count() {
    clear_collector_context(common::runner());
    it("counts", |ctx: &TestContext| {
        let expect = ctx.engine::<Expect>().ok_or("default engine")?;
        expect.assertions(2);
        expect.assert_eq(1 + 1, 2)?;
        Ok(())
    });

    let failure = only_test().run().expect_err("one assertion short");
    assert_eq!(failure.kind, FailureKind::Assertion);
    assert_eq!(
        failure.message,
        "expected number of assertions to be 2, but got 1"
    );
}

#[test]
fn test_has_assertions_without_any() {
    clear_collector_context(common::runner());
    it("silent", |ctx: &TestContext| {
        ctx.engine::<Expect>().ok_or("default engine")?.has_assertions();
        Ok(())
    });

    let failure = only_test().run().expect_err("no assertions made");
    assert_eq!(
        failure.message,
        "expected any number of assertion, but got none"
    );
}

#[test]
fn test_failed_assertion_keeps_kind() {
    clear_collector_context(common::runner());
    it("mismatch", |ctx: &TestContext| {
        ctx.engine::<Expect>()
            .ok_or("default engine")?
            .assert_eq("left", "right")?;
        Ok(())
    });

    let failure = only_test().run().expect_err("mismatch");
    assert_eq!(failure.kind, FailureKind::Assertion);
    assert_eq!(failure.message, r#"expected "left" to equal "right""#);
}

#[test]
fn test_matcher_state_names_the_test() {
    let collected = collecta::collect_unit(
        &common::runner(),
        &collecta::DeclarationUnit::new("suite/state.rs", || {
            describe("outer", || it("inner", |_| Ok(())));
            Ok(())
        }),
    );
    let root = collected.root.expect("root");
    let outer = root.tasks()[0].as_suite().unwrap().clone();
    let inner = Arc::clone(outer.tasks()[0].as_test().unwrap());

    let state = inner
        .context()
        .engine::<Expect>()
        .expect("default engine")
        .state();
    assert_eq!(state.current_test_name.as_deref(), Some("outer > inner"));
    assert_eq!(state.test_path.as_deref(), Some("suite/state.rs"));
}

type Log = Arc<Mutex<Vec<&'static str>>>;

fn record(log: &Log, entry: &'static str) -> impl Fn(&TestContext, &Suite) -> BodyResult + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |_, _| {
        log.lock().unwrap().push(entry);
        Ok(())
    }
}

#[test]
fn test_each_hooks_wrap_the_body_outermost_first() {
    clear_collector_context(common::runner());
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let outer_log = Arc::clone(&log);
    describe("outer", move || {
        before_each(record(&outer_log, "outer before"));
        after_each(record(&outer_log, "outer after"));
        let inner_log = Arc::clone(&outer_log);
        describe("inner", move || {
            before_each(record(&inner_log, "inner before"));
            after_each(record(&inner_log, "inner after"));
            let body_log = Arc::clone(&inner_log);
            it("leaf", move |_| {
                body_log.lock().unwrap().push("body");
                Ok(())
            });
        });
    });

    let root = default_suite().collect(None).expect("collect");
    let outer = root.tasks()[0].as_suite().unwrap().clone();
    let inner = outer.tasks()[0].as_suite().unwrap().clone();
    let leaf = Arc::clone(inner.tasks()[0].as_test().unwrap());
    leaf.run_with_hooks().expect("hooks and body pass");

    assert_eq!(
        *log.lock().unwrap(),
        vec!["outer before", "inner before", "body", "inner after", "outer after"]
    );
}

#[test]
fn test_after_each_runs_when_body_fails() {
    clear_collector_context(common::runner());
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    after_each(record(&log, "cleanup"));
    it("broken", |_| Err("broken".into()));

    let failure = only_test().run_with_hooks().expect_err("body fails");
    assert_eq!(failure.message, "broken");
    assert_eq!(*log.lock().unwrap(), vec!["cleanup"]);
}

#[test]
fn test_hooks_are_bounded_by_hook_timeout() {
    let config = RunnerConfig {
        hook_timeout: 30,
        ..RunnerConfig::default()
    };
    clear_collector_context(Arc::new(Runner::new(config)));
    before_all(|_| {
        thread::sleep(Duration::from_millis(300));
        Ok(())
    });

    let root = default_suite().collect(None).expect("collect");
    assert_eq!(root.hook_timeout(), Duration::from_millis(30));

    let start = Instant::now();
    let failure = root.run_before_all().expect_err("hook should time out");
    assert!(failure.is_timeout());
    assert!(failure.message.starts_with("Hook timed out in 30ms."));
    assert!(start.elapsed() < Duration::from_millis(300));
}

#[test]
fn test_default_hook_timeout_lets_hooks_finish() {
    clear_collector_context(common::runner());
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    before_all(move |suite| {
        assert_eq!(suite.name, "");
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });

    let root = default_suite().collect(None).expect("collect");
    assert_eq!(root.hook_timeout(), Duration::from_secs(10));
    root.run_before_all().expect("hook passes");
    root.run_after_all().expect("no after hooks");
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn test_fails_test_inverts_outcome() {
    clear_collector_context(common::runner());
    test().fails().declare("known bug", |_| Err("still broken".into()));
    test().fails().declare("fixed bug", |_| Ok(()));

    let root = default_suite().collect(None).expect("collect");
    let tasks = root.tasks();
    assert!(tasks[0].as_test().unwrap().run().is_ok());

    let failure = tasks[1].as_test().unwrap().run().expect_err("passing fails test");
    assert_eq!(failure.kind, FailureKind::Error);
    assert_eq!(failure.message, "Expect test to fail");
}
