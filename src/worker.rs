//! Bounded execution of test bodies.
//!
//! A wrapped body runs the user function on its own worker thread and waits
//! for it at most `timeout`. When the wait elapses first the worker is
//! detached: its result is never observed and it is not cancelled.

use crate::error::{BodyResult, FailureKind, TestFailure};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A user body with its context already bound.
pub type BodyFn = Arc<dyn Fn() -> BodyResult + Send + Sync>;

/// A body wrapped with timeout semantics.
pub type TimedBody = Arc<dyn Fn() -> Result<(), TestFailure> + Send + Sync>;

/// Wraps `body` so that invoking it races the body against `timeout`.
/// A zero timeout runs the body inline without a bound.
pub fn with_timeout(body: BodyFn, timeout: Duration) -> TimedBody {
    if timeout.is_zero() {
        return Arc::new(move || run_guarded(&body));
    }

    Arc::new(move || {
        let (tx, rx) = mpsc::channel();
        let worker_body = Arc::clone(&body);

        let spawned = thread::Builder::new()
            .name("collecta-test".into())
            .spawn(move || {
                // the receiver may be gone after a timeout
                let _ = tx.send(run_guarded(&worker_body));
            });

        if let Err(e) = spawned {
            return Err(TestFailure::new(
                FailureKind::Error,
                format!("Failed to spawn test worker: {e}"),
            ));
        }

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Test body exceeded {}ms", timeout.as_millis());
                Err(TestFailure::timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(TestFailure::new(
                FailureKind::Panicked,
                "Test worker exited without reporting a result",
            )),
        }
    })
}

fn run_guarded(body: &BodyFn) -> Result<(), TestFailure> {
    match panic::catch_unwind(AssertUnwindSafe(|| body())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(TestFailure::from(e)),
        Err(payload) => Err(TestFailure::new(
            FailureKind::Panicked,
            panic_message(payload.as_ref()),
        )),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Test body panicked".to_string()
    }
}
