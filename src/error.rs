//! Error types shared by collection, configuration and test execution.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by user-supplied factories, hooks and test bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a test body or hook.
pub type BodyResult = Result<(), BoxError>;

/// Result of a fallible suite factory.
pub type FactoryResult = Result<(), BoxError>;

/// Result type for collection operations
pub type CollectionResult<T> = Result<T, CollectError>;

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("failed to collect suite '{suite}': {source}")]
    Factory {
        suite: String,
        #[source]
        source: BoxError,
    },
    #[error("suite '{0}' is already being collected")]
    Reentrant(String),
    #[error("failed to load declarations from {path}: {source}")]
    Declaration {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors that stop the collect-only harness before any unit is collected.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not serialize collect reports: {0}")]
    Output(#[from] serde_json::Error),
}

/// How a test failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Timeout,
    Error,
    Panicked,
    Assertion,
}

/// A reported test failure. Never aborts sibling tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TestFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TestFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!(
                "Test timed out in {}ms.\nIf this is a long-running test, pass a timeout value as the last argument or configure it globally with \"test_timeout\".",
                after.as_millis()
            ),
        )
    }

    pub fn hook_timeout(after: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!(
                "Hook timed out in {}ms.\nIf this is a long-running hook, configure it globally with \"hook_timeout\".",
                after.as_millis()
            ),
        )
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Assertion, message)
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::Timeout
    }
}

impl From<BoxError> for TestFailure {
    fn from(err: BoxError) -> Self {
        // assertion failures raised with `?` inside a body keep their kind
        match err.downcast::<TestFailure>() {
            Ok(failure) => *failure,
            Err(other) => Self::new(FailureKind::Error, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_failure_mentions_duration() {
        let failure = TestFailure::timeout(Duration::from_millis(250));
        assert!(failure.is_timeout());
        assert!(failure.message.starts_with("Test timed out in 250ms."));
    }

    #[test]
    fn test_boxed_assertion_keeps_kind() {
        let boxed: BoxError = Box::new(TestFailure::assertion("expected 1 to equal 2"));
        let failure = TestFailure::from(boxed);
        assert_eq!(failure.kind, FailureKind::Assertion);
        assert_eq!(failure.message, "expected 1 to equal 2");
    }

    #[test]
    fn test_boxed_other_error_becomes_error_kind() {
        let boxed: BoxError = "boom".into();
        let failure = TestFailure::from(boxed);
        assert_eq!(failure.kind, FailureKind::Error);
        assert_eq!(failure.message, "boom");
    }

    #[test]
    fn test_factory_error_display() {
        let err = CollectError::Factory {
            suite: "math".into(),
            source: "bad fixture".into(),
        };
        assert_eq!(err.to_string(), "failed to collect suite 'math': bad fixture");
    }
}
