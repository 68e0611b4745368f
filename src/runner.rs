use crate::collection::expect::{EngineFactory, ExpectFactory};
use crate::config::RunnerConfig;
use std::fmt;
use std::sync::Arc;

/// The runner handle consulted while declaring tests: configuration defaults
/// plus the factory for each test's assertion engine.
pub struct Runner {
    pub config: RunnerConfig,
    engine: Arc<dyn EngineFactory>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_engine(config, Arc::new(ExpectFactory))
    }

    pub fn with_engine(config: RunnerConfig, engine: Arc<dyn EngineFactory>) -> Self {
        Self { config, engine }
    }

    pub fn engine(&self) -> &dyn EngineFactory {
        self.engine.as_ref()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
