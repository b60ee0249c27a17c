//! Engine configuration for parallel composites

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, StrandError};
use crate::engine::{EngineKind, ExecutionEngine};

/// What a parallel composite does when some children fail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartialFailureMode {
    /// Fail with the first (lowest-position) child failure
    #[default]
    FailFast,
    /// Return a full-size vector with failure markers at failed positions
    CollectAll,
}

/// Recognized engine configuration options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Which backend to run on
    #[serde(default)]
    pub engine: EngineKind,
    /// Worker count for the fixed engine; defaults to the available
    /// hardware parallelism
    #[serde(default)]
    pub pool_size: Option<usize>,
    #[serde(default)]
    pub on_partial_failure: PartialFailureMode,
}

impl EngineConfig {
    pub fn serial() -> Self {
        Self {
            engine: EngineKind::Serial,
            ..Self::default()
        }
    }

    pub fn fixed(pool_size: usize) -> Self {
        Self {
            engine: EngineKind::Fixed,
            pool_size: Some(pool_size),
            ..Self::default()
        }
    }

    pub fn growable() -> Self {
        Self {
            engine: EngineKind::Growable,
            ..Self::default()
        }
    }

    pub fn with_partial_failure(mut self, mode: PartialFailureMode) -> Self {
        self.on_partial_failure = mode;
        self
    }

    /// Validates configuration values
    pub fn validate(&self) -> Result<()> {
        if let Some(size) = self.pool_size {
            if size == 0 {
                return Err(StrandError::configuration(
                    "pool-size must be a positive integer",
                ));
            }
            if self.engine != EngineKind::Fixed {
                return Err(StrandError::configuration(
                    "pool-size only applies to the fixed engine",
                ));
            }
        }
        Ok(())
    }

    /// Build the engine this configuration describes
    pub fn build_engine(&self) -> Result<ExecutionEngine> {
        self.validate()?;
        Ok(match self.engine {
            EngineKind::Serial => ExecutionEngine::serial(),
            EngineKind::Fixed => match self.pool_size {
                Some(size) => ExecutionEngine::fixed(size)?,
                None => ExecutionEngine::fixed_default(),
            },
            EngineKind::Growable => ExecutionEngine::growable(),
        })
    }
}
