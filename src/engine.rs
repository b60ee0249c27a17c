//! Execution engine backends
//!
//! An `ExecutionEngine` decides where a unit of work runs: inline on the
//! calling task (serial), on the runtime's worker threads under a bounded
//! permit (fixed pool), or on the runtime without any bound (growable).
//! Engines are exclusively owned by whichever composite or caller created
//! them and must be disposed exactly once.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::errors::{Result, StrandError};

/// Which backend an engine runs work on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Run inline on the submitting task, one unit at a time
    Serial,
    /// Bounded concurrency on the runtime's worker threads
    #[default]
    Fixed,
    /// Unbounded concurrency, capacity grown and reclaimed by the runtime
    Growable,
}

/// Pluggable backend providing concurrency to the task executor
#[derive(Debug)]
pub struct ExecutionEngine {
    kind: EngineKind,
    limiter: Option<Arc<Semaphore>>,
    closed: AtomicBool,
}

impl ExecutionEngine {
    /// Engine that runs every submission inline, single threaded
    pub fn serial() -> Self {
        Self {
            kind: EngineKind::Serial,
            limiter: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Engine with an explicit concurrency bound
    pub fn fixed(pool_size: usize) -> Result<Self> {
        if pool_size == 0 {
            return Err(StrandError::configuration(
                "fixed engine pool size must be a positive integer",
            ));
        }
        Ok(Self {
            kind: EngineKind::Fixed,
            limiter: Some(Arc::new(Semaphore::new(pool_size))),
            closed: AtomicBool::new(false),
        })
    }

    /// Fixed engine sized to the available hardware parallelism
    pub fn fixed_default() -> Self {
        let pool_size = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            kind: EngineKind::Fixed,
            limiter: Some(Arc::new(Semaphore::new(pool_size))),
            closed: AtomicBool::new(false),
        }
    }

    /// Engine with no concurrency bound
    pub fn growable() -> Self {
        Self {
            kind: EngineKind::Growable,
            limiter: None,
            closed: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Submit one unit of work.
    ///
    /// Serial engines run the work to completion before returning; pooled
    /// engines hand it to the runtime and return immediately. Fails with
    /// `EngineClosed` once the engine has been disposed.
    pub async fn submit<F, T>(&self, work: F) -> Result<PendingWork<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_closed() {
            return Err(StrandError::EngineClosed);
        }
        match self.kind {
            EngineKind::Serial => {
                let value = work.await;
                Ok(PendingWork::Ready(Ok(value)))
            }
            EngineKind::Fixed => {
                // The permit is acquired inside the spawned wrapper so
                // submission never blocks on pool capacity.
                let limiter = Arc::clone(
                    self.limiter
                        .as_ref()
                        .ok_or_else(|| StrandError::internal("fixed engine without limiter"))?,
                );
                let handle = tokio::spawn(async move {
                    let _permit = match limiter.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return Err(StrandError::EngineClosed),
                    };
                    Ok(work.await)
                });
                Ok(PendingWork::Spawned(handle))
            }
            EngineKind::Growable => {
                let handle = tokio::spawn(async move { Ok(work.await) });
                Ok(PendingWork::Spawned(handle))
            }
        }
    }

    /// Release the engine. Must be called exactly once, after which any
    /// submission (and any further dispose) fails with `EngineClosed`.
    pub fn dispose(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(StrandError::EngineClosed);
        }
        if let Some(limiter) = &self.limiter {
            limiter.close();
        }
        info!(kind = ?self.kind, "execution engine disposed");
        Ok(())
    }
}

/// Handle to one submitted unit of work
#[derive(Debug)]
pub enum PendingWork<T> {
    /// Work already ran inline (serial engine)
    Ready(Result<T>),
    /// Work running on the runtime
    Spawned(JoinHandle<Result<T>>),
}

impl<T> PendingWork<T> {
    /// Wait for the work to finish and yield its output
    pub async fn join(self) -> Result<T> {
        match self {
            Self::Ready(result) => result,
            Self::Spawned(handle) => match handle.await {
                Ok(result) => result,
                Err(err) if err.is_cancelled() => {
                    debug!("pending work was aborted before completion");
                    Err(StrandError::internal("worker task aborted"))
                }
                Err(err) => Err(StrandError::activity(format!("worker task panicked: {err}"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn serial_engine_runs_inline() {
        let engine = ExecutionEngine::serial();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let pending = engine
            .submit(async move {
                flag.store(true, Ordering::SeqCst);
                7u32
            })
            .await
            .unwrap();
        // A serial engine has already run the work when submit returns
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(pending.join().await.unwrap(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fixed_engine_bounds_concurrency() {
        let engine = ExecutionEngine::fixed(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut pending = Vec::new();
        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let handle = engine
                .submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            pending.push(handle);
        }
        for handle in pending {
            handle.join().await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn zero_pool_size_is_a_configuration_error() {
        let err = ExecutionEngine::fixed(0).unwrap_err();
        assert!(matches!(err, StrandError::Configuration { .. }));
    }

    #[tokio::test]
    async fn submit_after_dispose_fails() {
        let engine = ExecutionEngine::growable();
        engine.dispose().unwrap();
        let err = engine.submit(async {}).await.unwrap_err();
        assert!(matches!(err, StrandError::EngineClosed));
    }

    #[tokio::test]
    async fn dispose_is_exactly_once() {
        let engine = ExecutionEngine::serial();
        engine.dispose().unwrap();
        assert!(matches!(
            engine.dispose().unwrap_err(),
            StrandError::EngineClosed
        ));
    }
}
