use crate::aspects::{AspectEvent, OrbLimits, Window};
use crate::engine::AspectEngine;
use crate::ephemeris::PositionOracle;
use crate::error::EngineError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Runs detection jobs on the blocking thread pool, off the async executor.
///
/// At most `max_concurrent_jobs` windows are computed at once; further
/// submissions wait for a permit.
pub struct DetectionPool<O> {
    engine: Arc<AspectEngine<O>>,
    permits: Arc<Semaphore>,
    max_concurrent_jobs: usize,
}

impl<O> Clone for DetectionPool<O> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            permits: Arc::clone(&self.permits),
            max_concurrent_jobs: self.max_concurrent_jobs,
        }
    }
}

impl<O: PositionOracle + 'static> DetectionPool<O> {
    pub fn new(engine: Arc<AspectEngine<O>>, max_concurrent_jobs: usize) -> Result<Self, EngineError> {
        if max_concurrent_jobs == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            engine,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs)),
            max_concurrent_jobs,
        })
    }

    pub fn engine(&self) -> &Arc<AspectEngine<O>> {
        &self.engine
    }

    pub fn max_concurrent_jobs(&self) -> usize {
        self.max_concurrent_jobs
    }

    /// Queue detection for one window. A panicking job resolves to
    /// [`EngineError::WorkerFailed`].
    pub fn submit(
        &self,
        window: Window,
        limits: OrbLimits,
    ) -> JoinHandle<Result<Vec<AspectEvent>, EngineError>> {
        let engine = Arc::clone(&self.engine);
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| EngineError::WorkerFailed(e.to_string()))?;

            log::debug!("Detection job for window {} started", window.id);
            let id = window.id.clone();
            let result = tokio::task::spawn_blocking(move || engine.detect_events(&window, &limits)).await;

            match result {
                Ok(events) => events,
                Err(e) => {
                    log::error!("Detection job for window {} failed: {}", id, e);
                    Err(EngineError::WorkerFailed(e.to_string()))
                }
            }
        })
    }

    /// Submit and wait.
    pub async fn run(&self, window: Window, limits: OrbLimits) -> Result<Vec<AspectEvent>, EngineError> {
        self.submit(window, limits)
            .await
            .map_err(|e| EngineError::WorkerFailed(e.to_string()))?
    }
}
