use crate::config::LimitsConfig;
use crate::utils::error::CoreError;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Semaphore-backed concurrency gates for the provider call sites that
/// can block: embedding calls, db/vector searches, and transformation
/// pipeline invocations. A timed-out acquire fails fast rather than
/// queuing indefinitely.
#[derive(Clone)]
pub struct Limiters {
    pub embedding: Arc<Semaphore>,
    pub db_search: Arc<Semaphore>,
    pub pipeline: Arc<Semaphore>,
    pub acquire_timeout: Duration,
}

impl Limiters {
    pub fn new(cfg: &LimitsConfig) -> Self {
        Self {
            embedding: Arc::new(Semaphore::new(cfg.embedding_concurrency.max(1))),
            db_search: Arc::new(Semaphore::new(cfg.db_search_concurrency.max(1))),
            pipeline: Arc::new(Semaphore::new(cfg.pipeline_concurrency.max(1))),
            acquire_timeout: Duration::from_secs(cfg.acquire_timeout_seconds.max(1)),
        }
    }

    pub async fn acquire_timed(
        sem: Arc<Semaphore>,
        acquire_timeout: Duration,
        op: &'static str,
    ) -> Result<(OwnedSemaphorePermit, Duration), CoreError> {
        let start = Instant::now();

        let permit = tokio::time::timeout(acquire_timeout, sem.acquire_owned())
            .await
            .map_err(|_| CoreError::IndexUnavailable(format!("limiter acquire timeout for op={op}")))?
            .map_err(|e| CoreError::Internal(format!("semaphore closed for op={op}: {e}")))?;

        Ok((permit, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LimitsConfig {
        LimitsConfig {
            max_upload_bytes: 1024,
            embedding_concurrency: 1,
            db_search_concurrency: 1,
            pipeline_concurrency: 1,
            acquire_timeout_seconds: 1,
            ingest_deadline_seconds: 30,
            retrieval_deadline_seconds: 10,
        }
    }

    #[tokio::test]
    async fn acquire_succeeds_when_a_permit_is_free() {
        let limiters = Limiters::new(&cfg());
        let (permit, _wait) = Limiters::acquire_timed(
            limiters.embedding.clone(),
            limiters.acquire_timeout,
            "embedding",
        )
        .await
        .unwrap();
        drop(permit);
    }

    #[tokio::test]
    async fn acquire_times_out_when_the_single_permit_is_held() {
        let limiters = Limiters::new(&cfg());
        let _held = limiters.embedding.clone().acquire_owned().await.unwrap();
        let result = Limiters::acquire_timed(
            limiters.embedding.clone(),
            Duration::from_millis(50),
            "embedding",
        )
        .await;
        assert!(matches!(result, Err(CoreError::IndexUnavailable(_))));
    }
}
