mod cache;
mod provider;

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::debug;

pub use cache::EmbeddingCache;
pub use provider::{EmbeddingProvider, HttpEmbeddingProvider};

use crate::utils::{CoreError, Limiters};

/// Wraps a provider with caching, bounded concurrency, and the
/// fail-on-mismatch rule that once a knowledge base has embedded its
/// first chunk with a model, every later chunk must use the same one.
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
    limiters: Arc<Limiters>,
    batch_size: usize,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, limiters: Arc<Limiters>, batch_size: usize) -> Self {
        Self { provider, cache: EmbeddingCache::new(), limiters, batch_size: batch_size.max(1) }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// A knowledge base records the model of its first successfully
    /// embedded chunk; every later ingest into the same KB must match
    /// both model name and dimension, or it is rejected rather than
    /// silently mixing incompatible vector spaces.
    pub fn ensure_model_compatible(&self, kb_embedding_model: Option<&str>) -> Result<(), CoreError> {
        match kb_embedding_model {
            None => Ok(()),
            Some(existing) if existing == self.provider.model() => Ok(()),
            Some(existing) => Err(CoreError::ValidationError(format!(
                "knowledge base is locked to embedding model {existing}, provider is configured for {}",
                self.provider.model()
            ))),
        }
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        if let Some(cached) = self.cache.get(self.provider.model(), text) {
            debug!(chars = text.len(), "embedding cache hit");
            return Ok(cached);
        }

        let (_permit, wait) =
            Limiters::acquire_timed(self.limiters.embedding.clone(), self.limiters.acquire_timeout, "embedding").await?;
        debug!(wait_ms = wait.as_millis() as u64, op = "embedding", "wait_queue");

        let start = Instant::now();
        let embedding = self.provider.embed_one(text).await?;
        debug!(exec_ms = start.elapsed().as_millis() as u64, op = "embedding", "exec");

        self.cache.insert(self.provider.model(), text, embedding.clone());
        Ok(embedding)
    }

    /// Embeds `texts` in `batch_size`-sized groups, each group run
    /// concurrently; groups themselves run sequentially to keep total
    /// in-flight calls bounded by the group size rather than the full
    /// chunk count of a large document.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        let mut results = Vec::with_capacity(texts.len());
        for group in texts.chunks(self.batch_size) {
            let futures = group.iter().map(|text| self.embed_one(text));
            for outcome in join_all(futures).await {
                results.push(outcome?);
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        async fn embed_one(&self, text: &str) -> Result<Vec<f32>, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32])
        }
        fn model(&self) -> &str {
            "stub-model"
        }
        fn dimension(&self) -> usize {
            1
        }
    }

    fn limiters() -> Arc<Limiters> {
        Arc::new(Limiters::new(&crate::config::LimitsConfig {
            max_upload_bytes: 1024,
            embedding_concurrency: 2,
            db_search_concurrency: 2,
            pipeline_concurrency: 2,
            acquire_timeout_seconds: 5,
            ingest_deadline_seconds: 30,
            retrieval_deadline_seconds: 10,
        }))
    }

    #[tokio::test]
    async fn repeated_text_hits_the_cache_instead_of_the_provider() {
        let provider = Arc::new(StubProvider { calls: AtomicUsize::new(0) });
        let service = EmbeddingService::new(provider.clone(), limiters(), 4);

        service.embed_one("hello").await.unwrap();
        service.embed_one("hello").await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_a_model_mismatch_against_a_locked_knowledge_base() {
        let provider = Arc::new(StubProvider { calls: AtomicUsize::new(0) });
        let service = EmbeddingService::new(provider, limiters(), 4);

        assert!(service.ensure_model_compatible(Some("stub-model")).is_ok());
        assert!(service.ensure_model_compatible(Some("other-model")).is_err());
        assert!(service.ensure_model_compatible(None).is_ok());
    }
}
