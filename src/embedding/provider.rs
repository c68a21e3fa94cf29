use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::utils::CoreError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, CoreError>;
    fn model(&self) -> &str;
    fn dimension(&self) -> usize;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Calls an OpenAI-compatible `/v1/embeddings` endpoint, retrying
/// transient failures with exponential backoff plus jitter.
pub struct HttpEmbeddingProvider {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
    max_retries: u32,
    retry_base_delay_ms: u64,
    retry_max_delay_ms: u64,
}

impl HttpEmbeddingProvider {
    pub fn new(cfg: &EmbeddingConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: cfg.base_url.clone(),
            model: cfg.model.clone(),
            dimension: cfg.dimension,
            api_key: cfg.api_key.clone(),
            max_retries: cfg.max_retries,
            retry_base_delay_ms: cfg.retry_base_delay_ms,
            retry_max_delay_ms: cfg.retry_max_delay_ms,
        }
    }

    async fn call_once(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let mut request = self.client.post(&url).json(&EmbeddingRequest { input: text, model: &self.model });
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::EmbedFailed(format!("request to embedding provider failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::EmbedFailed(format!("embedding provider returned {status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| CoreError::EmbedFailed(format!("malformed embedding response: {e}")))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::EmbedFailed("embedding provider returned no data".into()))?
            .embedding;

        if embedding.len() != self.dimension {
            return Err(CoreError::EmbedFailed(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    fn backoff_delay(&self, attempt: u32) -> std::time::Duration {
        let exp = self.retry_base_delay_ms.saturating_mul(1u64 << attempt.min(16));
        let capped = exp.min(self.retry_max_delay_ms);
        let jitter = rand::rng().random_range(0..=capped / 4 + 1);
        std::time::Duration::from_millis(capped + jitter)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            match self.call_once(text).await {
                Ok(vec) => return Ok(vec),
                Err(e) => {
                    last_err = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| CoreError::EmbedFailed("exhausted retries".into())))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
