use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Top-level configuration, assembled from `config/settings.toml`
/// overridden by `APP__`-prefixed environment variables.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub limits: LimitsConfig,
    pub ingestion: IngestionConfig,
    pub pipeline: PipelineCallConfig,
    pub quota_defaults: QuotaDefaults,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Shared secret used to verify identity tokens minted by the
    /// external authentication service.
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

/// Defaults used when a KnowledgeBase does not override chunk policy.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RagConfig {
    pub default_chunk_size: usize,
    pub default_chunk_overlap: usize,
    pub default_strategy: String,
    pub retrieval_default_max_chunks: usize,
    pub retrieval_default_similarity_threshold: f32,
    pub graph_max_depth: u32,
    pub graph_max_nodes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QuotaDefaults {
    pub max_documents: i64,
    pub max_chunks: i64,
    pub max_storage_bytes: i64,
}

/// Call-level limits for the transformation pipeline (C2), distinct
/// from a knowledge base's own `domain::PipelineConfig` (which names
/// *which* pipeline a KB runs).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineCallConfig {
    pub call_timeout_seconds: u64,
    pub max_result_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LimitsConfig {
    pub max_upload_bytes: usize,
    pub embedding_concurrency: usize,
    pub db_search_concurrency: usize,
    pub pipeline_concurrency: usize,
    pub acquire_timeout_seconds: u64,
    pub ingest_deadline_seconds: u64,
    pub retrieval_deadline_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestionConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub lease_seconds: u64,
    pub embed_max_attempts: u32,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Settings {
        Settings {
            server: ServerConfig { host: "0.0.0.0".into(), port: 8080 },
            security: SecurityConfig { jwt_secret: "s".into(), jwt_expiration_seconds: 3600 },
            database: DatabaseConfig { url: "postgres://".into(), pool_max_size: 5, pool_timeout_seconds: 5 },
            embedding: EmbeddingConfig {
                base_url: "http://localhost:11434".into(),
                api_key: None,
                model: "test-model".into(),
                dimension: 384,
                batch_size: 16,
                max_retries: 3,
                retry_base_delay_ms: 100,
                retry_max_delay_ms: 2000,
            },
            rag: RagConfig {
                default_chunk_size: 512,
                default_chunk_overlap: 50,
                default_strategy: "recursive".into(),
                retrieval_default_max_chunks: 10,
                retrieval_default_similarity_threshold: 0.35,
                graph_max_depth: 5,
                graph_max_nodes: 100,
            },
            limits: LimitsConfig {
                max_upload_bytes: 50 * 1024 * 1024,
                embedding_concurrency: 4,
                db_search_concurrency: 8,
                pipeline_concurrency: 4,
                acquire_timeout_seconds: 30,
                ingest_deadline_seconds: 30,
                retrieval_deadline_seconds: 10,
            },
            ingestion: IngestionConfig {
                worker_count: 2,
                queue_capacity: 1000,
                lease_seconds: 600,
                embed_max_attempts: 5,
            },
            pipeline: PipelineCallConfig {
                call_timeout_seconds: 10,
                max_result_bytes: 10 * 1024 * 1024,
            },
            quota_defaults: QuotaDefaults {
                max_documents: 10_000,
                max_chunks: 1_000_000,
                max_storage_bytes: 10 * 1024 * 1024 * 1024,
            },
        }
    }

    #[test]
    fn sample_settings_round_trip_through_serde() {
        let s = sample();
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.server.port, 8080);
        assert_eq!(back.embedding.dimension, 384);
    }
}
