mod settings;

pub use settings::{
    DatabaseConfig, EmbeddingConfig, IngestionConfig, LimitsConfig, PipelineCallConfig,
    QuotaDefaults, RagConfig, SecurityConfig, ServerConfig, Settings,
};
