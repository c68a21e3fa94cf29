mod procedure;
mod ssrf;
mod webhook;

use sqlx::PgPool;

use crate::config::PipelineCallConfig;
use crate::domain::{PipelineConfig, PipelineKind};
use crate::utils::CoreError;

/// Result of running a document's text and metadata through its
/// configured transformation. `chunking_override` lets a pipeline
/// request a different chunk policy than the KB default for this one
/// document (e.g. a stored procedure that already splits the text).
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub text: String,
    pub metadata: serde_json::Value,
    pub chunking_override: Option<serde_json::Value>,
}

/// Runs `text`/`metadata` through the KB's configured pipeline.
/// `kind = none` is a pass-through; every other kind is bounded by
/// `cfg.call_timeout_seconds`/`cfg.max_result_bytes` and turns any
/// failure into `CoreError::PipelineFailed`.
pub async fn transform(
    pool: &PgPool,
    http: &reqwest::Client,
    cfg: &PipelineCallConfig,
    pipeline: &PipelineConfig,
    text: &str,
    metadata: &serde_json::Value,
) -> Result<TransformOutput, CoreError> {
    let (text, metadata) = match pipeline.kind {
        PipelineKind::None => (text.to_string(), metadata.clone()),
        PipelineKind::StoredProcedure => {
            let name = pipeline
                .config
                .get("procedure")
                .and_then(|v| v.as_str())
                .ok_or_else(|| CoreError::ValidationError("stored-procedure pipeline missing `procedure` name".into()))?;
            procedure::stored_procedure(pool, cfg, name, text, metadata).await?
        }
        PipelineKind::ExternalFunction => {
            let name = pipeline
                .config
                .get("function")
                .and_then(|v| v.as_str())
                .ok_or_else(|| CoreError::ValidationError("external-function pipeline missing `function` name".into()))?;
            procedure::external_function(pool, cfg, name, text, metadata).await?
        }
        PipelineKind::Webhook => {
            let url = pipeline
                .config
                .get("url")
                .and_then(|v| v.as_str())
                .ok_or_else(|| CoreError::ValidationError("webhook pipeline missing `url`".into()))?;
            let secret = pipeline
                .config
                .get("secret")
                .and_then(|v| v.as_str())
                .ok_or_else(|| CoreError::ValidationError("webhook pipeline missing `secret`".into()))?;
            let response = webhook::call(http, cfg, url, secret, text, metadata).await?;
            (response.text, response.metadata)
        }
    };

    let chunking_override = metadata.get("chunking_override").cloned();
    Ok(TransformOutput { text, metadata, chunking_override })
}
