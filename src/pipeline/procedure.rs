use std::time::Duration;

use sqlx::PgPool;

use crate::config::PipelineCallConfig;
use crate::utils::CoreError;

#[derive(Debug, sqlx::FromRow)]
struct TransformRow {
    text: String,
    metadata: serde_json::Value,
}

/// Invokes a relational function `name(text, jsonb) -> (text, jsonb)`
/// under a per-call timeout; the function is expected to already
/// exist in the database (created by the tenant, not this core).
async fn invoke(pool: &PgPool, cfg: &PipelineCallConfig, name: &str, text: &str, metadata: &serde_json::Value) -> Result<(String, serde_json::Value), CoreError> {
    let query = format!("SELECT * FROM {name}($1, $2)");
    let call = sqlx::query_as::<_, TransformRow>(&query)
        .bind(text)
        .bind(sqlx::types::Json(metadata))
        .fetch_one(pool);

    let row = tokio::time::timeout(Duration::from_secs(cfg.call_timeout_seconds), call)
        .await
        .map_err(|_| CoreError::PipelineFailed(format!("{name} timed out after {}s", cfg.call_timeout_seconds)))?
        .map_err(|e| CoreError::PipelineFailed(format!("{name} failed: {e}")))?;

    let encoded_len = serde_json::to_vec(&row.metadata).map(|v| v.len()).unwrap_or(0) + row.text.len();
    if encoded_len > cfg.max_result_bytes {
        return Err(CoreError::PipelineFailed(format!(
            "{name} result of {encoded_len} bytes exceeds the {} byte cap",
            cfg.max_result_bytes
        )));
    }

    Ok((row.text, row.metadata))
}

/// `kind = stored-procedure`: the function name comes from KB-level
/// configuration, trusted input (not user-supplied at request time).
pub async fn stored_procedure(
    pool: &PgPool,
    cfg: &PipelineCallConfig,
    procedure_name: &str,
    text: &str,
    metadata: &serde_json::Value,
) -> Result<(String, serde_json::Value), CoreError> {
    invoke(pool, cfg, procedure_name, text, metadata).await
}

/// `kind = external-function`: same mechanism as `stored_procedure`,
/// kept as a distinct entry point because the two variants are
/// expected to diverge once external functions run in a real sandbox
/// rather than as a plain relational function call.
pub async fn external_function(
    pool: &PgPool,
    cfg: &PipelineCallConfig,
    function_name: &str,
    text: &str,
    metadata: &serde_json::Value,
) -> Result<(String, serde_json::Value), CoreError> {
    invoke(pool, cfg, function_name, text, metadata).await
}
