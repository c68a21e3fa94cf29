use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use reqwest::Url;

use crate::config::PipelineCallConfig;
use crate::utils::CoreError;

use super::ssrf;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, serde::Serialize)]
struct WebhookBody<'a> {
    text: &'a str,
    metadata: &'a serde_json::Value,
}

#[derive(Debug, serde::Deserialize)]
pub struct WebhookResponse {
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// POSTs `text`/`metadata` to `url`, signing the body as
/// `HMAC-SHA256(secret, body)` the way the donor's
/// `CustomHeaderValidator` signs inbound requests, applied here to an
/// outbound call instead.
pub async fn call(
    client: &reqwest::Client,
    cfg: &PipelineCallConfig,
    url: &str,
    secret: &str,
    text: &str,
    metadata: &serde_json::Value,
) -> Result<WebhookResponse, CoreError> {
    let parsed = Url::parse(url).map_err(|e| CoreError::ValidationError(format!("invalid webhook url: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| CoreError::ValidationError("webhook url has no host".into()))?;
    let port = parsed.port_or_known_default().unwrap_or(443);
    ssrf::guard_host(host, port).await?;

    let body = serde_json::to_vec(&WebhookBody { text, metadata })
        .map_err(|e| CoreError::Internal(format!("failed to serialize webhook body: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CoreError::Internal(format!("hmac key error: {e}")))?;
    mac.update(&body);
    let signature = hex::encode(mac.finalize().into_bytes());
    let timestamp = Utc::now().timestamp();

    let response = client
        .post(url)
        .header("X-Fluxbase-Signature", signature)
        .header("X-Fluxbase-Timestamp", timestamp.to_string())
        .header("Content-Type", "application/json")
        .timeout(std::time::Duration::from_secs(cfg.call_timeout_seconds))
        .body(body)
        .send()
        .await
        .map_err(|e| CoreError::PipelineFailed(format!("webhook request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(CoreError::PipelineFailed(format!(
            "webhook returned status {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CoreError::PipelineFailed(format!("failed reading webhook response: {e}")))?;
    if bytes.len() > cfg.max_result_bytes {
        return Err(CoreError::PipelineFailed(format!(
            "webhook response of {} bytes exceeds the {} byte cap",
            bytes.len(),
            cfg.max_result_bytes
        )));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| CoreError::PipelineFailed(format!("malformed webhook response: {e}")))
}
