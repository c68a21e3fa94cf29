mod coordinator;
mod watchdog;
mod worker;

pub use coordinator::{IngestSource, IngestionCoordinator};

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of the canonical text, used both for duplicate
/// detection and as the `content_hash` persisted on the document row.
pub(crate) fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{digest:x}")
}

/// Identifies which transformation a document was ingested under, so
/// a later change to a knowledge base's pipeline configuration does
/// not collide with documents ingested under the previous one.
pub(crate) fn pipeline_version_of(pipeline: &crate::domain::PipelineConfig) -> String {
    let config_hash = Sha256::digest(pipeline.config.to_string().as_bytes());
    format!("{:?}-{:x}", pipeline.kind, config_hash)
        .to_lowercase()
        .replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PipelineConfig, PipelineKind};

    #[test]
    fn identical_text_hashes_identically() {
        assert_eq!(content_hash("hello world"), content_hash("hello world"));
        assert_ne!(content_hash("hello world"), content_hash("hello there"));
    }

    #[test]
    fn pipeline_version_changes_with_config() {
        let a = PipelineConfig { kind: PipelineKind::StoredProcedure, config: serde_json::json!({"procedure": "p1"}) };
        let b = PipelineConfig { kind: PipelineKind::StoredProcedure, config: serde_json::json!({"procedure": "p2"}) };
        assert_ne!(pipeline_version_of(&a), pipeline_version_of(&b));
    }
}
