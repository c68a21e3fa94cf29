use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Shared,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    Recursive,
    Sentence,
    Paragraph,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPolicy {
    pub size: usize,
    pub overlap: usize,
    pub strategy: ChunkStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineKind {
    None,
    StoredProcedure,
    ExternalFunction,
    Webhook,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub kind: PipelineKind,
    /// Shape depends on `kind`: a procedure name, a function
    /// identifier, or `{url, secret}` for webhooks.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { kind: PipelineKind::None, config: serde_json::Value::Null }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quota {
    pub max_documents: i64,
    pub max_chunks: i64,
    pub max_storage_bytes: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub collection_id: Option<Uuid>,
    pub visibility: Visibility,
    pub chunk_policy: Json<ChunkPolicy>,
    pub pipeline: Json<PipelineConfig>,
    pub quota: Json<Quota>,
    /// Set once the first chunk in this KB is successfully embedded;
    /// every later ingest must match it (see SPEC_FULL.md open
    /// question: fail-on-mismatch).
    pub embedding_model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeBase {
    /// Invariant: exactly one of `owner_id`/`collection_id` is set;
    /// `visibility=private` implies `owner_id` set.
    pub fn validate_invariants(&self) -> Result<(), String> {
        if self.owner_id.is_some() == self.collection_id.is_some() {
            return Err("exactly one of owner_id/collection_id must be set".into());
        }
        if self.visibility == Visibility::Private && self.owner_id.is_none() {
            return Err("private visibility requires owner_id".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(owner: Option<Uuid>, collection: Option<Uuid>, vis: Visibility) -> KnowledgeBase {
        KnowledgeBase {
            id: Uuid::new_v4(),
            name: "kb".into(),
            description: None,
            owner_id: owner,
            collection_id: collection,
            visibility: vis,
            chunk_policy: Json(ChunkPolicy { size: 512, overlap: 50, strategy: ChunkStrategy::Recursive }),
            pipeline: Json(PipelineConfig::default()),
            quota: Json(Quota { max_documents: 10, max_chunks: 1000, max_storage_bytes: 1 << 20 }),
            embedding_model: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_both_owner_and_collection_set() {
        let kb = base(Some(Uuid::new_v4()), Some(Uuid::new_v4()), Visibility::Shared);
        assert!(kb.validate_invariants().is_err());
    }

    #[test]
    fn rejects_neither_owner_nor_collection_set() {
        let kb = base(None, None, Visibility::Shared);
        assert!(kb.validate_invariants().is_err());
    }

    #[test]
    fn rejects_private_without_owner() {
        let kb = base(None, Some(Uuid::new_v4()), Visibility::Private);
        assert!(kb.validate_invariants().is_err());
    }

    #[test]
    fn accepts_private_with_owner() {
        let kb = base(Some(Uuid::new_v4()), None, Visibility::Private);
        assert!(kb.validate_invariants().is_ok());
    }
}
