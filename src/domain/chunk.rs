use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub kb_id: Uuid,
    pub ordinal: i32,
    pub text: String,
    #[serde(skip)]
    pub embedding: Option<Vector>,
    pub embedding_model: Option<String>,
    pub metadata: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn metadata_user_id(&self) -> Option<&str> {
        self.metadata.get("user_id").and_then(|v| v.as_str())
    }
}
