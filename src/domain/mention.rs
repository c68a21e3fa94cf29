use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DocumentEntityMention {
    pub id: Uuid,
    pub document_id: Uuid,
    pub entity_id: Uuid,
    pub mention_count: i32,
    pub first_offset: i32,
    pub salience: f32,
    pub context_snippet: String,
    pub created_at: DateTime<Utc>,
}
