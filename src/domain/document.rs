use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "document_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Indexed,
    Failed,
}

impl DocumentStatus {
    /// Only `pending -> processing -> indexed | failed` is a valid
    /// transition; everything else is a programmer error.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Pending, DocumentStatus::Processing)
                | (DocumentStatus::Processing, DocumentStatus::Indexed)
                | (DocumentStatus::Processing, DocumentStatus::Failed)
                | (DocumentStatus::Pending, DocumentStatus::Failed)
        )
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub kb_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub title: String,
    pub content_hash: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub metadata: Json<serde_json::Value>,
    pub pipeline_version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn metadata_user_id(&self) -> Option<&str> {
        self.metadata.get("user_id").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_four_named_transitions_are_legal() {
        use DocumentStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Indexed));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Indexed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Indexed));
        assert!(!Pending.can_transition_to(Indexed));
    }
}
