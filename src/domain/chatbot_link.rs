use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "access_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Full,
    Filtered,
    Tiered,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ChatbotLink {
    pub id: Uuid,
    pub chatbot_id: Uuid,
    pub kb_id: Uuid,
    pub access_level: AccessLevel,
    pub filter_expression: Option<Json<serde_json::Value>>,
    pub context_weight: f32,
    pub priority: i32,
    pub intent_keywords: Json<Vec<String>>,
    pub max_chunks: i32,
    pub similarity_threshold: f32,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatbotLink {
    /// `filtered` access without a filter expression degenerates to `full`;
    /// validated at write time so retrieval never has to guess intent.
    pub fn validate_invariants(&self) -> Result<(), String> {
        if self.access_level == AccessLevel::Filtered && self.filter_expression.is_none() {
            return Err("filtered access requires a filter_expression".into());
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err("similarity_threshold must be within [0,1]".into());
        }
        if self.max_chunks <= 0 {
            return Err("max_chunks must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ChatbotLink {
        ChatbotLink {
            id: Uuid::new_v4(),
            chatbot_id: Uuid::new_v4(),
            kb_id: Uuid::new_v4(),
            access_level: AccessLevel::Full,
            filter_expression: None,
            context_weight: 1.0,
            priority: 0,
            intent_keywords: Json(vec![]),
            max_chunks: 8,
            similarity_threshold: 0.7,
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_filtered_without_expression() {
        let mut l = base();
        l.access_level = AccessLevel::Filtered;
        assert!(l.validate_invariants().is_err());
    }

    #[test]
    fn accepts_full_without_expression() {
        assert!(base().validate_invariants().is_ok());
    }
}
