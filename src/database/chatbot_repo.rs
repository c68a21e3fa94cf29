use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{AccessLevel, ChatbotLink};
use crate::utils::CoreError;

use super::DbPool;

#[derive(Clone)]
pub struct ChatbotRepo {
    pool: DbPool,
}

impl ChatbotRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_link(
        &self,
        chatbot_id: Uuid,
        kb_id: Uuid,
        access_level: AccessLevel,
        filter_expression: Option<&serde_json::Value>,
        context_weight: f32,
        priority: i32,
        intent_keywords: &[String],
        max_chunks: i32,
        similarity_threshold: f32,
    ) -> Result<ChatbotLink, CoreError> {
        let link = sqlx::query_as::<_, ChatbotLink>(
            r#"INSERT INTO chatbot_links
                (chatbot_id, kb_id, access_level, filter_expression, context_weight,
                 priority, intent_keywords, max_chunks, similarity_threshold)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               ON CONFLICT (chatbot_id, kb_id) DO UPDATE SET
                   access_level = EXCLUDED.access_level,
                   filter_expression = EXCLUDED.filter_expression,
                   context_weight = EXCLUDED.context_weight,
                   priority = EXCLUDED.priority,
                   intent_keywords = EXCLUDED.intent_keywords,
                   max_chunks = EXCLUDED.max_chunks,
                   similarity_threshold = EXCLUDED.similarity_threshold,
                   updated_at = now()
               RETURNING *"#,
        )
        .bind(chatbot_id)
        .bind(kb_id)
        .bind(access_level)
        .bind(filter_expression.map(Json))
        .bind(context_weight)
        .bind(priority)
        .bind(Json(intent_keywords))
        .bind(max_chunks)
        .bind(similarity_threshold)
        .fetch_one(self.pool.get_pool())
        .await?;
        Ok(link)
    }

    /// Every enabled link for a chatbot, ordered by priority
    /// (ascending — lower value wins) the way the retrieval engine's
    /// link-resolution step expects.
    pub async fn links_for_chatbot(&self, chatbot_id: Uuid) -> Result<Vec<ChatbotLink>, CoreError> {
        let links = sqlx::query_as::<_, ChatbotLink>(
            r#"SELECT * FROM chatbot_links
               WHERE chatbot_id = $1 AND enabled
               ORDER BY priority ASC"#,
        )
        .bind(chatbot_id)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(links)
    }

    pub async fn set_enabled(&self, chatbot_id: Uuid, kb_id: Uuid, enabled: bool) -> Result<(), CoreError> {
        let result = sqlx::query(
            "UPDATE chatbot_links SET enabled = $3, updated_at = now() WHERE chatbot_id = $1 AND kb_id = $2",
        )
        .bind(chatbot_id)
        .bind(kb_id)
        .bind(enabled)
        .execute(self.pool.get_pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!(
                "chatbot link {chatbot_id}/{kb_id}"
            )));
        }
        Ok(())
    }
}
