use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{Document, DocumentStatus};
use crate::utils::CoreError;

use super::DbPool;

#[derive(Clone)]
pub struct DocumentRepo {
    pool: DbPool,
}

impl DocumentRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Looks up a document by its content hash within a KB, used by
    /// the ingestion coordinator to detect duplicate uploads before
    /// reserving quota or enqueuing work.
    pub async fn find_by_content_hash(&self, kb_id: Uuid, content_hash: &str) -> Result<Option<Document>, CoreError> {
        let doc = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE kb_id = $1 AND content_hash = $2",
        )
        .bind(kb_id)
        .bind(content_hash)
        .fetch_optional(self.pool.get_pool())
        .await?;
        Ok(doc)
    }

    pub async fn insert_pending(
        &self,
        kb_id: Uuid,
        owner_id: Option<Uuid>,
        title: &str,
        content_hash: &str,
        size_bytes: i64,
        mime_type: &str,
        metadata: &serde_json::Value,
        pipeline_version: &str,
    ) -> Result<Document, CoreError> {
        let doc = sqlx::query_as::<_, Document>(
            r#"INSERT INTO documents
                (kb_id, owner_id, title, content_hash, size_bytes, mime_type,
                 status, metadata, pipeline_version)
               VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
               RETURNING *"#,
        )
        .bind(kb_id)
        .bind(owner_id)
        .bind(title)
        .bind(content_hash)
        .bind(size_bytes)
        .bind(mime_type)
        .bind(Json(metadata))
        .bind(pipeline_version)
        .fetch_one(self.pool.get_pool())
        .await?;
        Ok(doc)
    }

    /// Records the real `content_hash`/`size_bytes`/`metadata` once
    /// the worker has extracted and transformed the document's text;
    /// the row starts with the placeholder values `insert_pending`
    /// wrote so it could exist (and be findable by id) before either
    /// was known.
    pub async fn set_extracted(
        &self,
        id: Uuid,
        content_hash: &str,
        size_bytes: i64,
        metadata: &serde_json::Value,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"UPDATE documents
               SET content_hash = $2, size_bytes = $3, metadata = $4, updated_at = now()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(content_hash)
        .bind(size_bytes)
        .bind(Json(metadata))
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Document, CoreError> {
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.get_pool())
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("document {id}")))
    }

    pub async fn list_for_kb(&self, kb_id: Uuid) -> Result<Vec<Document>, CoreError> {
        let docs = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE kb_id = $1 ORDER BY created_at DESC",
        )
        .bind(kb_id)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(docs)
    }

    /// Documents stuck in `processing` whose `updated_at` is older
    /// than `lease_seconds`, the watchdog's reclaim candidates.
    pub async fn list_stale_processing(&self, lease_seconds: i64) -> Result<Vec<Document>, CoreError> {
        let docs = sqlx::query_as::<_, Document>(
            r#"SELECT * FROM documents
               WHERE status = 'processing'
                 AND updated_at < now() - make_interval(secs => $1)"#,
        )
        .bind(lease_seconds as f64)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(docs)
    }

    /// Bumps `updated_at` without touching status, used by the
    /// watchdog right after it re-enqueues a reclaimed job so the
    /// same row isn't grabbed again before the new attempt makes
    /// progress.
    pub async fn touch(&self, id: Uuid) -> Result<(), CoreError> {
        sqlx::query("UPDATE documents SET updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    /// Compare-and-set transition; returns `false` (no row updated)
    /// if the document was not in the expected `from` state, which
    /// the ingestion worker treats as "already claimed".
    pub async fn try_transition(
        &self,
        id: Uuid,
        from: DocumentStatus,
        to: DocumentStatus,
        error_message: Option<&str>,
    ) -> Result<bool, CoreError> {
        if !from.can_transition_to(to) {
            return Err(CoreError::Internal(format!(
                "illegal document transition {from:?} -> {to:?}"
            )));
        }
        let result = sqlx::query(
            r#"UPDATE documents
               SET status = $3, error_message = $4, updated_at = now()
               WHERE id = $1 AND status = $2"#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(error_message)
        .execute(self.pool.get_pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("document {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_is_rejected_before_hitting_the_database() {
        assert!(!DocumentStatus::Indexed.can_transition_to(DocumentStatus::Processing));
    }
}
