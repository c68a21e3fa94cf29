use pgvector::Vector;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::Chunk;
use crate::utils::CoreError;

use super::DbPool;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChunkSearchHit {
    #[sqlx(flatten)]
    pub chunk: Chunk,
    pub similarity: f32,
}

#[derive(Clone)]
pub struct ChunkRepo {
    pool: DbPool,
}

impl ChunkRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Transactional bulk insert; chunks only become visible once the
    /// parent document is transitioned to `indexed` by the caller.
    pub async fn insert_all(&self, chunks: &[Chunk]) -> Result<(), CoreError> {
        let mut tx = self.pool.get_pool().begin().await?;
        for chunk in chunks {
            sqlx::query(
                r#"INSERT INTO chunks
                    (id, document_id, kb_id, ordinal, text, embedding,
                     embedding_model, metadata)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
            )
            .bind(chunk.id)
            .bind(chunk.document_id)
            .bind(chunk.kb_id)
            .bind(chunk.ordinal)
            .bind(&chunk.text)
            .bind(chunk.embedding.clone())
            .bind(&chunk.embedding_model)
            .bind(Json(&chunk.metadata.0))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Sets a chunk's embedding after it has already been persisted
    /// text-only, the order embedding (C4) runs in relative to the
    /// chunk upsert (C3).
    pub async fn set_embedding(&self, id: Uuid, embedding: Vector, model: &str) -> Result<(), CoreError> {
        sqlx::query("UPDATE chunks SET embedding = $2, embedding_model = $3 WHERE id = $1")
            .bind(id)
            .bind(embedding)
            .bind(model)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    pub async fn fetch_for_document(&self, document_id: Uuid) -> Result<Vec<Chunk>, CoreError> {
        let chunks = sqlx::query_as::<_, Chunk>(
            "SELECT * FROM chunks WHERE document_id = $1 ORDER BY ordinal",
        )
        .bind(document_id)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(chunks)
    }

    /// Cosine-similarity ANN search within a single KB, the unit of
    /// work fanned out over per-link in the retrieval engine.
    pub async fn vector_search(
        &self,
        kb_id: Uuid,
        query_embedding: Vector,
        limit: i64,
    ) -> Result<Vec<ChunkSearchHit>, CoreError> {
        let hits = sqlx::query_as::<_, ChunkSearchHit>(
            r#"SELECT c.*, 1 - (c.embedding <=> $2) AS similarity
               FROM chunks c
               JOIN documents d ON d.id = c.document_id
               WHERE c.kb_id = $1 AND d.status = 'indexed' AND c.embedding IS NOT NULL
               ORDER BY c.embedding <=> $2
               LIMIT $3"#,
        )
        .bind(kb_id)
        .bind(query_embedding)
        .bind(limit)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(hits)
    }

    /// Vector similarity blended with full-text rank, weighting
    /// favoring semantic similarity the way the donor's
    /// `hybrid_search_user_documents` stored procedure does.
    pub async fn hybrid_search(
        &self,
        kb_id: Uuid,
        query_embedding: Vector,
        query_text: &str,
        limit: i64,
    ) -> Result<Vec<ChunkSearchHit>, CoreError> {
        let hits = sqlx::query_as::<_, ChunkSearchHit>(
            r#"SELECT c.*,
                      (0.7 * (1 - (c.embedding <=> $2))
                       + 0.3 * ts_rank(c.text_search, plainto_tsquery('english', $3))) AS similarity
               FROM chunks c
               JOIN documents d ON d.id = c.document_id
               WHERE c.kb_id = $1 AND d.status = 'indexed' AND c.embedding IS NOT NULL
                 AND c.text_search @@ plainto_tsquery('english', $3)
               ORDER BY similarity DESC
               LIMIT $4"#,
        )
        .bind(kb_id)
        .bind(query_embedding)
        .bind(query_text)
        .bind(limit)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(hits)
    }

    pub async fn count_for_kb(&self, kb_id: Uuid) -> Result<i64, CoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM chunks WHERE kb_id = $1")
            .bind(kb_id)
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(count)
    }

    pub async fn count_for_document(&self, document_id: Uuid) -> Result<i64, CoreError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT count(*) FROM chunks WHERE document_id = $1")
                .bind(document_id)
                .fetch_one(self.pool.get_pool())
                .await?;
        Ok(count)
    }

    pub async fn delete_for_document(&self, document_id: Uuid) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM chunks WHERE document_id = $1")
            .bind(document_id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }
}
