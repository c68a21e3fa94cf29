use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{DocumentEntityMention, Entity, EntityType, Relationship};
use crate::utils::CoreError;

use super::DbPool;

#[derive(Clone)]
pub struct EntityRepo {
    pool: DbPool,
}

impl EntityRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create-or-merge by `(kb_id, type, canonical_name)`; re-ingests
    /// of the same document must not duplicate entities already known
    /// to the graph.
    pub async fn upsert(
        &self,
        kb_id: Uuid,
        entity_type: EntityType,
        name: &str,
        canonical_name: &str,
        aliases: &[String],
    ) -> Result<Entity, CoreError> {
        let entity = sqlx::query_as::<_, Entity>(
            r#"INSERT INTO entities (kb_id, entity_type, name, canonical_name, aliases)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (kb_id, entity_type, canonical_name)
               DO UPDATE SET
                   aliases = (
                       SELECT jsonb_agg(DISTINCT alias)
                       FROM jsonb_array_elements_text(
                           entities.aliases || EXCLUDED.aliases
                       ) AS alias
                   ),
                   updated_at = now()
               RETURNING *"#,
        )
        .bind(kb_id)
        .bind(entity_type)
        .bind(name)
        .bind(canonical_name)
        .bind(Json(aliases))
        .fetch_one(self.pool.get_pool())
        .await?;
        Ok(entity)
    }

    pub async fn upsert_relationship(
        &self,
        kb_id: Uuid,
        source_entity_id: Uuid,
        target_entity_id: Uuid,
        relationship_type: &str,
        direction: crate::domain::Direction,
        confidence: Option<f32>,
    ) -> Result<Relationship, CoreError> {
        if source_entity_id == target_entity_id {
            return Err(CoreError::ValidationError(
                "relationship source and target must differ".into(),
            ));
        }
        let relationship = sqlx::query_as::<_, Relationship>(
            r#"INSERT INTO relationships
                (kb_id, source_entity_id, target_entity_id, relationship_type, direction, confidence)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (kb_id, source_entity_id, target_entity_id, relationship_type)
               DO UPDATE SET confidence = EXCLUDED.confidence
               RETURNING *"#,
        )
        .bind(kb_id)
        .bind(source_entity_id)
        .bind(target_entity_id)
        .bind(relationship_type)
        .bind(direction)
        .bind(confidence)
        .fetch_one(self.pool.get_pool())
        .await?;
        Ok(relationship)
    }

    pub async fn upsert_mention(
        &self,
        document_id: Uuid,
        entity_id: Uuid,
        first_offset: i32,
        salience: f32,
        context_snippet: &str,
    ) -> Result<DocumentEntityMention, CoreError> {
        let mention = sqlx::query_as::<_, DocumentEntityMention>(
            r#"INSERT INTO document_entity_mentions
                (document_id, entity_id, mention_count, first_offset, salience, context_snippet)
               VALUES ($1, $2, 1, $3, $4, $5)
               ON CONFLICT (document_id, entity_id)
               DO UPDATE SET
                   mention_count = document_entity_mentions.mention_count + 1,
                   salience = GREATEST(document_entity_mentions.salience, EXCLUDED.salience)
               RETURNING *"#,
        )
        .bind(document_id)
        .bind(entity_id)
        .bind(first_offset)
        .bind(salience)
        .bind(context_snippet)
        .fetch_one(self.pool.get_pool())
        .await?;
        Ok(mention)
    }

    /// One hop of relationships touching any of `entity_ids`, used by
    /// the retrieval engine's bounded BFS (depth and node-count limits
    /// are enforced by the caller, not here).
    pub async fn neighbors(&self, kb_id: Uuid, entity_ids: &[Uuid]) -> Result<Vec<Relationship>, CoreError> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rels = sqlx::query_as::<_, Relationship>(
            r#"SELECT * FROM relationships
               WHERE kb_id = $1
                 AND (source_entity_id = ANY($2) OR target_entity_id = ANY($2))"#,
        )
        .bind(kb_id)
        .bind(entity_ids)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(rels)
    }

    pub async fn list_for_kb(&self, kb_id: Uuid) -> Result<Vec<Entity>, CoreError> {
        let entities = sqlx::query_as::<_, Entity>("SELECT * FROM entities WHERE kb_id = $1 ORDER BY created_at DESC")
            .bind(kb_id)
            .fetch_all(self.pool.get_pool())
            .await?;
        Ok(entities)
    }

    pub async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Entity>, CoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let entities = sqlx::query_as::<_, Entity>("SELECT * FROM entities WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(self.pool.get_pool())
            .await?;
        Ok(entities)
    }

    pub async fn mentions_for_document(&self, document_id: Uuid) -> Result<Vec<DocumentEntityMention>, CoreError> {
        let mentions = sqlx::query_as::<_, DocumentEntityMention>(
            "SELECT * FROM document_entity_mentions WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(mentions)
    }
}
