use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{ChunkPolicy, Collection, KnowledgeBase, MemberRole, PipelineConfig, Quota, Visibility};
use crate::utils::CoreError;

use super::DbPool;

/// Repository over `knowledge_bases` and `collections`. Mirrors the
/// donor's `Repository{pool}` shape, split by aggregate.
#[derive(Clone)]
pub struct KbRepo {
    pool: DbPool,
}

impl KbRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        owner_id: Option<Uuid>,
        collection_id: Option<Uuid>,
        visibility: Visibility,
        chunk_policy: &ChunkPolicy,
        pipeline: &PipelineConfig,
        quota: &Quota,
        embedding_model: Option<&str>,
    ) -> Result<KnowledgeBase, CoreError> {
        let kb = sqlx::query_as::<_, KnowledgeBase>(
            r#"INSERT INTO knowledge_bases
                (name, description, owner_id, collection_id, visibility,
                 chunk_policy, pipeline, quota, embedding_model)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .bind(collection_id)
        .bind(visibility)
        .bind(Json(chunk_policy))
        .bind(Json(pipeline))
        .bind(Json(quota))
        .bind(embedding_model)
        .fetch_one(self.pool.get_pool())
        .await?;
        Ok(kb)
    }

    pub async fn get(&self, id: Uuid) -> Result<KnowledgeBase, CoreError> {
        sqlx::query_as::<_, KnowledgeBase>("SELECT * FROM knowledge_bases WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.get_pool())
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("knowledge base {id}")))
    }

    pub async fn list_for_collection(&self, collection_id: Uuid) -> Result<Vec<KnowledgeBase>, CoreError> {
        let kbs = sqlx::query_as::<_, KnowledgeBase>(
            "SELECT * FROM knowledge_bases WHERE collection_id = $1 ORDER BY created_at DESC",
        )
        .bind(collection_id)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(kbs)
    }

    pub async fn list_owned_or_public(&self, owner_id: Uuid) -> Result<Vec<KnowledgeBase>, CoreError> {
        let kbs = sqlx::query_as::<_, KnowledgeBase>(
            r#"SELECT * FROM knowledge_bases
               WHERE owner_id = $1 OR visibility = 'public'
               ORDER BY created_at DESC"#,
        )
        .bind(owner_id)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(kbs)
    }

    pub async fn update_visibility(&self, id: Uuid, visibility: Visibility) -> Result<(), CoreError> {
        let result = sqlx::query(
            "UPDATE knowledge_bases SET visibility = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(visibility)
        .execute(self.pool.get_pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("knowledge base {id}")));
        }
        Ok(())
    }

    pub async fn update_quota(&self, id: Uuid, quota: &Quota) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE knowledge_bases SET quota = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(Json(quota))
            .execute(self.pool.get_pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("knowledge base {id}")));
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM knowledge_bases WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("knowledge base {id}")));
        }
        Ok(())
    }

    /// Sets `embedding_model` only if it is currently unset, so the
    /// first document ever embedded into a knowledge base locks the
    /// model for every later one.
    pub async fn lock_embedding_model(&self, id: Uuid, model: &str) -> Result<(), CoreError> {
        sqlx::query(
            "UPDATE knowledge_bases SET embedding_model = $2, updated_at = now() WHERE id = $1 AND embedding_model IS NULL",
        )
        .bind(id)
        .bind(model)
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    pub async fn create_collection(&self, name: &str, slug: &str, created_by: Uuid) -> Result<Collection, CoreError> {
        let collection = sqlx::query_as::<_, Collection>(
            "INSERT INTO collections (name, slug, created_by) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(slug)
        .bind(created_by)
        .fetch_one(self.pool.get_pool())
        .await?;
        Ok(collection)
    }

    pub async fn add_member(&self, collection_id: Uuid, identity_id: Uuid, role: MemberRole) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO collection_members (collection_id, identity_id, role)
               VALUES ($1, $2, $3)
               ON CONFLICT (collection_id, identity_id) DO UPDATE SET role = EXCLUDED.role"#,
        )
        .bind(collection_id)
        .bind(identity_id)
        .bind(role)
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    pub async fn member_role(&self, collection_id: Uuid, identity_id: Uuid) -> Result<Option<MemberRole>, CoreError> {
        let role = sqlx::query_scalar::<_, MemberRole>(
            "SELECT role FROM collection_members WHERE collection_id = $1 AND identity_id = $2",
        )
        .bind(collection_id)
        .bind(identity_id)
        .fetch_optional(self.pool.get_pool())
        .await?;
        Ok(role)
    }
}
