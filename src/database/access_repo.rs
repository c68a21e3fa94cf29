use uuid::Uuid;

use crate::domain::{MemberRole, Permission, QuotaUsage, TargetKind};
use crate::utils::CoreError;

use super::DbPool;

#[derive(Clone)]
pub struct AccessRepo {
    pool: DbPool,
}

impl AccessRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn grant(
        &self,
        subject_id: Uuid,
        target_id: Uuid,
        target_kind: TargetKind,
        role: MemberRole,
        granted_by: Uuid,
    ) -> Result<Permission, CoreError> {
        let permission = sqlx::query_as::<_, Permission>(
            r#"INSERT INTO permissions (subject_id, target_id, target_kind, role, granted_by)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (subject_id, target_id, target_kind) DO UPDATE SET
                   role = EXCLUDED.role, granted_by = EXCLUDED.granted_by, granted_at = now()
               RETURNING *"#,
        )
        .bind(subject_id)
        .bind(target_id)
        .bind(target_kind)
        .bind(role)
        .bind(granted_by)
        .fetch_one(self.pool.get_pool())
        .await?;
        Ok(permission)
    }

    pub async fn find(
        &self,
        subject_id: Uuid,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> Result<Option<Permission>, CoreError> {
        let permission = sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE subject_id = $1 AND target_id = $2 AND target_kind = $3",
        )
        .bind(subject_id)
        .bind(target_id)
        .bind(target_kind)
        .fetch_optional(self.pool.get_pool())
        .await?;
        Ok(permission)
    }

    pub async fn has_any_permission(&self, subject_id: Uuid, target_id: Uuid, target_kind: TargetKind) -> Result<bool, CoreError> {
        Ok(self.find(subject_id, target_id, target_kind).await?.is_some())
    }

    pub async fn revoke(&self, subject_id: Uuid, target_id: Uuid, target_kind: TargetKind) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM permissions WHERE subject_id = $1 AND target_id = $2 AND target_kind = $3")
            .bind(subject_id)
            .bind(target_id)
            .bind(target_kind)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    pub async fn kb_usage(&self, kb_id: Uuid) -> Result<QuotaUsage, CoreError> {
        self.usage_row("kb_quota_usage", kb_id).await
    }

    pub async fn identity_usage(&self, identity_id: Uuid) -> Result<QuotaUsage, CoreError> {
        self.usage_row("identity_quota_usage", identity_id).await
    }

    async fn usage_row(&self, table: &str, owner_id: Uuid) -> Result<QuotaUsage, CoreError> {
        let query = format!(
            "INSERT INTO {table} (owner_id) VALUES ($1) ON CONFLICT (owner_id) DO NOTHING"
        );
        sqlx::query(&query).bind(owner_id).execute(self.pool.get_pool()).await?;

        let select = format!("SELECT * FROM {table} WHERE owner_id = $1");
        let usage = sqlx::query_as::<_, QuotaUsage>(&select)
            .bind(owner_id)
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(usage)
    }

    /// Atomic compare-and-add against both the KB's quota and the
    /// identity's global quota. Applies no changes and returns
    /// `quota_exceeded` if either limit would be crossed.
    pub async fn reserve(
        &self,
        identity_id: Uuid,
        kb_id: Uuid,
        kb_limits: (i64, i64, i64),
        identity_limits: (i64, i64, i64),
        delta_documents: i64,
        delta_chunks: i64,
        delta_bytes: i64,
    ) -> Result<(), CoreError> {
        let mut tx = self.pool.get_pool().begin().await?;

        for (table, owner_id, limits) in [
            ("kb_quota_usage", kb_id, kb_limits),
            ("identity_quota_usage", identity_id, identity_limits),
        ] {
            sqlx::query(&format!(
                "INSERT INTO {table} (owner_id) VALUES ($1) ON CONFLICT (owner_id) DO NOTHING"
            ))
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

            let update = format!(
                r#"UPDATE {table}
                   SET used_documents = used_documents + $2,
                       used_chunks = used_chunks + $3,
                       used_storage_bytes = used_storage_bytes + $4,
                       updated_at = now()
                   WHERE owner_id = $1
                     AND used_documents + $2 <= $5
                     AND used_chunks + $3 <= $6
                     AND used_storage_bytes + $4 <= $7"#
            );
            let result = sqlx::query(&update)
                .bind(owner_id)
                .bind(delta_documents)
                .bind(delta_chunks)
                .bind(delta_bytes)
                .bind(limits.0)
                .bind(limits.1)
                .bind(limits.2)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(CoreError::QuotaExceeded(format!(
                    "quota exceeded for {table} owner {owner_id}"
                )));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn release(
        &self,
        identity_id: Uuid,
        kb_id: Uuid,
        delta_documents: i64,
        delta_chunks: i64,
        delta_bytes: i64,
    ) -> Result<(), CoreError> {
        let mut tx = self.pool.get_pool().begin().await?;
        for (table, owner_id) in [("kb_quota_usage", kb_id), ("identity_quota_usage", identity_id)] {
            sqlx::query(&format!(
                r#"UPDATE {table}
                   SET used_documents = GREATEST(used_documents - $2, 0),
                       used_chunks = GREATEST(used_chunks - $3, 0),
                       used_storage_bytes = GREATEST(used_storage_bytes - $4, 0),
                       updated_at = now()
                   WHERE owner_id = $1"#
            ))
            .bind(owner_id)
            .bind(delta_documents)
            .bind(delta_chunks)
            .bind(delta_bytes)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
