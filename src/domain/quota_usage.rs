use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Advisory usage counters. The same shape backs two tables: one
/// keyed by `kb_id` (a KB's own quota), one keyed by `identity_id`
/// (an identity's global quota) — reservation checks both per §4.7.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub owner_id: Uuid,
    pub used_documents: i64,
    pub used_chunks: i64,
    pub used_storage_bytes: i64,
    pub updated_at: DateTime<Utc>,
}
