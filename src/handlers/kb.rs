use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ChunkPolicy, Identity, KnowledgeBase, PipelineConfig, Quota, Visibility};
use crate::state::AppState;
use crate::utils::CoreError;

#[derive(Debug, Deserialize)]
pub struct CreateKbRequest {
    pub name: String,
    pub description: Option<String>,
    pub collection_id: Option<Uuid>,
    pub visibility: Visibility,
    #[serde(default = "default_chunk_policy")]
    pub chunk_policy: ChunkPolicy,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub quota: Option<Quota>,
}

fn default_chunk_policy() -> ChunkPolicy {
    ChunkPolicy { size: 512, overlap: 50, strategy: crate::domain::ChunkStrategy::Recursive }
}

/// `POST /v1/kb` — owner-scoped knowledge bases only; collection-scoped
/// ones go through the CLI's `kb create --collection` path, which also
/// checks collection membership before calling the same repository.
pub async fn create_kb(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<CreateKbRequest>,
) -> Result<Json<KnowledgeBase>, CoreError> {
    let quota = request.quota.unwrap_or(Quota {
        max_documents: state.settings.quota_defaults.max_documents,
        max_chunks: state.settings.quota_defaults.max_chunks,
        max_storage_bytes: state.settings.quota_defaults.max_storage_bytes,
    });

    let owner_id = if request.collection_id.is_none() { Some(identity.id) } else { None };
    if request.visibility == Visibility::Private && owner_id.is_none() {
        return Err(CoreError::ValidationError("private visibility requires an owner-scoped knowledge base".into()));
    }

    let kb = state
        .kb_repo
        .create(
            &request.name,
            request.description.as_deref(),
            owner_id,
            request.collection_id,
            request.visibility,
            &request.chunk_policy,
            &request.pipeline,
            &quota,
            None,
        )
        .await?;

    Ok(Json(kb))
}

pub async fn get_kb(
    State(state): State<AppState>,
    identity: Identity,
    Path(kb_id): Path<Uuid>,
) -> Result<Json<KnowledgeBase>, CoreError> {
    let kb = state.kb_repo.get(kb_id).await?;
    if !state.access.can_read_kb(&identity, &kb).await? {
        return Err(CoreError::PermissionDenied(format!("identity {} cannot read knowledge base {kb_id}", identity.id)));
    }
    Ok(Json(kb))
}

#[derive(Debug, Serialize)]
pub struct DeleteKbResponse {
    pub deleted: bool,
}

pub async fn delete_kb(
    State(state): State<AppState>,
    identity: Identity,
    Path(kb_id): Path<Uuid>,
) -> Result<Json<DeleteKbResponse>, CoreError> {
    let kb = state.kb_repo.get(kb_id).await?;
    if !state.access.can_write_kb(&identity, &kb).await? {
        return Err(CoreError::PermissionDenied(format!("identity {} cannot delete knowledge base {kb_id}", identity.id)));
    }
    state.kb_repo.delete(kb_id).await?;
    Ok(Json(DeleteKbResponse { deleted: true }))
}
