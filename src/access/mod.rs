use uuid::Uuid;

use crate::config::QuotaDefaults;
use crate::database::{AccessRepo, KbRepo};
use crate::domain::{Document, Identity, KnowledgeBase, MemberRole, QuotaUsage, TargetKind, Visibility};
use crate::utils::CoreError;

/// The single authoritative decision point for read/write access and
/// quota reservation. A per-statement RLS policy is expected to agree
/// with this controller, but this controller is what the API surface
/// and CLI consult, not the database session's role.
pub struct AccessController {
    kb_repo: KbRepo,
    access_repo: AccessRepo,
}

impl AccessController {
    pub fn new(kb_repo: KbRepo, access_repo: AccessRepo) -> Self {
        Self { kb_repo, access_repo }
    }

    async fn effective_kb_role(&self, identity: &Identity, kb: &KnowledgeBase) -> Result<Option<MemberRole>, CoreError> {
        let mut best: Option<MemberRole> = None;

        if kb.owner_id == Some(identity.id) {
            best = Some(MemberRole::Owner);
        }
        if let Some(permission) = self.access_repo.find(identity.id, kb.id, TargetKind::Kb).await? {
            best = Some(best.map_or(permission.role, |b| b.max(permission.role)));
        }
        if let Some(collection_id) = kb.collection_id {
            if let Some(role) = self.kb_repo.member_role(collection_id, identity.id).await? {
                best = Some(best.map_or(role, |b| b.max(role)));
            }
        }
        Ok(best)
    }

    async fn effective_document_role(&self, identity: &Identity, document: &Document) -> Result<Option<MemberRole>, CoreError> {
        if document.owner_id == Some(identity.id) {
            return Ok(Some(MemberRole::Owner));
        }
        let permission = self.access_repo.find(identity.id, document.id, TargetKind::Document).await?;
        Ok(permission.map(|p| p.role))
    }

    pub async fn can_read_kb(&self, identity: &Identity, kb: &KnowledgeBase) -> Result<bool, CoreError> {
        if identity.role.is_superuser() {
            return Ok(true);
        }
        if kb.visibility == Visibility::Public {
            return Ok(true);
        }
        Ok(self.effective_kb_role(identity, kb).await?.is_some())
    }

    pub async fn can_write_kb(&self, identity: &Identity, kb: &KnowledgeBase) -> Result<bool, CoreError> {
        if identity.role.is_superuser() {
            return Ok(true);
        }
        Ok(self.effective_kb_role(identity, kb).await?.is_some_and(|role| role.can_write()))
    }

    /// A direct grant on the document (any role) is sufficient to
    /// read it; absent one, read access falls back to the parent KB,
    /// unless the document's metadata scopes it to a different
    /// identity (per-conversation uploads a chatbot should not see
    /// each other's).
    pub async fn can_read_document(&self, identity: &Identity, document: &Document, kb: &KnowledgeBase) -> Result<bool, CoreError> {
        if identity.role.is_superuser() {
            return Ok(true);
        }
        if self.effective_document_role(identity, document).await?.is_some() {
            return Ok(true);
        }
        if !self.can_read_kb(identity, kb).await? {
            return Ok(false);
        }
        Ok(match document.metadata_user_id() {
            None => true,
            Some(owner) => owner == identity.id.to_string(),
        })
    }

    pub async fn can_write_document(&self, identity: &Identity, document: &Document, kb: &KnowledgeBase) -> Result<bool, CoreError> {
        if identity.role.is_superuser() {
            return Ok(true);
        }
        if self.effective_document_role(identity, document).await?.is_some_and(|role| role.can_write()) {
            return Ok(true);
        }
        if !self.can_write_kb(identity, kb).await? {
            return Ok(false);
        }
        Ok(match document.metadata_user_id() {
            None => true,
            Some(owner) => owner == identity.id.to_string(),
        })
    }

    /// A chunk's access follows its parent document exactly; there is
    /// no chunk-level permission row.
    pub async fn can_read_chunk(&self, identity: &Identity, document: &Document, kb: &KnowledgeBase) -> Result<bool, CoreError> {
        self.can_read_document(identity, document, kb).await
    }

    pub async fn reserve(
        &self,
        identity: &Identity,
        kb: &KnowledgeBase,
        quota_defaults: &QuotaDefaults,
        delta_documents: i64,
        delta_chunks: i64,
        delta_bytes: i64,
    ) -> Result<(), CoreError> {
        self.access_repo
            .reserve(
                identity.id,
                kb.id,
                (kb.quota.max_documents, kb.quota.max_chunks, kb.quota.max_storage_bytes),
                (quota_defaults.max_documents, quota_defaults.max_chunks, quota_defaults.max_storage_bytes),
                delta_documents,
                delta_chunks,
                delta_bytes,
            )
            .await
    }

    pub async fn release(
        &self,
        identity_id: Uuid,
        kb_id: Uuid,
        delta_documents: i64,
        delta_chunks: i64,
        delta_bytes: i64,
    ) -> Result<(), CoreError> {
        self.access_repo.release(identity_id, kb_id, delta_documents, delta_chunks, delta_bytes).await
    }

    pub async fn kb_usage(&self, kb_id: Uuid) -> Result<QuotaUsage, CoreError> {
        self.access_repo.kb_usage(kb_id).await
    }
}
