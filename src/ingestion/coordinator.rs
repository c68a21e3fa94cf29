use std::sync::Arc;

use dashmap::DashMap;
use flume::{bounded, Sender};
use tracing::info;
use uuid::Uuid;

use crate::access::AccessController;
use crate::config::{IngestionConfig, PipelineCallConfig, QuotaDefaults, RagConfig};
use crate::database::{ChunkRepo, DbPool, DocumentRepo, EntityRepo, KbRepo};
use crate::domain::{Document, DocumentStatus, Identity};
use crate::embedding::EmbeddingService;
use crate::logging::{ActivityLog, ActivityLogger, ActivityType};
use crate::utils::CoreError;

use super::{pipeline_version_of, watchdog, worker};

/// Raw input handed to the coordinator at the HTTP/CLI boundary; the
/// object store (or an inline-text caller) has already resolved this
/// into bytes or text before this core ever sees it.
#[derive(Debug, Clone)]
pub enum IngestSource {
    Bytes { bytes: Vec<u8>, mime_type: String },
    InlineText { text: String },
}

impl IngestSource {
    fn approx_size(&self) -> i64 {
        match self {
            IngestSource::Bytes { bytes, .. } => bytes.len() as i64,
            IngestSource::InlineText { text } => text.len() as i64,
        }
    }

    fn mime_type(&self) -> &str {
        match self {
            IngestSource::Bytes { mime_type, .. } => mime_type,
            IngestSource::InlineText { .. } => "text/plain",
        }
    }
}

/// Shared state handed to every worker and the watchdog task; the
/// coordinator itself only ever touches it through `Arc` clones.
pub(crate) struct CoordinatorCtx {
    pub pool: DbPool,
    pub http: reqwest::Client,
    pub document_repo: DocumentRepo,
    pub chunk_repo: ChunkRepo,
    pub entity_repo: EntityRepo,
    pub kb_repo: KbRepo,
    pub access: Arc<AccessController>,
    pub embedding: Arc<EmbeddingService>,
    pub logger: ActivityLogger,
    pub pipeline_cfg: PipelineCallConfig,
    pub rag: RagConfig,
    pub quota_defaults: QuotaDefaults,
    pub ingestion_cfg: IngestionConfig,
    /// The in-process queue is not a distributed broker (see module
    /// docs): a job's source bytes live only here, keyed by document
    /// id, for the lifetime of this process.
    pub pending_sources: DashMap<Uuid, IngestSource>,
    pub sender: Sender<Uuid>,
}

/// Owns the bounded job queue (mirrors the donor's `ActivityLogger`
/// channel-plus-worker-pool shape) that turns a `create_document`
/// call into extracted, chunked, embedded, indexed chunks and
/// extracted entities.
pub struct IngestionCoordinator {
    ctx: Arc<CoordinatorCtx>,
}

impl IngestionCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: DbPool,
        http: reqwest::Client,
        document_repo: DocumentRepo,
        chunk_repo: ChunkRepo,
        entity_repo: EntityRepo,
        kb_repo: KbRepo,
        access: Arc<AccessController>,
        embedding: Arc<EmbeddingService>,
        logger: ActivityLogger,
        pipeline_cfg: PipelineCallConfig,
        rag: RagConfig,
        quota_defaults: QuotaDefaults,
        ingestion_cfg: IngestionConfig,
    ) -> Self {
        let (sender, receiver) = bounded(ingestion_cfg.queue_capacity);

        let ctx = Arc::new(CoordinatorCtx {
            pool,
            http,
            document_repo,
            chunk_repo,
            entity_repo,
            kb_repo,
            access,
            embedding,
            logger,
            pipeline_cfg,
            rag,
            quota_defaults,
            ingestion_cfg: ingestion_cfg.clone(),
            pending_sources: DashMap::new(),
            sender,
        });

        info!(
            workers = ingestion_cfg.worker_count,
            queue_capacity = ingestion_cfg.queue_capacity,
            lease_seconds = ingestion_cfg.lease_seconds,
            "starting ingestion coordinator"
        );

        for worker_id in 0..ingestion_cfg.worker_count {
            let ctx = ctx.clone();
            let receiver = receiver.clone();
            tokio::spawn(async move {
                worker::run(worker_id, ctx, receiver).await;
            });
        }

        {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                watchdog::run(ctx).await;
            });
        }

        Self { ctx }
    }

    /// Steps 1-4: authorize, reserve quota, persist a `pending` row,
    /// enqueue. The worker (see `worker::process`) carries out step 5
    /// onward asynchronously.
    pub async fn create_document(
        &self,
        identity: &Identity,
        kb_id: Uuid,
        title: &str,
        source: IngestSource,
        metadata: serde_json::Value,
    ) -> Result<Document, CoreError> {
        if let IngestSource::Bytes { bytes, mime_type } = &source {
            if bytes.len() > crate::document::MAX_UPLOAD_BYTES {
                return Err(CoreError::PayloadTooLarge(format!(
                    "{} bytes exceeds the {} byte limit",
                    bytes.len(),
                    crate::document::MAX_UPLOAD_BYTES
                )));
            }
            crate::document::sniff_and_validate(bytes, mime_type)?;
        }

        let kb = self.ctx.kb_repo.get(kb_id).await?;
        if !self.ctx.access.can_write_kb(identity, &kb).await? {
            return Err(CoreError::PermissionDenied(format!(
                "identity {} cannot write to knowledge base {kb_id}",
                identity.id
            )));
        }

        let size_bytes = source.approx_size();
        self.ctx.access.reserve(identity, &kb, &self.ctx.quota_defaults, 1, 0, size_bytes).await?;

        let pipeline_version = pipeline_version_of(&kb.pipeline.0);
        let mime_type = source.mime_type().to_string();

        let document = match self
            .ctx
            .document_repo
            .insert_pending(kb_id, Some(identity.id), title, "0", size_bytes, &mime_type, &metadata, &pipeline_version)
            .await
        {
            Ok(doc) => doc,
            Err(e) => {
                let _ = self.ctx.access.release(identity.id, kb_id, 1, 0, size_bytes).await;
                return Err(e);
            }
        };

        self.ctx.pending_sources.insert(document.id, source);

        if self.ctx.sender.try_send(document.id).is_err() {
            self.ctx.pending_sources.remove(&document.id);
            let _ = self
                .ctx
                .document_repo
                .try_transition(document.id, DocumentStatus::Pending, DocumentStatus::Failed, Some("ingestion queue is full"))
                .await;
            let _ = self.ctx.access.release(identity.id, kb_id, 1, 0, size_bytes).await;
            return Err(CoreError::IndexUnavailable("ingestion queue is full".into()));
        }

        self.ctx.logger.log(
            ActivityLog::builder(ActivityType::DocumentReceived)
                .identity(identity.id)
                .kb(kb_id)
                .document(document.id)
                .build(),
        );

        Ok(document)
    }

    pub async fn get_document(&self, identity: &Identity, document_id: Uuid) -> Result<Document, CoreError> {
        let document = self.ctx.document_repo.get(document_id).await?;
        let kb = self.ctx.kb_repo.get(document.kb_id).await?;
        if !self.ctx.access.can_read_document(identity, &document, &kb).await? {
            return Err(CoreError::PermissionDenied(format!(
                "identity {} cannot read document {document_id}",
                identity.id
            )));
        }
        Ok(document)
    }

    pub async fn list_documents(
        &self,
        identity: &Identity,
        kb_id: Uuid,
        status: Option<DocumentStatus>,
    ) -> Result<Vec<Document>, CoreError> {
        let kb = self.ctx.kb_repo.get(kb_id).await?;
        if !self.ctx.access.can_read_kb(identity, &kb).await? {
            return Err(CoreError::PermissionDenied(format!(
                "identity {} cannot read knowledge base {kb_id}",
                identity.id
            )));
        }
        let docs = self.ctx.document_repo.list_for_kb(kb_id).await?;
        Ok(match status {
            Some(s) => docs.into_iter().filter(|d| d.status == s).collect(),
            None => docs,
        })
    }

    /// Deletes one document, its chunks, and releases the quota it
    /// held. Entity mentions and relationships are left in place: an
    /// entity can be named by several documents, and this core has no
    /// reference-counted teardown for the knowledge graph.
    pub async fn delete_document(&self, identity: &Identity, document_id: Uuid) -> Result<(), CoreError> {
        let document = self.ctx.document_repo.get(document_id).await?;
        let kb = self.ctx.kb_repo.get(document.kb_id).await?;
        if !self.ctx.access.can_write_document(identity, &document, &kb).await? {
            return Err(CoreError::PermissionDenied(format!(
                "identity {} cannot delete document {document_id}",
                identity.id
            )));
        }

        self.ctx.pending_sources.remove(&document_id);
        let chunk_count = self.ctx.chunk_repo.count_for_document(document_id).await?;
        self.ctx.chunk_repo.delete_for_document(document_id).await?;
        self.ctx.document_repo.delete(document_id).await?;
        let _ = self
            .ctx
            .access
            .release(identity.id, kb.id, 1, chunk_count, document.size_bytes)
            .await;

        self.ctx.logger.log(
            ActivityLog::builder(ActivityType::DocumentDeleted)
                .identity(identity.id)
                .kb(kb.id)
                .document(document_id)
                .build(),
        );
        Ok(())
    }

    /// Bulk delete by status, the coordinator-side half of `DELETE
    /// /v1/kb/:kb_id/documents`. `status = None` deletes every
    /// document in the knowledge base.
    pub async fn delete_documents_by_status(
        &self,
        identity: &Identity,
        kb_id: Uuid,
        status: Option<DocumentStatus>,
    ) -> Result<u64, CoreError> {
        let kb = self.ctx.kb_repo.get(kb_id).await?;
        if !self.ctx.access.can_write_kb(identity, &kb).await? {
            return Err(CoreError::PermissionDenied(format!(
                "identity {} cannot delete documents in knowledge base {kb_id}",
                identity.id
            )));
        }

        let docs = self.ctx.document_repo.list_for_kb(kb_id).await?;
        let mut deleted = 0u64;
        for doc in docs.into_iter().filter(|d| status.map_or(true, |s| d.status == s)) {
            self.ctx.pending_sources.remove(&doc.id);
            let chunk_count = self.ctx.chunk_repo.count_for_document(doc.id).await?;
            self.ctx.chunk_repo.delete_for_document(doc.id).await?;
            self.ctx.document_repo.delete(doc.id).await?;
            let _ = self
                .ctx
                .access
                .release(identity.id, kb_id, 1, chunk_count, doc.size_bytes)
                .await;
            deleted += 1;
        }
        Ok(deleted)
    }

    pub fn queue_len(&self) -> usize {
        self.ctx.sender.len()
    }

    pub fn is_queue_full(&self) -> bool {
        self.ctx.sender.is_full()
    }
}
