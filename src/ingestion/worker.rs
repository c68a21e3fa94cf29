use std::collections::HashMap;
use std::sync::Arc;

use flume::Receiver;
use pgvector::Vector;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chunker;
use crate::domain::{Chunk, DocumentStatus, Identity, IdentityRole};
use crate::entities;
use crate::logging::{ActivityLog, ActivityStatus, ActivityType};
use crate::pipeline;
use crate::utils::CoreError;

use super::coordinator::{CoordinatorCtx, IngestSource};
use super::content_hash;

/// Tracks how much quota this attempt has reserved so a failure at
/// any point releases exactly what was taken, no more and no less.
struct Reserved {
    documents: i64,
    chunks: i64,
    bytes: i64,
}

pub(crate) async fn run(worker_id: usize, ctx: Arc<CoordinatorCtx>, receiver: Receiver<Uuid>) {
    info!("ingestion worker {} started", worker_id);
    loop {
        match receiver.recv_async().await {
            Ok(document_id) => {
                if let Err(e) = process(&ctx, document_id).await {
                    error!(worker_id, document_id = %document_id, error = %e, "ingestion job failed");
                }
            }
            Err(_) => {
                info!("ingestion worker {} shutting down (channel closed)", worker_id);
                return;
            }
        }
    }
}

/// A synthetic caller used only for quota bookkeeping once processing
/// has moved past the HTTP/CLI boundary; only its `id` is consulted.
fn owner_identity(owner_id: Option<Uuid>) -> Identity {
    Identity { id: owner_id.unwrap_or_else(Uuid::nil), role: IdentityRole::Owner, exp: i64::MAX }
}

pub(crate) async fn process(ctx: &Arc<CoordinatorCtx>, document_id: Uuid) -> Result<(), CoreError> {
    let document = ctx.document_repo.get(document_id).await?;

    match document.status {
        DocumentStatus::Indexed | DocumentStatus::Failed => return Ok(()),
        DocumentStatus::Pending => {
            if !ctx
                .document_repo
                .try_transition(document_id, DocumentStatus::Pending, DocumentStatus::Processing, None)
                .await?
            {
                // Another worker already claimed it.
                return Ok(());
            }
        }
        DocumentStatus::Processing => {
            // Resuming a job the watchdog reclaimed.
        }
    }

    let Some(source) = ctx.pending_sources.get(&document_id).map(|r| r.value().clone()) else {
        return fail(ctx, &document, Reserved { documents: 1, chunks: 0, bytes: document.size_bytes }, "ingest source no longer available (worker restarted?)").await;
    };

    let kb = match ctx.kb_repo.get(document.kb_id).await {
        Ok(kb) => kb,
        Err(e) => {
            return fail(ctx, &document, Reserved { documents: 1, chunks: 0, bytes: document.size_bytes }, &e.to_string()).await;
        }
    };

    let mut reserved = Reserved { documents: 1, chunks: 0, bytes: document.size_bytes };

    let extraction = match &source {
        IngestSource::Bytes { bytes, mime_type } => crate::document::extract(bytes, mime_type).map(|e| {
            (e.text, serde_json::json!({ "page_count": e.metadata.page_count, "sheet_names": e.metadata.sheet_names }))
        }),
        IngestSource::InlineText { text } => Ok((text.clone(), serde_json::json!({}))),
    };
    let (extracted_text, extraction_fields) = match extraction {
        Ok(pair) => pair,
        Err(e) => return fail(ctx, &document, reserved, &e.to_string()).await,
    };

    // Format metadata (page count, sheet names) layers on top of
    // whatever the caller attached at upload time, so a `user_id`
    // scoping key set on create survives into the indexed document
    // and every chunk cut from it.
    let mut extracted_metadata = document.metadata.0.clone();
    if let (Some(base), Some(fields)) = (extracted_metadata.as_object_mut(), extraction_fields.as_object()) {
        base.extend(fields.clone());
    }

    let hash = content_hash(&extracted_text);
    if let Ok(Some(existing)) = ctx.document_repo.find_by_content_hash(document.kb_id, &hash).await {
        if existing.id != document.id && existing.title == document.title && existing.pipeline_version == document.pipeline_version {
            ctx.pending_sources.remove(&document_id);
            return fail(ctx, &document, reserved, &format!("duplicate of document {}", existing.id)).await;
        }
    }

    let transformed = match pipeline::transform(ctx.pool.get_pool(), &ctx.http, &ctx.pipeline_cfg, &kb.pipeline.0, &extracted_text, &extracted_metadata).await {
        Ok(output) => output,
        Err(e) => return fail(ctx, &document, reserved, &e.to_string()).await,
    };

    if let Err(e) = ctx.document_repo.set_extracted(document_id, &hash, transformed.text.len() as i64, &transformed.metadata).await {
        return fail(ctx, &document, reserved, &e.to_string()).await;
    }

    if transformed.text.trim().is_empty() {
        ctx.pending_sources.remove(&document_id);
        ctx.document_repo.try_transition(document_id, DocumentStatus::Processing, DocumentStatus::Indexed, None).await?;
        ctx.logger.log(
            ActivityLog::builder(ActivityType::DocumentIndexed)
                .status(ActivityStatus::Info)
                .kb(document.kb_id)
                .document(document_id)
                .detail(serde_json::json!({"chunks": 0}))
                .build(),
        );
        return Ok(());
    }

    let policy = transformed
        .chunking_override
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_else(|| kb.chunk_policy.0.clone());

    let spans = chunker::chunk(&transformed.text, &policy);
    if let Err(e) = ctx.chunk_repo.delete_for_document(document_id).await {
        return fail(ctx, &document, reserved, &e.to_string()).await;
    }

    let chunks: Vec<Chunk> = spans
        .iter()
        .enumerate()
        .map(|(ordinal, span)| Chunk {
            id: Uuid::new_v4(),
            document_id,
            kb_id: document.kb_id,
            ordinal: ordinal as i32,
            text: span.text.clone(),
            embedding: None,
            embedding_model: None,
            metadata: sqlx::types::Json(transformed.metadata.clone()),
            created_at: chrono::Utc::now(),
        })
        .collect();

    let owner = owner_identity(document.owner_id);
    if let Err(e) = ctx.access.reserve(&owner, &kb, &ctx.quota_defaults, 0, chunks.len() as i64, 0).await {
        return fail(ctx, &document, reserved, &e.to_string()).await;
    }
    reserved.chunks = chunks.len() as i64;

    if let Err(e) = ctx.chunk_repo.insert_all(&chunks).await {
        return fail(ctx, &document, reserved, &e.to_string()).await;
    }

    if let Err(e) = ctx.embedding.ensure_model_compatible(kb.embedding_model.as_deref()) {
        return fail(ctx, &document, reserved, &e.to_string()).await;
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = match embed_with_retries(ctx, &texts).await {
        Ok(v) => v,
        Err(e) => return fail(ctx, &document, reserved, &e.to_string()).await,
    };

    for (chunk, embedding) in chunks.iter().zip(embeddings.into_iter()) {
        if let Err(e) = ctx.chunk_repo.set_embedding(chunk.id, Vector::from(embedding), ctx.embedding.model()).await {
            return fail(ctx, &document, reserved, &e.to_string()).await;
        }
    }
    let _ = ctx.kb_repo.lock_embedding_model(kb.id, ctx.embedding.model()).await;

    let detect_tables = kb.pipeline.0.kind != crate::domain::PipelineKind::None;
    let (extracted_entities, relationships) = entities::extract(&transformed.text, detect_tables);

    let mut name_to_id: HashMap<String, Uuid> = HashMap::new();
    for candidate in &extracted_entities {
        match ctx
            .entity_repo
            .upsert(document.kb_id, candidate.entity_type, &candidate.name, &candidate.canonical_name, &candidate.aliases)
            .await
        {
            Ok(entity) => {
                name_to_id.insert(candidate.name.to_lowercase(), entity.id);
                let _ = ctx
                    .entity_repo
                    .upsert_mention(document_id, entity.id, candidate.offset as i32, candidate.salience, &candidate.context_snippet)
                    .await;
            }
            Err(e) => {
                warn!(document_id = %document_id, error = %e, "entity upsert failed, continuing without it");
            }
        }
    }

    for relationship in &relationships {
        let (Some(&source_id), Some(&target_id)) =
            (name_to_id.get(&relationship.source_name.to_lowercase()), name_to_id.get(&relationship.target_name.to_lowercase()))
        else {
            continue;
        };
        let _ = ctx
            .entity_repo
            .upsert_relationship(document.kb_id, source_id, target_id, &relationship.relationship_type, relationship.direction, Some(relationship.confidence))
            .await;
    }

    ctx.pending_sources.remove(&document_id);
    ctx.document_repo.try_transition(document_id, DocumentStatus::Processing, DocumentStatus::Indexed, None).await?;
    ctx.logger.log(
        ActivityLog::builder(ActivityType::DocumentIndexed)
            .kb(document.kb_id)
            .document(document_id)
            .detail(serde_json::json!({"chunks": chunks.len(), "entities": extracted_entities.len()}))
            .build(),
    );
    Ok(())
}

/// Retries the whole batch with exponential backoff bounded by
/// `embed_max_attempts`; `EmbeddingService` already retries individual
/// HTTP calls, so this layer only covers a batch-wide outage.
async fn embed_with_retries(ctx: &Arc<CoordinatorCtx>, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
    let mut attempt = 0;
    loop {
        match ctx.embedding.embed_batch(texts).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt + 1 >= ctx.ingestion_cfg.embed_max_attempts => return Err(e),
            Err(e) => {
                attempt += 1;
                warn!(attempt, error = %e, "embedding batch failed, retrying");
                let delay_ms = 250u64.saturating_mul(1u64 << attempt.min(8));
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

async fn fail(ctx: &Arc<CoordinatorCtx>, document: &crate::domain::Document, reserved: Reserved, message: &str) -> Result<(), CoreError> {
    let owner = owner_identity(document.owner_id);
    let _ = ctx.access.release(owner.id, document.kb_id, reserved.documents, reserved.chunks, reserved.bytes).await;

    let _ = ctx
        .document_repo
        .try_transition(document.id, DocumentStatus::Processing, DocumentStatus::Failed, Some(message))
        .await;

    ctx.logger.log(ActivityLog::builder(ActivityType::DocumentFailed).kb(document.kb_id).document(document.id).error(message).build());
    Ok(())
}
