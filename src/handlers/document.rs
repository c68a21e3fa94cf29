use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Document, DocumentStatus, Identity};
use crate::ingestion::IngestSource;
use crate::state::AppState;
use crate::utils::CoreError;

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct CreateDocumentResponse {
    pub document_id: Uuid,
    pub status: DocumentStatus,
}

/// `POST /v1/kb/:kb_id/documents` — inline-text ingestion, the JSON
/// counterpart to the multipart upload route.
pub async fn create_document(
    State(state): State<AppState>,
    identity: Identity,
    Path(kb_id): Path<Uuid>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<Json<CreateDocumentResponse>, CoreError> {
    let document = state
        .ingestion
        .create_document(
            &identity,
            kb_id,
            &request.title,
            IngestSource::InlineText { text: request.content },
            request.metadata,
        )
        .await?;

    Ok(Json(CreateDocumentResponse { document_id: document.id, status: document.status }))
}

#[derive(Debug, Serialize)]
pub struct UploadDocumentResponse {
    pub document_id: Uuid,
    pub mime_type: String,
    pub status: DocumentStatus,
}

/// `POST /v1/kb/:kb_id/documents/upload` — the `multipart/form-data`
/// counterpart, taking a `file` field plus optional `title`/`mime`/
/// `metadata` fields. Extraction runs asynchronously, so the response
/// carries pending status rather than an extracted length.
pub async fn upload_document(
    State(state): State<AppState>,
    identity: Identity,
    Path(kb_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadDocumentResponse>, CoreError> {
    let mut title: Option<String> = None;
    let mut mime_type: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;
    let mut metadata = serde_json::Value::Object(Default::default());

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CoreError::ValidationError(format!("malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or("") {
            "title" => {
                title = Some(field.text().await.map_err(|e| CoreError::ValidationError(e.to_string()))?);
            }
            "metadata" => {
                let text = field.text().await.map_err(|e| CoreError::ValidationError(e.to_string()))?;
                metadata = serde_json::from_str(&text)
                    .map_err(|e| CoreError::ValidationError(format!("metadata must be JSON: {e}")))?;
            }
            "file" => {
                mime_type = field.content_type().map(|s| s.to_string());
                let filename = field.file_name().map(|s| s.to_string());
                bytes = Some(field.bytes().await.map_err(|e| CoreError::ValidationError(e.to_string()))?.to_vec());
                if title.is_none() {
                    title = filename;
                }
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| CoreError::ValidationError("file field is required".into()))?;
    let mime_type = mime_type.ok_or_else(|| CoreError::ValidationError("file field must carry a content-type".into()))?;
    let title = title.ok_or_else(|| CoreError::ValidationError("title is required".into()))?;

    let document = state
        .ingestion
        .create_document(&identity, kb_id, &title, IngestSource::Bytes { bytes, mime_type: mime_type.clone() }, metadata)
        .await?;

    Ok(Json(UploadDocumentResponse { document_id: document.id, mime_type, status: document.status }))
}

/// `GET /v1/kb/:kb_id/documents/:id`
pub async fn get_document(
    State(state): State<AppState>,
    identity: Identity,
    Path((_kb_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Document>, CoreError> {
    let document = state.ingestion.get_document(&identity, document_id).await?;
    Ok(Json(document))
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    pub status: Option<DocumentStatus>,
}

/// `GET /v1/kb/:kb_id/documents`
pub async fn list_documents(
    State(state): State<AppState>,
    identity: Identity,
    Path(kb_id): Path<Uuid>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<Vec<Document>>, CoreError> {
    let docs = state.ingestion.list_documents(&identity, kb_id, query.status).await?;
    Ok(Json(docs))
}

#[derive(Debug, Serialize)]
pub struct DeleteDocumentsResponse {
    pub deleted_count: u64,
}

/// `DELETE /v1/kb/:kb_id/documents` — bulk delete-by-filter; the only
/// filter this core defines over documents is status.
pub async fn delete_documents(
    State(state): State<AppState>,
    identity: Identity,
    Path(kb_id): Path<Uuid>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<DeleteDocumentsResponse>, CoreError> {
    let deleted_count = state.ingestion.delete_documents_by_status(&identity, kb_id, query.status).await?;
    Ok(Json(DeleteDocumentsResponse { deleted_count }))
}

/// `DELETE /v1/kb/:kb_id/documents/:id`
pub async fn delete_document(
    State(state): State<AppState>,
    identity: Identity,
    Path((_kb_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCodeOk, CoreError> {
    state.ingestion.delete_document(&identity, document_id).await?;
    Ok(StatusCodeOk)
}

/// A unit response that serializes to an empty `204 No Content` body.
pub struct StatusCodeOk;

impl axum::response::IntoResponse for StatusCodeOk {
    fn into_response(self) -> axum::response::Response {
        axum::http::StatusCode::NO_CONTENT.into_response()
    }
}
