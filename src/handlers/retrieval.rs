use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Identity;
use crate::retrieval::{GraphContext, RetrievalHit};
use crate::state::AppState;
use crate::utils::CoreError;

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub chatbot_id: Uuid,
    pub query: String,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub results: Vec<RetrievalHit>,
    pub graph: Option<GraphContext>,
    pub partial: bool,
}

/// `POST /v1/retrieve` — callable by the chat runtime on behalf of
/// whoever is asking the question; authorization always runs against
/// the caller's own identity, never the chatbot's.
pub async fn retrieve(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, CoreError> {
    let result = state.query.query(&identity, request.chatbot_id, request.query, request.conversation_id).await?;

    Ok(Json(RetrieveResponse { results: result.hits, graph: result.graph_context, partial: result.partial }))
}
