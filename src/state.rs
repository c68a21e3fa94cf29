use std::sync::Arc;

use crate::access::AccessController;
use crate::auth::JwtManager;
use crate::config::Settings;
use crate::database::{ChatbotRepo, ChunkRepo, DbPool, DocumentRepo, EntityRepo, KbRepo};
use crate::embedding::EmbeddingService;
use crate::ingestion::IngestionCoordinator;
use crate::logging::ActivityLogger;
use crate::query::QueryCoordinator;
use crate::utils::Limiters;

/// Application state shared across every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub settings: Settings,
    pub jwt_manager: Arc<JwtManager>,
    pub limiters: Arc<Limiters>,
    pub kb_repo: KbRepo,
    pub document_repo: DocumentRepo,
    pub chunk_repo: ChunkRepo,
    pub entity_repo: EntityRepo,
    pub chatbot_repo: ChatbotRepo,
    pub access: Arc<AccessController>,
    pub embedding: Arc<EmbeddingService>,
    pub ingestion: Arc<IngestionCoordinator>,
    pub query: Arc<QueryCoordinator>,
    pub activity_logger: ActivityLogger,
}
