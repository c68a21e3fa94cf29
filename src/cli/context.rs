use std::sync::Arc;

use anyhow::Result;

use crate::access::AccessController;
use crate::auth::JwtManager;
use crate::config::Settings;
use crate::database::{AccessRepo, ChatbotRepo, ChunkRepo, DbPool, DocumentRepo, EntityRepo, KbRepo};
use crate::domain::{Identity, IdentityRole};
use crate::embedding::{EmbeddingService, HttpEmbeddingProvider};
use crate::ingestion::IngestionCoordinator;
use crate::logging::{ActivityLogger, LoggerConfig};
use crate::query::QueryCoordinator;
use crate::retrieval::RetrievalEngine;
use crate::utils::{CoreError, Limiters};
use uuid::Uuid;

/// Everything an invocation of the `kb` binary needs, built once per
/// process the same way the HTTP server builds `AppState` — the CLI is
/// a thin client over the same coordinators, not a separate code path.
pub struct CliContext {
    pub settings: Settings,
    pub jwt_manager: JwtManager,
    pub kb_repo: KbRepo,
    pub document_repo: DocumentRepo,
    pub chunk_repo: ChunkRepo,
    pub entity_repo: EntityRepo,
    pub chatbot_repo: ChatbotRepo,
    pub access: Arc<AccessController>,
    pub embedding: Arc<EmbeddingService>,
    pub ingestion: Arc<IngestionCoordinator>,
    pub query: Arc<QueryCoordinator>,
}

impl CliContext {
    pub async fn build(settings: Settings) -> Result<Self> {
        let db_pool = DbPool::connect(&settings.database).await?;
        db_pool.migrate().await?;

        let kb_repo = KbRepo::new(db_pool.clone());
        let document_repo = DocumentRepo::new(db_pool.clone());
        let chunk_repo = ChunkRepo::new(db_pool.clone());
        let entity_repo = EntityRepo::new(db_pool.clone());
        let chatbot_repo = ChatbotRepo::new(db_pool.clone());
        let access_repo = AccessRepo::new(db_pool.clone());
        let access = Arc::new(AccessController::new(kb_repo.clone(), access_repo));

        let limiters = Arc::new(Limiters::new(&settings.limits));
        let provider = Arc::new(HttpEmbeddingProvider::new(&settings.embedding));
        let embedding = Arc::new(EmbeddingService::new(provider, limiters, settings.embedding.batch_size));

        let logger = ActivityLogger::new(db_pool.get_pool().clone(), LoggerConfig::default());

        let ingestion = Arc::new(IngestionCoordinator::new(
            db_pool.clone(),
            reqwest::Client::new(),
            document_repo.clone(),
            chunk_repo.clone(),
            entity_repo.clone(),
            kb_repo.clone(),
            access.clone(),
            embedding.clone(),
            logger.clone(),
            settings.pipeline.clone(),
            settings.rag.clone(),
            settings.quota_defaults.clone(),
            settings.ingestion.clone(),
        ));

        let engine = Arc::new(RetrievalEngine::new(
            chatbot_repo.clone(),
            chunk_repo.clone(),
            entity_repo.clone(),
            kb_repo.clone(),
            access.clone(),
            embedding.clone(),
            settings.rag.clone(),
        ));
        let query = Arc::new(QueryCoordinator::new(engine, logger));

        let jwt_manager = JwtManager::new(&settings.security.jwt_secret, settings.security.jwt_expiration_seconds);

        Ok(Self {
            settings,
            jwt_manager,
            kb_repo,
            document_repo,
            chunk_repo,
            entity_repo,
            chatbot_repo,
            access,
            embedding,
            ingestion,
            query,
        })
    }

    /// Resolves the caller identity a subcommand should act as. A
    /// `--token` flag is verified the same way the HTTP middleware
    /// verifies one; without it, the CLI acts as the trusted operator
    /// identity, matching its role as an administrative surface run
    /// next to the database rather than over the network.
    pub fn identity(&self, token: Option<&str>) -> Result<Identity, CoreError> {
        resolve_identity(&self.jwt_manager, token)
    }
}

fn resolve_identity(jwt_manager: &JwtManager, token: Option<&str>) -> Result<Identity, CoreError> {
    match token {
        None => Ok(Identity::service()),
        Some(token) => {
            let claims = jwt_manager
                .validate_token(token)
                .map_err(|e| CoreError::PermissionDenied(format!("invalid token: {e}")))?;
            let id = Uuid::parse_str(&claims.sub)
                .map_err(|e| CoreError::ValidationError(format!("token subject is not a uuid: {e}")))?;
            let role = match claims.role.as_str() {
                "viewer" => IdentityRole::Viewer,
                "editor" => IdentityRole::Editor,
                "owner" => IdentityRole::Owner,
                "admin" => IdentityRole::Admin,
                "service" => IdentityRole::Service,
                other => return Err(CoreError::ValidationError(format!("unknown role: {other}"))),
            };
            Ok(Identity { id, role, exp: claims.exp as i64 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret", 3600)
    }

    #[test]
    fn no_token_resolves_to_the_trusted_service_identity() {
        let identity = resolve_identity(&manager(), None).unwrap();
        assert_eq!(identity.role, IdentityRole::Service);
        assert!(identity.role.is_superuser());
    }

    #[test]
    fn valid_token_round_trips_subject_and_role() {
        let jwt = manager();
        let id = Uuid::new_v4();
        let token = jwt.generate_token(id, "editor").unwrap();

        let identity = resolve_identity(&jwt, Some(&token)).unwrap();
        assert_eq!(identity.id, id);
        assert_eq!(identity.role, IdentityRole::Editor);
    }

    #[test]
    fn token_signed_with_a_different_secret_is_rejected() {
        let jwt = manager();
        let other = JwtManager::new("a-different-secret", 3600);
        let token = other.generate_token(Uuid::new_v4(), "owner").unwrap();

        let err = resolve_identity(&jwt, Some(&token)).unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied(_)));
    }

    #[test]
    fn unknown_role_in_an_otherwise_valid_token_is_a_validation_error() {
        let jwt = manager();
        let token = jwt.generate_token(Uuid::new_v4(), "superadmin").unwrap();

        let err = resolve_identity(&jwt, Some(&token)).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }
}
