use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use clap::Parser;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use fluxbase_rag_core::access::AccessController;
use fluxbase_rag_core::auth::{self, JwtManager};
use fluxbase_rag_core::cli::{dispatch, Cli, CliContext};
use fluxbase_rag_core::config::Settings;
use fluxbase_rag_core::database::{AccessRepo, ChatbotRepo, ChunkRepo, DbPool, DocumentRepo, EntityRepo, KbRepo};
use fluxbase_rag_core::embedding::{EmbeddingService, HttpEmbeddingProvider};
use fluxbase_rag_core::handlers;
use fluxbase_rag_core::ingestion::IngestionCoordinator;
use fluxbase_rag_core::logging::{ActivityLogger, LoggerConfig};
use fluxbase_rag_core::query::QueryCoordinator;
use fluxbase_rag_core::retrieval::RetrievalEngine;
use fluxbase_rag_core::state::AppState;
use fluxbase_rag_core::utils::Limiters;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info,fluxbase_rag_core=debug".to_string()))
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    let settings = Settings::load()?;

    // The binary doubles as an admin CLI: absent a recognized
    // subcommand (or with none at all) it starts the HTTP server;
    // any other first argument is handed to the `kb` command tree.
    let run_server = std::env::args().nth(1).map(|a| a == "serve").unwrap_or(true);

    if run_server {
        serve(settings).await
    } else {
        let cli = Cli::parse();
        let ctx = CliContext::build(settings).await?;
        let code = dispatch(cli, ctx).await;
        std::process::exit(code);
    }
}

async fn serve(settings: Settings) -> Result<()> {
    info!("starting fluxbase-rag server");

    let db_pool = DbPool::connect(&settings.database).await?;
    db_pool.migrate().await?;
    info!("database connection established");

    let kb_repo = KbRepo::new(db_pool.clone());
    let document_repo = DocumentRepo::new(db_pool.clone());
    let chunk_repo = ChunkRepo::new(db_pool.clone());
    let entity_repo = EntityRepo::new(db_pool.clone());
    let chatbot_repo = ChatbotRepo::new(db_pool.clone());
    let access_repo = AccessRepo::new(db_pool.clone());
    let access = Arc::new(AccessController::new(kb_repo.clone(), access_repo));

    let limiters = Arc::new(Limiters::new(&settings.limits));
    let provider = Arc::new(HttpEmbeddingProvider::new(&settings.embedding));
    let embedding = Arc::new(EmbeddingService::new(provider, limiters.clone(), settings.embedding.batch_size));

    let activity_logger = ActivityLogger::new(db_pool.get_pool().clone(), LoggerConfig::default());

    let ingestion = Arc::new(IngestionCoordinator::new(
        db_pool.clone(),
        reqwest::Client::new(),
        document_repo.clone(),
        chunk_repo.clone(),
        entity_repo.clone(),
        kb_repo.clone(),
        access.clone(),
        embedding.clone(),
        activity_logger.clone(),
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
    let query = Arc::new(QueryCoordinator::new(engine, activity_logger.clone()));

    let jwt_manager = Arc::new(JwtManager::new(&settings.security.jwt_secret, settings.security.jwt_expiration_seconds));

    let state = AppState {
        db_pool,
        settings: settings.clone(),
        jwt_manager,
        limiters,
        kb_repo,
        document_repo,
        chunk_repo,
        entity_repo,
        chatbot_repo,
        access,
        embedding,
        ingestion,
        query,
        activity_logger,
    };

    let app = build_router(state);

    let addr = SocketAddr::from((settings.server.host.parse::<std::net::IpAddr>()?, settings.server.port));
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/v1/healthz", get(handlers::health::health_check))
        .route("/v1/readyz", get(handlers::health::readiness_check));

    let protected_routes = Router::new()
        .route("/v1/kb/:kb_id/documents", post(handlers::document::create_document))
        .route("/v1/kb/:kb_id/documents", get(handlers::document::list_documents))
        .route("/v1/kb/:kb_id/documents", delete(handlers::document::delete_documents))
        .route("/v1/kb/:kb_id/documents/upload", post(handlers::document::upload_document))
        .route("/v1/kb/:kb_id/documents/:id", get(handlers::document::get_document))
        .route("/v1/kb/:kb_id/documents/:id", delete(handlers::document::delete_document))
        .route("/v1/kb", post(handlers::kb::create_kb))
        .route("/v1/kb/:kb_id", get(handlers::kb::get_kb))
        .route("/v1/kb/:kb_id", delete(handlers::kb::delete_kb))
        .route("/v1/retrieve", post(handlers::retrieval::retrieve))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_identity));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(
            CorsLayer::permissive()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default().include_headers(true)))
        .layer(DefaultBodyLimit::max(64 * 1024 * 1024))
}
