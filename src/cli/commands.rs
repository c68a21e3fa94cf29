use clap::{Parser, Subcommand};
use pgvector::Vector;
use uuid::Uuid;

use crate::domain::{ChunkPolicy, ChunkStrategy, EntityType, PipelineConfig, Quota, Visibility};
use crate::utils::CoreError;

use super::context::CliContext;

#[derive(Parser, Debug)]
#[command(name = "kb", about = "Administrative surface over a knowledge base core")]
pub struct Cli {
    /// Bearer token to act as; omit to run as the trusted operator identity.
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: KbCommand,
}

#[derive(Subcommand, Debug)]
pub enum KbCommand {
    /// List knowledge bases visible to the caller.
    List,
    /// Fetch one knowledge base.
    Get { id: Uuid },
    /// Create a knowledge base.
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        collection_id: Option<Uuid>,
        #[arg(long, default_value = "private")]
        visibility: VisibilityArg,
        #[arg(long, default_value_t = 10_000)]
        quota_max_documents: i64,
        #[arg(long, default_value_t = 1_000_000)]
        quota_max_chunks: i64,
        #[arg(long, default_value_t = 10 * 1024 * 1024 * 1024)]
        quota_max_storage_bytes: i64,
    },
    /// Update visibility and/or quota.
    Update {
        id: Uuid,
        #[arg(long)]
        visibility: Option<VisibilityArg>,
        #[arg(long)]
        quota_max_documents: Option<i64>,
        #[arg(long)]
        quota_max_chunks: Option<i64>,
        #[arg(long)]
        quota_max_storage_bytes: Option<i64>,
    },
    /// Delete a knowledge base.
    Delete { id: Uuid },
    /// Print quota usage and document status counts.
    Status { id: Uuid },
    /// Document CRUD within a knowledge base.
    Documents {
        #[command(subcommand)]
        command: DocumentsCommand,
    },
    /// Upload a file into a knowledge base.
    Upload {
        kb_id: Uuid,
        file: std::path::PathBuf,
        #[arg(long)]
        title: Option<String>,
        /// Accepted for parity with the HTTP upload route; this core
        /// never performs OCR (see document extraction Non-goals).
        #[arg(long)]
        ocr_languages: Option<String>,
    },
    /// Run a direct similarity search against a knowledge base.
    Search {
        kb_id: Uuid,
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: i64,
        #[arg(long, default_value_t = 0.0)]
        threshold: f32,
    },
    /// List or export a knowledge base's table-shaped entities.
    Tables {
        #[command(subcommand)]
        command: TablesCommand,
    },
    /// Print the entity/relationship graph around a knowledge base.
    Graph { kb_id: Uuid },
    /// List entities extracted into a knowledge base.
    Entities {
        kb_id: Uuid,
        #[arg(long)]
        entity_type: Option<String>,
    },
    /// List the knowledge bases linked to a chatbot.
    Chatbots { chatbot_id: Uuid },
    /// Print the MIME types and pipeline kinds this core supports.
    Capabilities,
}

#[derive(Subcommand, Debug)]
pub enum DocumentsCommand {
    List {
        kb_id: Uuid,
        #[arg(long)]
        status: Option<String>,
    },
    Get {
        id: Uuid,
    },
    Add {
        kb_id: Uuid,
        title: String,
        content: String,
    },
    Delete {
        id: Uuid,
    },
    DeleteByFilter {
        kb_id: Uuid,
        #[arg(long)]
        status: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TablesCommand {
    List { kb_id: Uuid },
    Export { kb_id: Uuid },
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum VisibilityArg {
    Private,
    Shared,
    Public,
}

impl From<VisibilityArg> for Visibility {
    fn from(v: VisibilityArg) -> Self {
        match v {
            VisibilityArg::Private => Visibility::Private,
            VisibilityArg::Shared => Visibility::Shared,
            VisibilityArg::Public => Visibility::Public,
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to serialize output: {e}"),
    }
}

fn status_from_str(s: &str) -> Result<crate::domain::DocumentStatus, CoreError> {
    use crate::domain::DocumentStatus::*;
    match s {
        "pending" => Ok(Pending),
        "processing" => Ok(Processing),
        "indexed" => Ok(Indexed),
        "failed" => Ok(Failed),
        other => Err(CoreError::ValidationError(format!("unknown document status: {other}"))),
    }
}

/// Runs one subcommand to completion and returns the process exit
/// code — 0 on success, otherwise `CoreError::exit_code()`.
pub async fn dispatch(cli: Cli, ctx: CliContext) -> i32 {
    let result = run(&cli, &ctx).await;
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

async fn run(cli: &Cli, ctx: &CliContext) -> Result<(), CoreError> {
    let identity = ctx.identity(cli.token.as_deref())?;

    match &cli.command {
        KbCommand::List => {
            let kbs = ctx.kb_repo.list_owned_or_public(identity.id).await?;
            print_json(&kbs);
        }
        KbCommand::Get { id } => {
            let kb = ctx.kb_repo.get(*id).await?;
            if !ctx.access.can_read_kb(&identity, &kb).await? {
                return Err(CoreError::PermissionDenied(format!("identity {} cannot read knowledge base {id}", identity.id)));
            }
            print_json(&kb);
        }
        KbCommand::Create {
            name,
            description,
            collection_id,
            visibility,
            quota_max_documents,
            quota_max_chunks,
            quota_max_storage_bytes,
        } => {
            let owner_id = if collection_id.is_none() { Some(identity.id) } else { None };
            let visibility: Visibility = visibility.clone().into();
            if visibility == Visibility::Private && owner_id.is_none() {
                return Err(CoreError::ValidationError("private visibility requires an owner-scoped knowledge base".into()));
            }
            let quota = Quota {
                max_documents: *quota_max_documents,
                max_chunks: *quota_max_chunks,
                max_storage_bytes: *quota_max_storage_bytes,
            };
            let chunk_policy = ChunkPolicy {
                size: ctx.settings.rag.default_chunk_size,
                overlap: ctx.settings.rag.default_chunk_overlap,
                strategy: ChunkStrategy::Recursive,
            };
            let kb = ctx
                .kb_repo
                .create(name, description.as_deref(), owner_id, *collection_id, visibility, &chunk_policy, &PipelineConfig::default(), &quota, None)
                .await?;
            print_json(&kb);
        }
        KbCommand::Update { id, visibility, quota_max_documents, quota_max_chunks, quota_max_storage_bytes } => {
            let kb = ctx.kb_repo.get(*id).await?;
            if !ctx.access.can_write_kb(&identity, &kb).await? {
                return Err(CoreError::PermissionDenied(format!("identity {} cannot update knowledge base {id}", identity.id)));
            }
            if let Some(visibility) = visibility {
                ctx.kb_repo.update_visibility(*id, visibility.clone().into()).await?;
            }
            if quota_max_documents.is_some() || quota_max_chunks.is_some() || quota_max_storage_bytes.is_some() {
                let quota = Quota {
                    max_documents: quota_max_documents.unwrap_or(kb.quota.0.max_documents),
                    max_chunks: quota_max_chunks.unwrap_or(kb.quota.0.max_chunks),
                    max_storage_bytes: quota_max_storage_bytes.unwrap_or(kb.quota.0.max_storage_bytes),
                };
                ctx.kb_repo.update_quota(*id, &quota).await?;
            }
            let updated = ctx.kb_repo.get(*id).await?;
            print_json(&updated);
        }
        KbCommand::Delete { id } => {
            let kb = ctx.kb_repo.get(*id).await?;
            if !ctx.access.can_write_kb(&identity, &kb).await? {
                return Err(CoreError::PermissionDenied(format!("identity {} cannot delete knowledge base {id}", identity.id)));
            }
            ctx.kb_repo.delete(*id).await?;
            println!("deleted {id}");
        }
        KbCommand::Status { id } => {
            let kb = ctx.kb_repo.get(*id).await?;
            if !ctx.access.can_read_kb(&identity, &kb).await? {
                return Err(CoreError::PermissionDenied(format!("identity {} cannot read knowledge base {id}", identity.id)));
            }
            let usage = ctx.access.kb_usage(*id).await?;
            let documents = ctx.document_repo.list_for_kb(*id).await?;
            let mut pending = 0;
            let mut processing = 0;
            let mut indexed = 0;
            let mut failed = 0;
            for doc in &documents {
                match doc.status {
                    crate::domain::DocumentStatus::Pending => pending += 1,
                    crate::domain::DocumentStatus::Processing => processing += 1,
                    crate::domain::DocumentStatus::Indexed => indexed += 1,
                    crate::domain::DocumentStatus::Failed => failed += 1,
                }
            }
            print_json(&serde_json::json!({
                "usage": usage,
                "documents": {"pending": pending, "processing": processing, "indexed": indexed, "failed": failed},
            }));
        }
        KbCommand::Documents { command } => documents(command, ctx, &identity).await?,
        KbCommand::Upload { kb_id, file, title, ocr_languages } => {
            if ocr_languages.is_some() {
                return Err(CoreError::ValidationError("OCR is not supported by this core".into()));
            }
            let bytes = std::fs::read(file)
                .map_err(|e| CoreError::ValidationError(format!("cannot read {}: {e}", file.display())))?;
            let mime_type = mime_guess::from_path(file).first_or_octet_stream().to_string();
            let title = title.clone().unwrap_or_else(|| {
                file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "untitled".into())
            });
            let document = ctx
                .ingestion
                .create_document(&identity, *kb_id, &title, crate::ingestion::IngestSource::Bytes { bytes, mime_type }, serde_json::Value::Null)
                .await?;
            print_json(&document);
        }
        KbCommand::Search { kb_id, query, limit, threshold } => {
            let kb = ctx.kb_repo.get(*kb_id).await?;
            if !ctx.access.can_read_kb(&identity, &kb).await? {
                return Err(CoreError::PermissionDenied(format!("identity {} cannot read knowledge base {kb_id}", identity.id)));
            }
            let embedding = ctx.embedding.embed_one(query).await?;
            let hits = ctx.chunk_repo.hybrid_search(*kb_id, Vector::from(embedding), query, *limit).await?;
            let hits: Vec<_> = hits.into_iter().filter(|h| h.similarity >= *threshold).collect();
            print_json(&hits);
        }
        KbCommand::Tables { command } => tables(command, ctx, &identity).await?,
        KbCommand::Graph { kb_id } => {
            let kb = ctx.kb_repo.get(*kb_id).await?;
            if !ctx.access.can_read_kb(&identity, &kb).await? {
                return Err(CoreError::PermissionDenied(format!("identity {} cannot read knowledge base {kb_id}", identity.id)));
            }
            let entities = ctx.entity_repo.list_for_kb(*kb_id).await?;
            let ids: Vec<Uuid> = entities.iter().map(|e| e.id).collect();
            let relationships = ctx.entity_repo.neighbors(*kb_id, &ids).await?;
            print_json(&serde_json::json!({"entities": entities, "relationships": relationships}));
        }
        KbCommand::Entities { kb_id, entity_type } => {
            let kb = ctx.kb_repo.get(*kb_id).await?;
            if !ctx.access.can_read_kb(&identity, &kb).await? {
                return Err(CoreError::PermissionDenied(format!("identity {} cannot read knowledge base {kb_id}", identity.id)));
            }
            let entities = ctx.entity_repo.list_for_kb(*kb_id).await?;
            let entities = match entity_type {
                None => entities,
                Some(wanted) => entities.into_iter().filter(|e| format!("{:?}", e.r#type).to_lowercase() == wanted.to_lowercase()).collect(),
            };
            print_json(&entities);
        }
        KbCommand::Chatbots { chatbot_id } => {
            let links = ctx.chatbot_repo.links_for_chatbot(*chatbot_id).await?;
            print_json(&links);
        }
        KbCommand::Capabilities => {
            print_json(&serde_json::json!({
                "mime_types": [
                    "application/pdf", "text/plain", "text/markdown", "text/html", "text/csv",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                    "application/rtf", "application/epub+zip", "application/json",
                ],
                "pipeline_kinds": ["none", "stored-procedure", "external-function", "webhook"],
                "ocr": false,
                "max_upload_bytes": crate::document::MAX_UPLOAD_BYTES,
            }));
        }
    }
    Ok(())
}

async fn documents(command: &DocumentsCommand, ctx: &CliContext, identity: &crate::domain::Identity) -> Result<(), CoreError> {
    match command {
        DocumentsCommand::List { kb_id, status } => {
            let status = status.as_deref().map(status_from_str).transpose()?;
            let docs = ctx.ingestion.list_documents(identity, *kb_id, status).await?;
            print_json(&docs);
        }
        DocumentsCommand::Get { id } => {
            let doc = ctx.ingestion.get_document(identity, *id).await?;
            print_json(&doc);
        }
        DocumentsCommand::Add { kb_id, title, content } => {
            let doc = ctx
                .ingestion
                .create_document(identity, *kb_id, title, crate::ingestion::IngestSource::InlineText { text: content.clone() }, serde_json::Value::Null)
                .await?;
            print_json(&doc);
        }
        DocumentsCommand::Delete { id } => {
            ctx.ingestion.delete_document(identity, *id).await?;
            println!("deleted {id}");
        }
        DocumentsCommand::DeleteByFilter { kb_id, status } => {
            let status = status.as_deref().map(status_from_str).transpose()?;
            let deleted = ctx.ingestion.delete_documents_by_status(identity, *kb_id, status).await?;
            println!("deleted {deleted} documents");
        }
    }
    Ok(())
}

async fn tables(command: &TablesCommand, ctx: &CliContext, identity: &crate::domain::Identity) -> Result<(), CoreError> {
    let kb_id = match command {
        TablesCommand::List { kb_id } | TablesCommand::Export { kb_id } => *kb_id,
    };
    let kb = ctx.kb_repo.get(kb_id).await?;
    if !ctx.access.can_read_kb(identity, &kb).await? {
        return Err(CoreError::PermissionDenied(format!("identity {} cannot read knowledge base {kb_id}", identity.id)));
    }

    let tables: Vec<_> = ctx.entity_repo.list_for_kb(kb_id).await?.into_iter().filter(|e| e.r#type == EntityType::Table).collect();

    match command {
        TablesCommand::List { .. } => print_json(&tables),
        TablesCommand::Export { .. } => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for table in &tables {
                writer
                    .write_record([table.id.to_string(), table.name.clone(), table.canonical_name.clone()])
                    .map_err(|e| CoreError::Internal(format!("csv export failed: {e}")))?;
            }
            writer.flush().map_err(|e| CoreError::Internal(format!("csv export failed: {e}")))?;
        }
    }
    Ok(())
}
