use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Activity categories spanning the ingestion and retrieval lifecycle;
/// this core has no conversational turns to log, so the vocabulary is
/// document- and query-centric rather than message-centric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    DocumentReceived,
    DocumentChunked,
    DocumentEmbedded,
    DocumentIndexed,
    DocumentFailed,
    DocumentDeleted,
    EntityExtractionCompleted,
    PipelineInvoked,
    PipelineFailed,
    QuotaReserved,
    QuotaExceeded,
    RetrievalExecuted,
    RetrievalPartial,
    RetrievalFailed,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentReceived => "document_received",
            Self::DocumentChunked => "document_chunked",
            Self::DocumentEmbedded => "document_embedded",
            Self::DocumentIndexed => "document_indexed",
            Self::DocumentFailed => "document_failed",
            Self::DocumentDeleted => "document_deleted",
            Self::EntityExtractionCompleted => "entity_extraction_completed",
            Self::PipelineInvoked => "pipeline_invoked",
            Self::PipelineFailed => "pipeline_failed",
            Self::QuotaReserved => "quota_reserved",
            Self::QuotaExceeded => "quota_exceeded",
            Self::RetrievalExecuted => "retrieval_executed",
            Self::RetrievalPartial => "retrieval_partial",
            Self::RetrievalFailed => "retrieval_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Error,
    Warning,
    Info,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// One row of `activity_log`; `detail` carries whatever free-form
/// context a given activity type wants (error message, chunk count,
/// similarity scores, …) rather than a column per possible field.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    pub activity_type: ActivityType,
    pub activity_status: ActivityStatus,
    pub identity_id: Option<Uuid>,
    pub kb_id: Option<Uuid>,
    pub document_id: Option<Uuid>,
    pub detail: Value,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    pub fn builder(activity_type: ActivityType) -> ActivityLogBuilder {
        ActivityLogBuilder::new(activity_type)
    }
}

pub struct ActivityLogBuilder {
    log: ActivityLog,
}

impl ActivityLogBuilder {
    pub fn new(activity_type: ActivityType) -> Self {
        Self {
            log: ActivityLog {
                activity_type,
                activity_status: ActivityStatus::Success,
                identity_id: None,
                kb_id: None,
                document_id: None,
                detail: Value::Object(Default::default()),
                created_at: Utc::now(),
            },
        }
    }

    pub fn status(mut self, status: ActivityStatus) -> Self {
        self.log.activity_status = status;
        self
    }

    pub fn identity(mut self, id: Uuid) -> Self {
        self.log.identity_id = Some(id);
        self
    }

    pub fn kb(mut self, id: Uuid) -> Self {
        self.log.kb_id = Some(id);
        self
    }

    pub fn document(mut self, id: Uuid) -> Self {
        self.log.document_id = Some(id);
        self
    }

    pub fn detail(mut self, detail: Value) -> Self {
        self.log.detail = detail;
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.log.activity_status = ActivityStatus::Error;
        self.log.detail = serde_json::json!({ "error": message.into() });
        self
    }

    pub fn build(self) -> ActivityLog {
        self.log
    }
}
