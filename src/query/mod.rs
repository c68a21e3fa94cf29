use std::sync::Arc;

use uuid::Uuid;

use crate::domain::Identity;
use crate::logging::{ActivityLog, ActivityLogger, ActivityStatus, ActivityType};
use crate::retrieval::{RetrievalEngine, RetrievalRequest, RetrievalResult};
use crate::utils::CoreError;

/// Thin façade over the retrieval engine. Its one job is to make sure
/// authorization always runs against the caller's own identity, not
/// the chatbot's — a chatbot link grants the chatbot read access to a
/// knowledge base, but the person asking the question still has to
/// pass C6 themselves.
pub struct QueryCoordinator {
    engine: Arc<RetrievalEngine>,
    logger: ActivityLogger,
}

impl QueryCoordinator {
    pub fn new(engine: Arc<RetrievalEngine>, logger: ActivityLogger) -> Self {
        Self { engine, logger }
    }

    pub async fn query(
        &self,
        identity: &Identity,
        chatbot_id: Uuid,
        query_text: String,
        conversation_id: Option<Uuid>,
    ) -> Result<RetrievalResult, CoreError> {
        let result = self.engine.retrieve(identity, RetrievalRequest { chatbot_id, query_text, conversation_id }).await;

        match &result {
            Ok(r) if r.partial => {
                self.logger.log(
                    ActivityLog::builder(ActivityType::RetrievalPartial)
                        .status(ActivityStatus::Warning)
                        .identity(identity.id)
                        .detail(serde_json::json!({"chatbot_id": chatbot_id, "hits": r.hits.len()}))
                        .build(),
                );
            }
            Ok(r) => {
                self.logger.log(
                    ActivityLog::builder(ActivityType::RetrievalExecuted)
                        .identity(identity.id)
                        .detail(serde_json::json!({"chatbot_id": chatbot_id, "hits": r.hits.len()}))
                        .build(),
                );
            }
            Err(e) => {
                self.logger.log(
                    ActivityLog::builder(ActivityType::RetrievalFailed)
                        .identity(identity.id)
                        .detail(serde_json::json!({"chatbot_id": chatbot_id}))
                        .error(e.to_string())
                        .build(),
                );
            }
        }

        result
    }
}
