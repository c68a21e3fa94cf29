mod graph;

use std::collections::HashSet;
use std::sync::Arc;

use pgvector::Vector;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::access::AccessController;
use crate::config::RagConfig;
use crate::database::{ChatbotRepo, ChunkRepo, EntityRepo, KbRepo};
use crate::domain::{AccessLevel, ChatbotLink, Chunk, Identity};
use crate::embedding::EmbeddingService;
use crate::utils::CoreError;

pub use graph::GraphContext;

/// Mirrors the donor's hand-written `ConversationState`-style enum
/// rather than pulling in a state-machine macro crate, so a partial
/// failure path (see `RetrievalResult::partial`) stays a plain match
/// arm instead of a generated transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalState {
    Idle,
    Embedding,
    Searching,
    Merging,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub chatbot_id: Uuid,
    pub query_text: String,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RetrievalHit {
    pub chunk: Chunk,
    pub score: f32,
    pub source_kb_id: Uuid,
    pub priority: i32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievalHit>,
    pub partial: bool,
    pub graph_context: Option<GraphContext>,
}

pub struct RetrievalEngine {
    chatbot_repo: ChatbotRepo,
    chunk_repo: ChunkRepo,
    entity_repo: EntityRepo,
    kb_repo: KbRepo,
    access: Arc<AccessController>,
    embedding: Arc<EmbeddingService>,
    rag: RagConfig,
}

impl RetrievalEngine {
    pub fn new(
        chatbot_repo: ChatbotRepo,
        chunk_repo: ChunkRepo,
        entity_repo: EntityRepo,
        kb_repo: KbRepo,
        access: Arc<AccessController>,
        embedding: Arc<EmbeddingService>,
        rag: RagConfig,
    ) -> Self {
        Self { chatbot_repo, chunk_repo, entity_repo, kb_repo, access, embedding, rag }
    }

    pub async fn retrieve(&self, identity: &Identity, request: RetrievalRequest) -> Result<RetrievalResult, CoreError> {
        let mut state = RetrievalState::Idle;

        state = RetrievalState::Embedding;
        let query_embedding = match self.embedding.embed_one(&request.query_text).await {
            Ok(v) => Vector::from(v),
            Err(e) => {
                let _ = state;
                return Err(e);
            }
        };

        state = RetrievalState::Searching;
        let links = self.resolve_readable_links(identity, request.chatbot_id).await?;
        let candidates = intent_route(&links, &request.query_text);

        let mut partial = false;
        let mut all_hits = Vec::new();

        let (tiered, rest): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(|l| l.access_level == AccessLevel::Tiered);

        for link in &rest {
            match self.search_link(link, &query_embedding, identity.id, request.conversation_id).await {
                Ok(hits) => all_hits.extend(hits),
                Err(e) => {
                    warn!(kb_id = %link.kb_id, error = %e, "link search failed, degrading to partial result");
                    partial = true;
                }
            }
        }

        let mut tiered_sorted = tiered;
        tiered_sorted.sort_by_key(|l| l.priority);
        let global_max = self.rag.retrieval_default_max_chunks;
        for link in &tiered_sorted {
            if all_hits.len() >= global_max {
                break;
            }
            match self.search_link(link, &query_embedding, identity.id, request.conversation_id).await {
                Ok(hits) => all_hits.extend(hits),
                Err(e) => {
                    warn!(kb_id = %link.kb_id, error = %e, "tiered link search failed, degrading to partial result");
                    partial = true;
                }
            }
        }

        state = RetrievalState::Merging;
        all_hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.priority.cmp(&b.priority))
                .then(a.source_kb_id.cmp(&b.source_kb_id))
                .then(a.chunk.ordinal.cmp(&b.chunk.ordinal))
        });
        all_hits.truncate(global_max);

        // Defense in depth: even a `filtered` link's own substituted
        // predicate should have excluded these, but a chunk's own
        // metadata is checked again here in case the index returned
        // something the filter missed.
        let has_filtered_user_scope = links_used_user_scope(&rest);
        if has_filtered_user_scope {
            all_hits.retain(|hit| match hit.chunk.metadata_user_id() {
                None => true,
                Some(owner) => owner == identity.id.to_string(),
            });
        }

        let graph_context = if all_hits.is_empty() {
            None
        } else {
            graph::build(&self.entity_repo, &all_hits, self.rag.graph_max_depth, self.rag.graph_max_nodes)
                .await
                .ok()
        };

        state = RetrievalState::Done;
        let _ = state;
        Ok(RetrievalResult { hits: all_hits, partial, graph_context })
    }

    async fn resolve_readable_links(&self, identity: &Identity, chatbot_id: Uuid) -> Result<Vec<ChatbotLink>, CoreError> {
        let links = self.chatbot_repo.links_for_chatbot(chatbot_id).await?;
        let mut readable = Vec::with_capacity(links.len());
        for link in links {
            let kb = match self.kb_repo.get(link.kb_id).await {
                Ok(kb) => kb,
                Err(_) => continue,
            };
            if self.access.can_read_kb(identity, &kb).await? {
                readable.push(link);
            }
        }
        Ok(readable)
    }

    async fn search_link(
        &self,
        link: &ChatbotLink,
        query_embedding: &Vector,
        identity_id: Uuid,
        conversation_id: Option<Uuid>,
    ) -> Result<Vec<RetrievalHit>, CoreError> {
        let fetch_limit = (link.max_chunks as i64).max(1) * 4;
        let hits = self.chunk_repo.vector_search(link.kb_id, query_embedding.clone(), fetch_limit).await?;

        let filtered = if link.access_level == AccessLevel::Filtered {
            if let Some(filter) = &link.filter_expression {
                let substituted = substitute_placeholders(&filter.0, identity_id, conversation_id);
                hits.into_iter()
                    .filter(|h| matches_filter(&h.chunk.metadata.0, &substituted))
                    .collect()
            } else {
                hits
            }
        } else {
            hits
        };

        let mut out: Vec<RetrievalHit> = filtered
            .into_iter()
            .filter(|h| h.similarity >= link.similarity_threshold)
            .map(|h| RetrievalHit {
                score: h.similarity * link.context_weight,
                source_kb_id: link.kb_id,
                priority: link.priority,
                chunk: h.chunk,
            })
            .collect();
        out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        out.truncate(link.max_chunks as usize);
        Ok(out)
    }
}

fn links_used_user_scope(links: &[ChatbotLink]) -> bool {
    links.iter().any(|l| {
        l.access_level == AccessLevel::Filtered
            && l.filter_expression.as_ref().is_some_and(|f| contains_user_id_placeholder(&f.0))
    })
}

fn contains_user_id_placeholder(value: &Value) -> bool {
    match value {
        Value::String(s) => s == "$user_id",
        Value::Object(map) => map.values().any(contains_user_id_placeholder),
        Value::Array(arr) => arr.iter().any(contains_user_id_placeholder),
        _ => false,
    }
}

fn substitute_placeholders(value: &Value, identity_id: Uuid, conversation_id: Option<Uuid>) -> Value {
    match value {
        Value::String(s) if s == "$user_id" => Value::String(identity_id.to_string()),
        Value::String(s) if s == "$conversation_id" => match conversation_id {
            Some(id) => Value::String(id.to_string()),
            None => Value::Null,
        },
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), substitute_placeholders(v, identity_id, conversation_id))).collect())
        }
        Value::Array(arr) => Value::Array(arr.iter().map(|v| substitute_placeholders(v, identity_id, conversation_id)).collect()),
        other => other.clone(),
    }
}

/// Deep equality on every key of `filter` against `metadata`; a key
/// absent from `metadata` never matches, even if `filter`'s value is
/// `null`.
fn matches_filter(metadata: &Value, filter: &Value) -> bool {
    match filter {
        Value::Object(map) => map.iter().all(|(k, v)| metadata.get(k).is_some_and(|mv| mv == v)),
        _ => true,
    }
}

/// Word-boundary, case-insensitive keyword match against the query.
/// If any link carries keywords, only matching links are candidates;
/// if none match, every enabled link falls back into play rather than
/// returning nothing, mirroring the donor's `QueryAnalyzer` falling
/// back to `SpecificContent` when no overview/summary pattern fires.
fn intent_route(links: &[ChatbotLink], query_text: &str) -> Vec<ChatbotLink> {
    let query_words: HashSet<String> = query_text.to_lowercase().split_whitespace().map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string()).collect();

    let has_any_keywords = links.iter().any(|l| !l.intent_keywords.0.is_empty());
    if !has_any_keywords {
        return links.to_vec();
    }

    let matching: Vec<ChatbotLink> = links
        .iter()
        .filter(|l| {
            l.intent_keywords.0.is_empty()
                || l.intent_keywords.0.iter().any(|kw| query_words.contains(&kw.to_lowercase()))
        })
        .cloned()
        .collect();

    if matching.is_empty() {
        links.to_vec()
    } else {
        matching
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn link(access_level: AccessLevel, keywords: Vec<&str>) -> ChatbotLink {
        ChatbotLink {
            id: Uuid::new_v4(),
            chatbot_id: Uuid::new_v4(),
            kb_id: Uuid::new_v4(),
            access_level,
            filter_expression: None,
            context_weight: 1.0,
            priority: 0,
            intent_keywords: Json(keywords.into_iter().map(String::from).collect()),
            max_chunks: 8,
            similarity_threshold: 0.5,
            enabled: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn falls_back_to_all_links_when_no_keyword_matches() {
        let links = vec![link(AccessLevel::Full, vec!["billing"])];
        let routed = intent_route(&links, "what is the weather today");
        assert_eq!(routed.len(), 1);
    }

    #[test]
    fn narrows_to_matching_keyword_links() {
        let links = vec![link(AccessLevel::Full, vec!["billing"]), link(AccessLevel::Full, vec!["weather"])];
        let routed = intent_route(&links, "tell me about the weather");
        assert_eq!(routed.len(), 1);
    }

    #[test]
    fn filter_match_requires_every_key() {
        let metadata = serde_json::json!({"department": "eng", "user_id": "abc"});
        let filter = serde_json::json!({"department": "eng", "user_id": "abc"});
        assert!(matches_filter(&metadata, &filter));

        let filter2 = serde_json::json!({"department": "sales"});
        assert!(!matches_filter(&metadata, &filter2));
    }
}
