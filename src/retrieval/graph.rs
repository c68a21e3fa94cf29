use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::database::EntityRepo;
use crate::domain::{Entity, Relationship};
use crate::utils::CoreError;

use super::RetrievalHit;

#[derive(Debug, Clone, serde::Serialize)]
pub struct GraphContext {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

/// Starts from the entity mentions attached to the documents behind
/// the top-K hits, then walks outward one hop at a time, restricted
/// to relationships in the same KBs the hits came from, stopping at
/// `max_depth` hops or `max_nodes` distinct entities, whichever comes
/// first.
pub async fn build(
    entity_repo: &EntityRepo,
    hits: &[RetrievalHit],
    max_depth: u32,
    max_nodes: usize,
) -> Result<GraphContext, CoreError> {
    let kb_ids: HashSet<Uuid> = hits.iter().map(|h| h.source_kb_id).collect();
    let document_ids: HashSet<Uuid> = hits.iter().map(|h| h.chunk.document_id).collect();

    let mut visited: HashSet<Uuid> = HashSet::new();
    for document_id in &document_ids {
        for mention in entity_repo.mentions_for_document(*document_id).await? {
            visited.insert(mention.entity_id);
        }
    }

    let mut frontier: Vec<Uuid> = visited.iter().copied().collect();
    let mut relationships: HashMap<Uuid, Relationship> = HashMap::new();

    for _ in 0..max_depth {
        if frontier.is_empty() || visited.len() >= max_nodes {
            break;
        }
        let mut next_frontier = Vec::new();
        for kb_id in &kb_ids {
            for relationship in entity_repo.neighbors(*kb_id, &frontier).await? {
                for candidate in [relationship.source_entity_id, relationship.target_entity_id] {
                    if visited.len() < max_nodes && visited.insert(candidate) {
                        next_frontier.push(candidate);
                    }
                }
                relationships.insert(relationship.id, relationship);
            }
        }
        frontier = next_frontier;
    }

    let entities = entity_repo.get_many(&visited.into_iter().collect::<Vec<_>>()).await?;
    Ok(GraphContext { entities, relationships: relationships.into_values().collect() })
}
