mod patterns;
mod relationships;

pub use relationships::ExtractedRelationship;

use std::collections::HashMap;

use crate::domain::EntityType;

#[derive(Debug, Clone)]
pub struct ExtractedEntity {
    pub entity_type: EntityType,
    pub name: String,
    pub canonical_name: String,
    pub aliases: Vec<String>,
    pub offset: usize,
    pub context_snippet: String,
    pub salience: f32,
}

const SNIPPET_RADIUS: usize = 60;

fn context_snippet(text: &str, start: usize, end: usize) -> String {
    let lo = start.saturating_sub(SNIPPET_RADIUS);
    let hi = (end + SNIPPET_RADIUS).min(text.len());
    text.get(lo..hi).unwrap_or(&text[start..end]).trim().to_string()
}

fn canonicalize(name: &str) -> String {
    name.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Salience approximates how central a mention is: an entity near the
/// start of the text, or mentioned again later, is treated as more
/// salient than an isolated one-off match.
fn salience_for(occurrences: usize, first_offset: usize, text_len: usize) -> f32 {
    let position_weight = if text_len == 0 { 0.5 } else { 1.0 - (first_offset as f32 / text_len as f32).min(1.0) * 0.5 };
    let frequency_weight = (occurrences as f32 / 5.0).min(1.0);
    (0.4 * position_weight + 0.6 * frequency_weight).clamp(0.0, 1.0)
}

struct Candidate {
    entity_type: EntityType,
    name: String,
    first_offset: usize,
    count: usize,
}

/// Runs the full rule-based pass over `text`: people, organizations,
/// locations, URLs, datetimes, code references, API endpoints, error
/// identifiers, and (when `detect_tables` is set, i.e. an export
/// pipeline is active for this KB) database table references.
/// Returns deduplicated entities plus the relationships inferred
/// between them.
pub fn extract(text: &str, detect_tables: bool) -> (Vec<ExtractedEntity>, Vec<ExtractedRelationship>) {
    let mut candidates: HashMap<(EntityType, String), Candidate> = HashMap::new();

    let mut record = |entity_type: EntityType, raw: &str, offset: usize| {
        let canonical = canonicalize(raw);
        if canonical.is_empty() {
            return;
        }
        candidates
            .entry((entity_type, canonical))
            .and_modify(|c| c.count += 1)
            .or_insert(Candidate { entity_type, name: raw.trim().to_string(), first_offset: offset, count: 1 });
    };

    for m in patterns::PERSON.find_iter(text) {
        record(EntityType::Person, m.as_str(), m.start());
    }
    for m in patterns::ORGANIZATION.find_iter(text) {
        record(EntityType::Organization, m.as_str(), m.start());
    }
    for loc in patterns::known_locations() {
        if let Some(idx) = text.find(loc) {
            record(EntityType::Location, loc, idx);
        }
    }
    for m in patterns::URL.find_iter(text) {
        record(EntityType::Url, m.as_str(), m.start());
    }
    for m in patterns::DATETIME.find_iter(text) {
        record(EntityType::Datetime, m.as_str(), m.start());
    }
    for m in patterns::CODE_REFERENCE.find_iter(text) {
        record(EntityType::CodeReference, m.as_str(), m.start());
    }
    for m in patterns::API_ENDPOINT.find_iter(text) {
        record(EntityType::ApiEndpoint, m.as_str(), m.start());
    }
    for m in patterns::ERROR_IDENTIFIER.find_iter(text) {
        record(EntityType::Error, m.as_str(), m.start());
    }
    for m in patterns::HTTP_STATUS.find_iter(text) {
        record(EntityType::Error, m.as_str(), m.start());
    }
    if detect_tables {
        for caps in patterns::TABLE_REFERENCE.captures_iter(text) {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or_default();
            record(EntityType::Table, name, caps.get(0).unwrap().start());
        }
    }

    let text_len = text.len();
    let entities: Vec<ExtractedEntity> = candidates
        .into_values()
        .map(|c| {
            let end = (c.first_offset + c.name.len()).min(text_len);
            ExtractedEntity {
                entity_type: c.entity_type,
                canonical_name: canonicalize(&c.name),
                context_snippet: context_snippet(text, c.first_offset, end),
                salience: salience_for(c.count, c.first_offset, text_len),
                offset: c.first_offset,
                name: c.name,
                aliases: Vec::new(),
            }
        })
        .collect();

    let rels = relationships::infer(text, &entities);
    (entities, rels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_url_and_datetime() {
        let (entities, _) = extract("See https://example.com/docs on 2024-05-01T10:00:00Z for details.", false);
        assert!(entities.iter().any(|e| e.entity_type == EntityType::Url));
        assert!(entities.iter().any(|e| e.entity_type == EntityType::Datetime));
    }

    #[test]
    fn table_reference_requires_the_flag() {
        let (without, _) = extract("The `orders` table stores line items.", false);
        assert!(!without.iter().any(|e| e.entity_type == EntityType::Table));

        let (with, _) = extract("The `orders` table stores line items.", true);
        assert!(with.iter().any(|e| e.entity_type == EntityType::Table && e.canonical_name == "orders"));
    }

    #[test]
    fn repeated_mentions_raise_salience() {
        let (entities, _) = extract("Error NullPointerError occurred. Later NullPointerError occurred again and again.", false);
        let e = entities.iter().find(|e| e.entity_type == EntityType::Error).unwrap();
        assert!(e.salience > 0.3);
    }

    #[test]
    fn infers_a_relationship_between_co_occurring_entities() {
        let (_, rels) = extract("Jane Doe works at Acme Corp building internal tools.", false);
        assert!(rels.iter().any(|r| r.relationship_type == "works_at"));
    }
}
