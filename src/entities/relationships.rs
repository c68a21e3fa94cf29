use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::Direction;

use super::ExtractedEntity;

#[derive(Debug, Clone)]
pub struct ExtractedRelationship {
    pub source_name: String,
    pub target_name: String,
    pub relationship_type: String,
    pub direction: Direction,
    pub confidence: f32,
}

const NAME: &str = r"[A-Z][\w&,.' -]*?";

static WORKS_AT: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"(?P<a>{NAME}) works (?:at|for) (?P<b>{NAME})")).unwrap());
static FOUNDED: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"(?P<a>{NAME}) founded (?P<b>{NAME})")).unwrap());
static LOCATED_IN: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"(?P<a>{NAME}) (?:is located|is based|is headquartered) in (?P<b>{NAME})")).unwrap());
static OWNS: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"(?P<a>{NAME}) owns (?P<b>{NAME})")).unwrap());
static PART_OF: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"(?P<a>{NAME}) is (?:a|an) (?:part|subsidiary|division) of (?P<b>{NAME})")).unwrap());

/// Scans raw text for a fixed bank of "X <verb phrase> Y" triggers and
/// emits a relationship only when both sides match the name of an
/// already-extracted entity, filtering out incidental prose that
/// happens to fit the grammar but names nothing real.
pub fn infer(text: &str, entities: &[ExtractedEntity]) -> Vec<ExtractedRelationship> {
    let known = |candidate: &str| entities.iter().any(|e| e.name.eq_ignore_ascii_case(candidate.trim()));

    let mut out = Vec::new();
    for (regex, relationship_type, swapped) in [
        (&*WORKS_AT, "works_at", false),
        (&*FOUNDED, "founded_by", true),
        (&*LOCATED_IN, "located_in", false),
        (&*OWNS, "owns", false),
        (&*PART_OF, "part_of", false),
    ] {
        for caps in regex.captures_iter(text) {
            let a = caps.name("a").unwrap().as_str().trim();
            let b = caps.name("b").unwrap().as_str().trim();
            if !known(a) || !known(b) {
                continue;
            }
            let (source, target) = if swapped { (b, a) } else { (a, b) };
            out.push(ExtractedRelationship {
                source_name: source.to_string(),
                target_name: target.to_string(),
                relationship_type: relationship_type.to_string(),
                direction: Direction::Forward,
                confidence: 0.6,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityType;

    fn entity(name: &str) -> ExtractedEntity {
        ExtractedEntity {
            entity_type: EntityType::Person,
            name: name.to_string(),
            canonical_name: name.to_lowercase(),
            aliases: vec![],
            offset: 0,
            context_snippet: name.to_string(),
            salience: 0.5,
        }
    }

    #[test]
    fn infers_works_at_with_both_sides_known() {
        let entities = vec![entity("Jane Doe"), entity("Acme Corp")];
        let rels = infer("Jane Doe works at Acme Corp.", &entities);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].relationship_type, "works_at");
        assert_eq!(rels[0].source_name, "Jane Doe");
    }

    #[test]
    fn founded_by_swaps_source_and_target() {
        let entities = vec![entity("John Smith"), entity("Startup Inc")];
        let rels = infer("John Smith founded Startup Inc", &entities);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].relationship_type, "founded_by");
        assert_eq!(rels[0].source_name, "Startup Inc");
        assert_eq!(rels[0].target_name, "John Smith");
    }

    #[test]
    fn ignores_matches_where_an_entity_is_unknown() {
        let entities = vec![entity("Jane Doe")];
        let rels = infer("Jane Doe works at Unlisted Ventures.", &entities);
        assert!(rels.is_empty());
    }
}
