use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "relationship_direction", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    Bidirectional,
}

/// The relationship type vocabulary is open-ended (`… foreign_key,
/// depends_on, …`), so it is stored as a plain string rather than a
/// closed enum; `known()` documents the named members for callers
/// that want a default set.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Uuid,
    pub kb_id: Uuid,
    pub source_entity_id: Uuid,
    pub target_entity_id: Uuid,
    pub relationship_type: String,
    pub direction: Direction,
    pub confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    pub fn known_types() -> &'static [&'static str] {
        &[
            "works_at",
            "located_in",
            "founded_by",
            "owns",
            "part_of",
            "related_to",
            "knows",
            "foreign_key",
            "depends_on",
        ]
    }

    pub fn validate_invariants(&self) -> Result<(), String> {
        if self.source_entity_id == self.target_entity_id {
            return Err("source and target entity must differ".into());
        }
        if let Some(c) = self.confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err("confidence must be within [0,1]".into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Relationship {
        Relationship {
            id: Uuid::new_v4(),
            kb_id: Uuid::new_v4(),
            source_entity_id: Uuid::new_v4(),
            target_entity_id: Uuid::new_v4(),
            relationship_type: "works_at".into(),
            direction: Direction::Forward,
            confidence: Some(0.8),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_self_loop() {
        let mut r = base();
        r.target_entity_id = r.source_entity_id;
        assert!(r.validate_invariants().is_err());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let mut r = base();
        r.confidence = Some(1.5);
        assert!(r.validate_invariants().is_err());
    }
}
