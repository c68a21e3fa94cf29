use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Concept,
    Product,
    Event,
    Table,
    Url,
    ApiEndpoint,
    Datetime,
    CodeReference,
    Error,
    Other,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub kb_id: Uuid,
    #[sqlx(rename = "entity_type")]
    pub r#type: EntityType,
    pub name: String,
    pub canonical_name: String,
    pub aliases: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
