use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: Uuid,
    pub team_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub event_type: String,
    pub entity_id: Uuid,
    pub payload: String, // JSON as String in SQLite
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateActivityInput {
    pub team_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub event_type: &'static str,
    pub entity_id: Uuid,
    pub payload: serde_json::Value,
}
