use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{SkillLevel, macros::string_enum};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MatchWaitingSlot {
    pub id: Uuid,
    pub owner_team_id: Uuid,
    pub preferred_date: NaiveDate,
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
    pub venue_id: Uuid,
    pub skill_level_min: SkillLevel,
    pub skill_level_max: SkillLevel,
    pub university_only: bool,
    pub message: Option<String>,
    pub status: SlotStatus,
    #[serde(skip)]
    pub version: i64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchWaitingSlot {
    pub fn accepts_skill(&self, level: SkillLevel) -> bool {
        self.skill_level_min <= level && level <= self.skill_level_max
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingSlotInput {
    pub owner_team_id: Uuid,
    pub preferred_date: NaiveDate,
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
    pub venue_id: Uuid,
    pub skill_level_min: SkillLevel,
    pub skill_level_max: SkillLevel,
    #[serde(default)]
    pub university_only: bool,
    pub message: Option<String>,
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum SlotStatus {
        Waiting => "waiting",
        Matched => "matched",
        Canceled => "canceled",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub id: Uuid,
    pub waiting_slot_id: Uuid,
    pub requesting_team_id: Uuid,
    pub target_team_id: Uuid,
    pub request_message: Option<String>,
    pub status: MatchRequestStatus,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum MatchRequestStatus {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
        Canceled => "canceled",
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchDecision {
    Accepted,
    Rejected,
}

impl From<MatchDecision> for MatchRequestStatus {
    fn from(decision: MatchDecision) -> Self {
        match decision {
            MatchDecision::Accepted => MatchRequestStatus::Accepted,
            MatchDecision::Rejected => MatchRequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequestInput {
    pub requesting_team_id: Uuid,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDecisionInput {
    pub outcome: MatchDecision,
}

/// Which side of a negotiation a team sits on when listing its requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestDirection {
    #[default]
    Received,
    Sent,
}
