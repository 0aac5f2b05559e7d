use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::macros::string_enum;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub id: Uuid,
    pub team_id: Uuid,
    pub applicant_id: Uuid,
    pub message: Option<String>,
    pub status: JoinRequestStatus,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum JoinRequestStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Canceled => "canceled",
    }
}

impl JoinRequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JoinRequestStatus::Pending)
    }
}

/// Outcomes a manager may choose for a pending join request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JoinDecision {
    Approved,
    Rejected,
}

impl From<JoinDecision> for JoinRequestStatus {
    fn from(decision: JoinDecision) -> Self {
        match decision {
            JoinDecision::Approved => JoinRequestStatus::Approved,
            JoinDecision::Rejected => JoinRequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyToJoinInput {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDecisionInput {
    pub outcome: JoinDecision,
    pub reason: Option<String>,
}
