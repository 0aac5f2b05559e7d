use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::macros::string_enum;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub university: String,
    pub skill_level: SkillLevel,
    pub team_type: TeamType,
    pub description: Option<String>,
    pub member_count: i64,
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInput {
    pub name: String,
    pub university: String,
    pub skill_level: SkillLevel,
    pub team_type: TeamType,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
    #[serde(rename_all = "snake_case")]
    pub enum TeamRole {
        Leader => "leader",
        ViceLeader => "vice_leader",
        Member => "member",
    }
}

impl TeamRole {
    /// Deciding requests and managing team settings.
    pub fn can_manage(&self) -> bool {
        matches!(self, TeamRole::Leader | TeamRole::ViceLeader)
    }

    pub fn is_leader(&self) -> bool {
        matches!(self, TeamRole::Leader)
    }
}

string_enum! {
    /// Ordered from weakest to strongest; waiting slots compare against it.
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[serde(rename_all = "snake_case")]
    pub enum SkillLevel {
        Beginner => "beginner",
        Amateur => "amateur",
        SemiPro => "semi_pro",
        Pro => "pro",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
    #[serde(rename_all = "snake_case")]
    pub enum TeamType {
        CentralClub => "central_club",
        DepartmentClub => "department_club",
        Casual => "casual",
    }
}
