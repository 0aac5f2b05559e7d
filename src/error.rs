use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::handlers::shared::ApiResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Team,
    TeamMember,
    JoinRequest,
    MatchRequest,
    WaitingSlot,
    FinishedMatch,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Entity::Team => "team",
            Entity::TeamMember => "team member",
            Entity::JoinRequest => "join request",
            Entity::MatchRequest => "match request",
            Entity::WaitingSlot => "waiting slot",
            Entity::FinishedMatch => "finished match",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    AlreadyMember,
    DuplicatePending,
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictReason::AlreadyMember => f.write_str("already a member"),
            ConflictReason::DuplicatePending => f.write_str("a pending request already exists"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Not found: {entity} {id}")]
    NotFound { entity: Entity, id: Uuid },

    #[error("Forbidden: insufficient role for {entity} {id}")]
    Forbidden { entity: Entity, id: Uuid },

    #[error("Invalid state: {entity} {id} is {status}")]
    InvalidState {
        entity: Entity,
        id: Uuid,
        status: String,
    },

    #[error("Conflict: {entity} {id}: {reason}")]
    Conflict {
        entity: Entity,
        id: Uuid,
        reason: ConflictReason,
    },

    #[error("Team {team_id} still has pending negotiations")]
    DependentDataExists { team_id: Uuid },

    #[error("Team {team_id} did not play in match {match_id}")]
    NotParticipant { match_id: Uuid, team_id: Uuid },

    #[error("Waiting slot {slot_id} is no longer open")]
    SlotUnavailable { slot_id: Uuid },

    #[error("Team {team_id} cannot request a match against its own slot {slot_id}")]
    SelfMatch { slot_id: Uuid, team_id: Uuid },

    #[error("Team {team_id} does not meet the requirements of slot {slot_id}")]
    SlotIneligible { slot_id: Uuid, team_id: Uuid },

    #[error("The leader of team {team_id} cannot leave it")]
    LeaderCannotExit { team_id: Uuid, user_id: Uuid },

    #[error("User {user_id} is the last member of team {team_id}")]
    LastMemberCannotExit { team_id: Uuid, user_id: Uuid },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized access")]
    Unauthorized,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub kind: &'static str,
    pub entity: Option<Entity>,
    pub id: Option<Uuid>,
}

impl AppError {
    /// Stable machine-readable code for clients.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "storage",
            AppError::NotFound { .. } => "not_found",
            AppError::Forbidden { .. } => "forbidden",
            AppError::InvalidState { .. } => "invalid_state",
            AppError::Conflict { .. } => "conflict",
            AppError::DependentDataExists { .. } => "dependent_data_exists",
            AppError::NotParticipant { .. } => "not_participant",
            AppError::SlotUnavailable { .. } => "slot_unavailable",
            AppError::SelfMatch { .. } => "self_match",
            AppError::SlotIneligible { .. } => "slot_ineligible",
            AppError::LeaderCannotExit { .. } => "leader_cannot_exit",
            AppError::LastMemberCannotExit { .. } => "last_member_cannot_exit",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized => "unauthorized",
        }
    }

    /// The entity the error is about, if any.
    pub fn subject(&self) -> Option<(Entity, Uuid)> {
        match self {
            AppError::NotFound { entity, id }
            | AppError::Forbidden { entity, id }
            | AppError::InvalidState { entity, id, .. }
            | AppError::Conflict { entity, id, .. } => Some((*entity, *id)),
            AppError::DependentDataExists { team_id }
            | AppError::LeaderCannotExit { team_id, .. }
            | AppError::LastMemberCannotExit { team_id, .. } => Some((Entity::Team, *team_id)),
            AppError::NotParticipant { match_id, .. } => Some((Entity::FinishedMatch, *match_id)),
            AppError::SlotUnavailable { slot_id }
            | AppError::SelfMatch { slot_id, .. }
            | AppError::SlotIneligible { slot_id, .. } => Some((Entity::WaitingSlot, *slot_id)),
            AppError::DatabaseError(_) | AppError::BadRequest(_) | AppError::Unauthorized => None,
        }
    }

    /// Transient storage faults (pool exhaustion, I/O, a write lock held past
    /// the busy timeout) may be retried by the caller; domain errors never.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::DatabaseError(err) => match err {
                sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::Io(_)
                | sqlx::Error::WorkerCrashed => true,
                sqlx::Error::Database(db_error) => {
                    db_error.code().as_deref().is_some_and(is_busy_code)
                }
                _ => false,
            },
            _ => false,
        }
    }

    pub fn invalid_state(entity: Entity, id: Uuid, status: impl ToString) -> Self {
        AppError::InvalidState {
            entity,
            id,
            status: status.to_string(),
        }
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes.
/// The database has a single writer, so these mean another write held the
/// lock past the busy timeout.
fn is_busy_code(code: &str) -> bool {
    code.parse::<i32>()
        .is_ok_and(|code| matches!(code & 0xff, 5 | 6))
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) if self.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::InvalidState { .. }
            | AppError::Conflict { .. }
            | AppError::DependentDataExists { .. }
            | AppError::SlotUnavailable { .. }
            | AppError::LeaderCannotExit { .. }
            | AppError::LastMemberCannotExit { .. } => StatusCode::CONFLICT,
            AppError::NotParticipant { .. }
            | AppError::SelfMatch { .. }
            | AppError::SlotIneligible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = match self {
            // Storage details stay in the logs
            AppError::DatabaseError(_) => "Internal storage error".to_string(),
            _ => self.to_string(),
        };

        if status_code.is_server_error() {
            log::error!("Request failed with status {}: {}", status_code, self);
        } else {
            log::debug!("Request rejected with status {}: {}", status_code, self);
        }

        let (entity, id) = self.subject().unzip();
        let body = ErrorBody {
            kind: self.kind(),
            entity,
            id,
        };

        HttpResponse::build(status_code).json(ApiResponse::error_with_data(body, &error_message))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        log::error!("Database error: {}", error);
        AppError::DatabaseError(error)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        log::error!("Migration error: {}", error);
        AppError::DatabaseError(sqlx::Error::Migrate(Box::new(error)))
    }
}
