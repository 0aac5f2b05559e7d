//! Role lookups used as guards by every mutating operation.
//!
//! Roles are always re-read through the connection the caller is mutating
//! with, never taken from the request, so a demotion that commits first is
//! honoured by everything that runs after it.

use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    database::{models::TeamRole, repositories::team as team_repo},
    error::{AppError, Entity},
};

pub async fn resolve_role(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<Option<TeamRole>, AppError> {
    Ok(team_repo::get_member_role(conn, team_id, user_id).await?)
}

pub fn can_manage(role: Option<TeamRole>) -> bool {
    role.is_some_and(|role| role.can_manage())
}

/// Fails with `Forbidden` unless the user is a leader or vice leader.
pub async fn require_manager(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<TeamRole, AppError> {
    match resolve_role(conn, team_id, user_id).await? {
        Some(role) if role.can_manage() => Ok(role),
        _ => Err(AppError::Forbidden {
            entity: Entity::Team,
            id: team_id,
        }),
    }
}

pub async fn require_leader(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    match resolve_role(conn, team_id, user_id).await? {
        Some(TeamRole::Leader) => Ok(()),
        _ => Err(AppError::Forbidden {
            entity: Entity::Team,
            id: team_id,
        }),
    }
}
