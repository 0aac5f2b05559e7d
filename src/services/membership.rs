use std::sync::Arc;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    database::{
        is_unique_violation,
        models::{ActivityRecord, Team, TeamInput, TeamMember, TeamRole},
        repositories::{activity as activity_repo, team as team_repo},
        transaction::DatabaseTransaction,
    },
    error::{AppError, ConflictReason, Entity},
    services::{
        notifier::{DomainEvent, NotificationSink},
        roles,
    },
};

/// Insert a membership row inside the caller's transaction.
pub async fn add_member(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_id: Uuid,
    role: TeamRole,
) -> Result<TeamMember, AppError> {
    let conflict = AppError::Conflict {
        entity: Entity::TeamMember,
        id: user_id,
        reason: ConflictReason::AlreadyMember,
    };

    if team_repo::get_team_member(conn, team_id, user_id)
        .await?
        .is_some()
    {
        return Err(conflict);
    }

    match team_repo::add_team_member(conn, team_id, user_id, role, Utc::now()).await {
        Ok(member) => Ok(member),
        Err(e) if is_unique_violation(&e) => Err(conflict),
        Err(e) => Err(e.into()),
    }
}

async fn lock_team(conn: &mut SqliteConnection, team_id: Uuid) -> Result<(), AppError> {
    team_repo::touch_team(conn, team_id, Utc::now())
        .await?
        .ok_or(AppError::NotFound {
            entity: Entity::Team,
            id: team_id,
        })
}

async fn find_member(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<TeamMember, AppError> {
    team_repo::get_team_member(conn, team_id, user_id)
        .await?
        .ok_or(AppError::NotFound {
            entity: Entity::TeamMember,
            id: user_id,
        })
}

fn validate_team_input(input: &TeamInput) -> Result<(), AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Team name is required".to_string()));
    }
    if input.university.trim().is_empty() {
        return Err(AppError::BadRequest("University is required".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct MembershipService {
    pool: SqlitePool,
    notifier: Arc<dyn NotificationSink>,
}

impl MembershipService {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { pool, notifier }
    }

    /// Create a team with the creator as its leader.
    pub async fn create_team(&self, actor_id: Uuid, input: TeamInput) -> Result<Team, AppError> {
        validate_team_input(&input)?;

        let team = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let team = team_repo::create_team(tx, input, Utc::now()).await?;
                add_member(tx, team.id, actor_id, TeamRole::Leader).await?;

                team_repo::get_team_by_id(tx, team.id)
                    .await?
                    .ok_or(AppError::NotFound {
                        entity: Entity::Team,
                        id: team.id,
                    })
            })
        })
        .await?;

        log::info!("Team {} created by {}", team.id, actor_id);
        self.notifier.publish(DomainEvent::TeamCreated {
            team_id: team.id,
            leader_id: actor_id,
        });

        Ok(team)
    }

    pub async fn get_team(&self, team_id: Uuid) -> Result<Team, AppError> {
        let mut conn = self.pool.acquire().await?;
        team_repo::get_team_by_id(&mut conn, team_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: Entity::Team,
                id: team_id,
            })
    }

    pub async fn list_members(&self, team_id: Uuid) -> Result<Vec<TeamMember>, AppError> {
        let mut conn = self.pool.acquire().await?;
        if team_repo::get_team_by_id(&mut conn, team_id).await?.is_none() {
            return Err(AppError::NotFound {
                entity: Entity::Team,
                id: team_id,
            });
        }

        Ok(team_repo::get_team_members(&mut conn, team_id).await?)
    }

    /// Most recent activity first. Managers only.
    pub async fn team_activity(
        &self,
        team_id: Uuid,
        actor_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        let mut conn = self.pool.acquire().await?;
        if team_repo::get_team_by_id(&mut conn, team_id).await?.is_none() {
            return Err(AppError::NotFound {
                entity: Entity::Team,
                id: team_id,
            });
        }
        roles::require_manager(&mut conn, team_id, actor_id).await?;

        Ok(activity_repo::get_team_activity(&mut conn, team_id, limit.clamp(1, 200)).await?)
    }

    /// Leave a team. Leaders must hand over leadership first, and the last
    /// member can never leave.
    pub async fn exit(&self, team_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                lock_team(tx, team_id).await?;
                let member = find_member(tx, team_id, user_id).await?;

                if member.role.is_leader() {
                    return Err(AppError::LeaderCannotExit { team_id, user_id });
                }

                if team_repo::count_team_members(tx, team_id).await? <= 1 {
                    return Err(AppError::LastMemberCannotExit { team_id, user_id });
                }

                team_repo::remove_team_member(tx, team_id, user_id, Utc::now()).await?;
                Ok(())
            })
        })
        .await?;

        log::info!("User {} left team {}", user_id, team_id);
        self.notifier
            .publish(DomainEvent::MemberExited { team_id, user_id });

        Ok(())
    }

    /// True when nothing in flight references the team.
    pub async fn can_delete_team(&self, team_id: Uuid) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        if team_repo::get_team_by_id(&mut conn, team_id).await?.is_none() {
            return Err(AppError::NotFound {
                entity: Entity::Team,
                id: team_id,
            });
        }

        Ok(team_repo::count_open_negotiations(&mut conn, team_id).await? == 0)
    }

    pub async fn delete_team(&self, team_id: Uuid, actor_id: Uuid) -> Result<(), AppError> {
        DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                lock_team(tx, team_id).await?;
                roles::require_leader(tx, team_id, actor_id).await?;

                if team_repo::count_open_negotiations(tx, team_id).await? > 0 {
                    return Err(AppError::DependentDataExists { team_id });
                }

                team_repo::delete_team(tx, team_id).await?;
                Ok(())
            })
        })
        .await?;

        log::info!("Team {} deleted by {}", team_id, actor_id);
        self.notifier
            .publish(DomainEvent::TeamDeleted { team_id, actor_id });

        Ok(())
    }

    /// Promote or demote a non-leader. Leadership itself moves only through
    /// `transfer_leadership`.
    pub async fn change_role(
        &self,
        team_id: Uuid,
        actor_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> Result<TeamMember, AppError> {
        if role.is_leader() {
            return Err(AppError::BadRequest(
                "Leadership must be transferred, not assigned".to_string(),
            ));
        }

        let member = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                lock_team(tx, team_id).await?;
                roles::require_leader(tx, team_id, actor_id).await?;

                let target = find_member(tx, team_id, user_id).await?;
                if target.role.is_leader() {
                    return Err(AppError::BadRequest(
                        "The leader's role can only change through a leadership transfer"
                            .to_string(),
                    ));
                }

                team_repo::update_member_role(tx, team_id, user_id, role)
                    .await?
                    .ok_or(AppError::NotFound {
                        entity: Entity::TeamMember,
                        id: user_id,
                    })
            })
        })
        .await?;

        self.notifier.publish(DomainEvent::RoleChanged {
            team_id,
            user_id,
            role,
            actor_id,
        });

        Ok(member)
    }

    /// Hand leadership to another member. The previous leader stays on as
    /// vice leader.
    pub async fn transfer_leadership(
        &self,
        team_id: Uuid,
        actor_id: Uuid,
        new_leader_id: Uuid,
    ) -> Result<TeamMember, AppError> {
        if actor_id == new_leader_id {
            return Err(AppError::BadRequest(
                "Leadership must go to another member".to_string(),
            ));
        }

        let leader = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                lock_team(tx, team_id).await?;
                roles::require_leader(tx, team_id, actor_id).await?;
                find_member(tx, team_id, new_leader_id).await?;

                // Demote first: the schema allows a single leader row
                team_repo::update_member_role(tx, team_id, actor_id, TeamRole::ViceLeader).await?;
                team_repo::update_member_role(tx, team_id, new_leader_id, TeamRole::Leader)
                    .await?
                    .ok_or(AppError::NotFound {
                        entity: Entity::TeamMember,
                        id: new_leader_id,
                    })
            })
        })
        .await?;

        log::info!(
            "Leadership of team {} moved from {} to {}",
            team_id,
            actor_id,
            new_leader_id
        );
        self.notifier.publish(DomainEvent::LeadershipTransferred {
            team_id,
            previous_leader_id: actor_id,
            new_leader_id,
        });

        Ok(leader)
    }

    /// Remove another member. Vice leaders may only remove plain members and
    /// nobody may remove the leader.
    pub async fn remove_member(
        &self,
        team_id: Uuid,
        actor_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        if actor_id == user_id {
            return Err(AppError::BadRequest(
                "Use exit to leave a team".to_string(),
            ));
        }

        DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                lock_team(tx, team_id).await?;
                let actor_role = roles::require_manager(tx, team_id, actor_id).await?;
                let target = find_member(tx, team_id, user_id).await?;

                let allowed = match target.role {
                    TeamRole::Leader => false,
                    TeamRole::ViceLeader => actor_role.is_leader(),
                    TeamRole::Member => true,
                };
                if !allowed {
                    return Err(AppError::Forbidden {
                        entity: Entity::TeamMember,
                        id: user_id,
                    });
                }

                team_repo::remove_team_member(tx, team_id, user_id, Utc::now()).await?;
                Ok(())
            })
        })
        .await?;

        self.notifier.publish(DomainEvent::MemberRemoved {
            team_id,
            user_id,
            actor_id,
        });

        Ok(())
    }
}
