use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    database::{
        is_foreign_key_violation, is_unique_violation,
        models::{JoinDecision, JoinRequest, JoinRequestStatus, TeamRole},
        repositories::{join_request as join_repo, team as team_repo},
        transaction::DatabaseTransaction,
    },
    error::{AppError, ConflictReason, Entity},
    services::{
        membership,
        notifier::{DomainEvent, NotificationSink},
        roles,
    },
};

/// Pending join requests and the decisions made on them.
#[derive(Clone)]
pub struct JoinRequestService {
    pool: SqlitePool,
    notifier: Arc<dyn NotificationSink>,
}

impl JoinRequestService {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { pool, notifier }
    }

    pub async fn apply(
        &self,
        team_id: Uuid,
        applicant_id: Uuid,
        message: Option<String>,
    ) -> Result<JoinRequest, AppError> {
        let request = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let request =
                    match join_repo::create_join_request(tx, team_id, applicant_id, message, Utc::now())
                        .await
                    {
                        Ok(request) => request,
                        Err(e) if is_unique_violation(&e) => {
                            return Err(AppError::Conflict {
                                entity: Entity::JoinRequest,
                                id: team_id,
                                reason: ConflictReason::DuplicatePending,
                            });
                        }
                        Err(e) if is_foreign_key_violation(&e) => {
                            return Err(AppError::NotFound {
                                entity: Entity::Team,
                                id: team_id,
                            });
                        }
                        Err(e) => return Err(e.into()),
                    };

                if team_repo::get_team_member(tx, team_id, applicant_id)
                    .await?
                    .is_some()
                {
                    return Err(AppError::Conflict {
                        entity: Entity::TeamMember,
                        id: applicant_id,
                        reason: ConflictReason::AlreadyMember,
                    });
                }

                Ok(request)
            })
        })
        .await?;

        log::info!("User {} applied to join team {}", applicant_id, team_id);
        self.notifier.publish(DomainEvent::JoinRequested {
            team_id,
            request_id: request.id,
            applicant_id,
        });

        Ok(request)
    }

    /// Approve or reject a pending request. Approval adds the applicant as a
    /// member in the same transaction; if that fails the request stays pending.
    pub async fn decide(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        outcome: JoinDecision,
        reason: Option<String>,
    ) -> Result<JoinRequest, AppError> {
        let status = JoinRequestStatus::from(outcome);

        let decided = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let Some(request) = join_repo::transition_pending(
                    tx,
                    request_id,
                    status,
                    Some(actor_id),
                    reason,
                    Utc::now(),
                )
                .await?
                else {
                    return Ok(None);
                };

                roles::require_manager(tx, request.team_id, actor_id).await?;

                if outcome == JoinDecision::Approved {
                    membership::add_member(tx, request.team_id, request.applicant_id, TeamRole::Member)
                        .await?;
                }

                Ok(Some(request))
            })
        })
        .await?;

        let Some(request) = decided else {
            return self.settle_decided(request_id, actor_id, status).await;
        };

        log::info!(
            "Join request {} {} by {}",
            request.id,
            request.status,
            actor_id
        );

        let event = match outcome {
            JoinDecision::Approved => DomainEvent::JoinApproved {
                team_id: request.team_id,
                request_id: request.id,
                applicant_id: request.applicant_id,
                actor_id,
            },
            JoinDecision::Rejected => DomainEvent::JoinRejected {
                team_id: request.team_id,
                request_id: request.id,
                applicant_id: request.applicant_id,
                actor_id,
            },
        };
        self.notifier.publish(event);

        Ok(request)
    }

    pub async fn cancel(&self, request_id: Uuid, actor_id: Uuid) -> Result<JoinRequest, AppError> {
        let canceled = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let Some(request) = join_repo::transition_pending(
                    tx,
                    request_id,
                    JoinRequestStatus::Canceled,
                    Some(actor_id),
                    None,
                    Utc::now(),
                )
                .await?
                else {
                    return Ok(None);
                };

                if request.applicant_id != actor_id {
                    return Err(AppError::Forbidden {
                        entity: Entity::JoinRequest,
                        id: request_id,
                    });
                }

                Ok(Some(request))
            })
        })
        .await?;

        let Some(request) = canceled else {
            return self.settle_canceled(request_id, actor_id).await;
        };

        log::info!("Join request {} canceled by applicant", request.id);
        self.notifier.publish(DomainEvent::JoinCanceled {
            team_id: request.team_id,
            request_id: request.id,
            applicant_id: request.applicant_id,
        });

        Ok(request)
    }

    /// Requests for a team, oldest first. Managers only.
    pub async fn list_for_team(
        &self,
        team_id: Uuid,
        actor_id: Uuid,
        status: Option<JoinRequestStatus>,
    ) -> Result<Vec<JoinRequest>, AppError> {
        let mut conn = self.pool.acquire().await?;

        if team_repo::get_team_by_id(&mut conn, team_id).await?.is_none() {
            return Err(AppError::NotFound {
                entity: Entity::Team,
                id: team_id,
            });
        }
        roles::require_manager(&mut conn, team_id, actor_id).await?;

        Ok(join_repo::get_join_requests_by_team(&mut conn, team_id, status).await?)
    }

    pub async fn list_for_applicant(&self, actor_id: Uuid) -> Result<Vec<JoinRequest>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(join_repo::get_join_requests_by_applicant(&mut conn, actor_id).await?)
    }

    /// Visible to the applicant and to managers of the team.
    pub async fn get(&self, request_id: Uuid, actor_id: Uuid) -> Result<JoinRequest, AppError> {
        let mut conn = self.pool.acquire().await?;
        let not_found = || AppError::NotFound {
            entity: Entity::JoinRequest,
            id: request_id,
        };

        let request = join_repo::get_join_request_by_id(&mut conn, request_id)
            .await?
            .ok_or_else(not_found)?;

        if request.applicant_id == actor_id {
            return Ok(request);
        }

        let role = roles::resolve_role(&mut conn, request.team_id, actor_id).await?;
        if roles::can_manage(role) {
            Ok(request)
        } else {
            Err(not_found())
        }
    }

    /// The request was not pending when the decision ran. A retry of the
    /// committed decision returns it unchanged; anything else is refused.
    async fn settle_decided(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        wanted: JoinRequestStatus,
    ) -> Result<JoinRequest, AppError> {
        let mut conn = self.pool.acquire().await?;
        let request = join_repo::get_join_request_by_id(&mut conn, request_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: Entity::JoinRequest,
                id: request_id,
            })?;

        if request.status == wanted && request.decided_by == Some(actor_id) {
            return Ok(request);
        }

        let role = roles::resolve_role(&mut conn, request.team_id, actor_id).await?;
        if !roles::can_manage(role) {
            return Err(AppError::Forbidden {
                entity: Entity::JoinRequest,
                id: request_id,
            });
        }

        Err(AppError::invalid_state(
            Entity::JoinRequest,
            request_id,
            request.status,
        ))
    }

    async fn settle_canceled(&self, request_id: Uuid, actor_id: Uuid) -> Result<JoinRequest, AppError> {
        let mut conn = self.pool.acquire().await?;
        let request = join_repo::get_join_request_by_id(&mut conn, request_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: Entity::JoinRequest,
                id: request_id,
            })?;

        if request.applicant_id != actor_id {
            return Err(AppError::Forbidden {
                entity: Entity::JoinRequest,
                id: request_id,
            });
        }

        if request.status == JoinRequestStatus::Canceled {
            return Ok(request);
        }

        Err(AppError::invalid_state(
            Entity::JoinRequest,
            request_id,
            request.status,
        ))
    }
}
