use std::sync::Arc;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    database::{
        is_unique_violation,
        models::{
            MatchDecision, MatchRequest, MatchRequestStatus, MatchWaitingSlot, RequestDirection,
            SkillLevel, SlotStatus, WaitingSlotInput,
        },
        repositories::{match_request as match_repo, team as team_repo},
        transaction::DatabaseTransaction,
    },
    error::{AppError, ConflictReason, Entity},
    services::{
        notifier::{DomainEvent, NotificationSink},
        roles,
    },
};

fn slot_not_found(slot_id: Uuid) -> AppError {
    AppError::NotFound {
        entity: Entity::WaitingSlot,
        id: slot_id,
    }
}

fn request_not_found(request_id: Uuid) -> AppError {
    AppError::NotFound {
        entity: Entity::MatchRequest,
        id: request_id,
    }
}

fn validate_slot_input(input: &WaitingSlotInput) -> Result<(), AppError> {
    if input.time_start >= input.time_end {
        return Err(AppError::BadRequest(
            "Slot must start before it ends".to_string(),
        ));
    }
    if input.skill_level_min > input.skill_level_max {
        return Err(AppError::BadRequest(
            "Minimum skill level is above the maximum".to_string(),
        ));
    }
    Ok(())
}

fn rejected_event(request: &MatchRequest, actor_id: Option<Uuid>) -> DomainEvent {
    DomainEvent::MatchRejected {
        slot_id: request.waiting_slot_id,
        request_id: request.id,
        requesting_team_id: request.requesting_team_id,
        target_team_id: request.target_team_id,
        actor_id,
    }
}

/// Checks a requesting team against the slot's skill range and university
/// restriction.
async fn check_eligibility(
    conn: &mut SqliteConnection,
    slot: &MatchWaitingSlot,
    requesting_team_id: Uuid,
) -> Result<(), AppError> {
    let ineligible = AppError::SlotIneligible {
        slot_id: slot.id,
        team_id: requesting_team_id,
    };

    let team = team_repo::get_team_by_id(conn, requesting_team_id)
        .await?
        .ok_or(AppError::NotFound {
            entity: Entity::Team,
            id: requesting_team_id,
        })?;

    if !slot.accepts_skill(team.skill_level) {
        return Err(ineligible);
    }

    if slot.university_only {
        let owner = team_repo::get_team_by_id(conn, slot.owner_team_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: Entity::Team,
                id: slot.owner_team_id,
            })?;
        if owner.university != team.university {
            return Err(ineligible);
        }
    }

    Ok(())
}

/// Waiting slots and the match requests made against them.
#[derive(Clone)]
pub struct MatchRequestService {
    pool: SqlitePool,
    notifier: Arc<dyn NotificationSink>,
}

impl MatchRequestService {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { pool, notifier }
    }

    pub async fn open_slot(
        &self,
        actor_id: Uuid,
        input: WaitingSlotInput,
    ) -> Result<MatchWaitingSlot, AppError> {
        validate_slot_input(&input)?;
        let owner_team_id = input.owner_team_id;

        let slot = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                team_repo::touch_team(tx, owner_team_id, Utc::now())
                    .await?
                    .ok_or(AppError::NotFound {
                        entity: Entity::Team,
                        id: owner_team_id,
                    })?;
                roles::require_manager(tx, owner_team_id, actor_id).await?;

                Ok(match_repo::create_slot(tx, input, actor_id, Utc::now()).await?)
            })
        })
        .await?;

        log::info!("Slot {} opened by team {}", slot.id, owner_team_id);
        self.notifier.publish(DomainEvent::SlotOpened {
            team_id: owner_team_id,
            slot_id: slot.id,
            actor_id,
        });

        Ok(slot)
    }

    /// Withdraw a waiting slot. Pending requests against it are rejected in
    /// the same transaction.
    pub async fn cancel_slot(
        &self,
        slot_id: Uuid,
        actor_id: Uuid,
    ) -> Result<MatchWaitingSlot, AppError> {
        let (slot, rejected) = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let now = Utc::now();
                match_repo::touch_slot(tx, slot_id, now)
                    .await?
                    .ok_or_else(|| slot_not_found(slot_id))?;

                let slot = match_repo::get_slot_by_id(tx, slot_id)
                    .await?
                    .ok_or_else(|| slot_not_found(slot_id))?;
                roles::require_manager(tx, slot.owner_team_id, actor_id).await?;

                match slot.status {
                    SlotStatus::Waiting => {}
                    SlotStatus::Canceled => return Ok((slot, None)),
                    SlotStatus::Matched => {
                        return Err(AppError::invalid_state(
                            Entity::WaitingSlot,
                            slot_id,
                            slot.status,
                        ));
                    }
                }

                let slot = match_repo::transition_slot(
                    tx,
                    slot_id,
                    SlotStatus::Waiting,
                    SlotStatus::Canceled,
                    now,
                )
                .await?
                .ok_or(AppError::SlotUnavailable { slot_id })?;
                let rejected = match_repo::reject_pending_siblings(tx, slot_id, None, now).await?;

                Ok((slot, Some(rejected)))
            })
        })
        .await?;

        // Already canceled: nothing new to announce
        let Some(rejected) = rejected else {
            return Ok(slot);
        };

        log::info!(
            "Slot {} canceled, {} pending requests rejected",
            slot_id,
            rejected.len()
        );

        let mut events = vec![DomainEvent::SlotCanceled {
            team_id: slot.owner_team_id,
            slot_id,
            actor_id,
        }];
        events.extend(rejected.iter().map(|r| rejected_event(r, None)));
        self.notifier.publish_all(events);

        Ok(slot)
    }

    pub async fn list_open_slots(
        &self,
        skill_level: Option<SkillLevel>,
        university: Option<&str>,
    ) -> Result<Vec<MatchWaitingSlot>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(match_repo::get_waiting_slots(&mut conn, skill_level, university).await?)
    }

    pub async fn get_slot(&self, slot_id: Uuid) -> Result<MatchWaitingSlot, AppError> {
        let mut conn = self.pool.acquire().await?;
        match_repo::get_slot_by_id(&mut conn, slot_id)
            .await?
            .ok_or_else(|| slot_not_found(slot_id))
    }

    pub async fn request(
        &self,
        slot_id: Uuid,
        requesting_team_id: Uuid,
        actor_id: Uuid,
        message: Option<String>,
    ) -> Result<MatchRequest, AppError> {
        let request = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let now = Utc::now();
                match_repo::touch_slot(tx, slot_id, now)
                    .await?
                    .ok_or_else(|| slot_not_found(slot_id))?;
                let slot = match_repo::get_slot_by_id(tx, slot_id)
                    .await?
                    .ok_or_else(|| slot_not_found(slot_id))?;

                roles::require_manager(tx, requesting_team_id, actor_id).await?;

                if slot.status != SlotStatus::Waiting {
                    return Err(AppError::SlotUnavailable { slot_id });
                }
                if slot.owner_team_id == requesting_team_id {
                    return Err(AppError::SelfMatch {
                        slot_id,
                        team_id: requesting_team_id,
                    });
                }
                check_eligibility(tx, &slot, requesting_team_id).await?;

                match match_repo::create_match_request(
                    tx,
                    &slot,
                    requesting_team_id,
                    message,
                    actor_id,
                    now,
                )
                .await
                {
                    Ok(request) => Ok(request),
                    Err(e) if is_unique_violation(&e) => Err(AppError::Conflict {
                        entity: Entity::MatchRequest,
                        id: slot_id,
                        reason: ConflictReason::DuplicatePending,
                    }),
                    Err(e) => Err(e.into()),
                }
            })
        })
        .await?;

        log::info!(
            "Team {} requested a match on slot {}",
            requesting_team_id,
            slot_id
        );
        self.notifier.publish(DomainEvent::MatchRequested {
            slot_id,
            request_id: request.id,
            requesting_team_id,
            target_team_id: request.target_team_id,
            actor_id,
        });

        Ok(request)
    }

    /// Accept or reject a pending request. Acceptance matches the slot and
    /// rejects every other pending request on it, all in one transaction
    /// serialized on the slot row.
    pub async fn decide(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        outcome: MatchDecision,
    ) -> Result<MatchRequest, AppError> {
        let status = MatchRequestStatus::from(outcome);

        let slot_id = {
            let mut conn = self.pool.acquire().await?;
            match_repo::get_match_request_by_id(&mut conn, request_id)
                .await?
                .ok_or_else(|| request_not_found(request_id))?
                .waiting_slot_id
        };

        let decided = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let now = Utc::now();
                match_repo::touch_slot(tx, slot_id, now)
                    .await?
                    .ok_or_else(|| slot_not_found(slot_id))?;

                let Some(request) =
                    match_repo::transition_pending(tx, request_id, status, Some(actor_id), now)
                        .await?
                else {
                    return Ok(None);
                };

                roles::require_manager(tx, request.target_team_id, actor_id).await?;

                let mut rejected = Vec::new();
                if outcome == MatchDecision::Accepted {
                    match_repo::transition_slot(
                        tx,
                        slot_id,
                        SlotStatus::Waiting,
                        SlotStatus::Matched,
                        now,
                    )
                    .await?
                    .ok_or(AppError::SlotUnavailable { slot_id })?;

                    rejected =
                        match_repo::reject_pending_siblings(tx, slot_id, Some(request_id), now)
                            .await?;
                }

                Ok(Some((request, rejected)))
            })
        })
        .await?;

        let Some((request, rejected)) = decided else {
            return self.settle_decided(request_id, actor_id, status).await;
        };

        log::info!(
            "Match request {} {} by {}",
            request.id,
            request.status,
            actor_id
        );

        let mut events = vec![match outcome {
            MatchDecision::Accepted => DomainEvent::MatchAccepted {
                slot_id,
                request_id: request.id,
                requesting_team_id: request.requesting_team_id,
                target_team_id: request.target_team_id,
                actor_id,
            },
            MatchDecision::Rejected => rejected_event(&request, Some(actor_id)),
        }];
        events.extend(rejected.iter().map(|r| rejected_event(r, None)));
        self.notifier.publish_all(events);

        Ok(request)
    }

    /// Withdraw a pending request. Only managers of the requesting team may.
    pub async fn cancel(&self, request_id: Uuid, actor_id: Uuid) -> Result<MatchRequest, AppError> {
        let canceled = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let Some(request) = match_repo::transition_pending(
                    tx,
                    request_id,
                    MatchRequestStatus::Canceled,
                    Some(actor_id),
                    Utc::now(),
                )
                .await?
                else {
                    return Ok(None);
                };

                roles::require_manager(tx, request.requesting_team_id, actor_id).await?;

                Ok(Some(request))
            })
        })
        .await?;

        let Some(request) = canceled else {
            return self.settle_canceled(request_id, actor_id).await;
        };

        log::info!("Match request {} canceled by {}", request.id, actor_id);
        self.notifier.publish(DomainEvent::MatchCanceled {
            slot_id: request.waiting_slot_id,
            request_id: request.id,
            requesting_team_id: request.requesting_team_id,
            target_team_id: request.target_team_id,
            actor_id,
        });

        Ok(request)
    }

    /// Requests against a slot, oldest first. Managers of the owner team only.
    pub async fn list_for_slot(
        &self,
        slot_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Vec<MatchRequest>, AppError> {
        let mut conn = self.pool.acquire().await?;
        let slot = match_repo::get_slot_by_id(&mut conn, slot_id)
            .await?
            .ok_or_else(|| slot_not_found(slot_id))?;
        roles::require_manager(&mut conn, slot.owner_team_id, actor_id).await?;

        Ok(match_repo::get_match_requests_by_slot(&mut conn, slot_id).await?)
    }

    pub async fn list_for_team(
        &self,
        team_id: Uuid,
        actor_id: Uuid,
        direction: RequestDirection,
    ) -> Result<Vec<MatchRequest>, AppError> {
        let mut conn = self.pool.acquire().await?;
        if team_repo::get_team_by_id(&mut conn, team_id).await?.is_none() {
            return Err(AppError::NotFound {
                entity: Entity::Team,
                id: team_id,
            });
        }
        roles::require_manager(&mut conn, team_id, actor_id).await?;

        let requests = match direction {
            RequestDirection::Sent => {
                match_repo::get_match_requests_sent_by(&mut conn, team_id).await?
            }
            RequestDirection::Received => {
                match_repo::get_match_requests_received_by(&mut conn, team_id).await?
            }
        };

        Ok(requests)
    }

    async fn settle_decided(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        wanted: MatchRequestStatus,
    ) -> Result<MatchRequest, AppError> {
        let mut conn = self.pool.acquire().await?;
        let request = match_repo::get_match_request_by_id(&mut conn, request_id)
            .await?
            .ok_or_else(|| request_not_found(request_id))?;

        if request.status == wanted && request.decided_by == Some(actor_id) {
            return Ok(request);
        }

        let role = roles::resolve_role(&mut conn, request.target_team_id, actor_id).await?;
        if !roles::can_manage(role) {
            return Err(AppError::Forbidden {
                entity: Entity::MatchRequest,
                id: request_id,
            });
        }

        Err(AppError::invalid_state(
            Entity::MatchRequest,
            request_id,
            request.status,
        ))
    }

    async fn settle_canceled(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> Result<MatchRequest, AppError> {
        let mut conn = self.pool.acquire().await?;
        let request = match_repo::get_match_request_by_id(&mut conn, request_id)
            .await?
            .ok_or_else(|| request_not_found(request_id))?;

        if request.status == MatchRequestStatus::Canceled && request.decided_by == Some(actor_id) {
            return Ok(request);
        }

        let role = roles::resolve_role(&mut conn, request.requesting_team_id, actor_id).await?;
        if !roles::can_manage(role) {
            return Err(AppError::Forbidden {
                entity: Entity::MatchRequest,
                id: request_id,
            });
        }

        Err(AppError::invalid_state(
            Entity::MatchRequest,
            request_id,
            request.status,
        ))
    }
}
