use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::{
    models::{CreateActivityInput, TeamRole},
    repositories::activity as activity_repo,
};

/// Domain events published after a transition commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TeamCreated {
        team_id: Uuid,
        leader_id: Uuid,
    },
    TeamDeleted {
        team_id: Uuid,
        actor_id: Uuid,
    },
    JoinRequested {
        team_id: Uuid,
        request_id: Uuid,
        applicant_id: Uuid,
    },
    JoinApproved {
        team_id: Uuid,
        request_id: Uuid,
        applicant_id: Uuid,
        actor_id: Uuid,
    },
    JoinRejected {
        team_id: Uuid,
        request_id: Uuid,
        applicant_id: Uuid,
        actor_id: Uuid,
    },
    JoinCanceled {
        team_id: Uuid,
        request_id: Uuid,
        applicant_id: Uuid,
    },
    SlotOpened {
        team_id: Uuid,
        slot_id: Uuid,
        actor_id: Uuid,
    },
    SlotCanceled {
        team_id: Uuid,
        slot_id: Uuid,
        actor_id: Uuid,
    },
    MatchRequested {
        slot_id: Uuid,
        request_id: Uuid,
        requesting_team_id: Uuid,
        target_team_id: Uuid,
        actor_id: Uuid,
    },
    MatchAccepted {
        slot_id: Uuid,
        request_id: Uuid,
        requesting_team_id: Uuid,
        target_team_id: Uuid,
        actor_id: Uuid,
    },
    /// `actor_id` is `None` when the system rejected a sibling request.
    MatchRejected {
        slot_id: Uuid,
        request_id: Uuid,
        requesting_team_id: Uuid,
        target_team_id: Uuid,
        actor_id: Option<Uuid>,
    },
    MatchCanceled {
        slot_id: Uuid,
        request_id: Uuid,
        requesting_team_id: Uuid,
        target_team_id: Uuid,
        actor_id: Uuid,
    },
    MemberExited {
        team_id: Uuid,
        user_id: Uuid,
    },
    MemberRemoved {
        team_id: Uuid,
        user_id: Uuid,
        actor_id: Uuid,
    },
    RoleChanged {
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
        actor_id: Uuid,
    },
    LeadershipTransferred {
        team_id: Uuid,
        previous_leader_id: Uuid,
        new_leader_id: Uuid,
    },
    ResultRecorded {
        match_id: Uuid,
        home_team_id: Uuid,
        away_team_id: Uuid,
        actor_id: Uuid,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::TeamCreated { .. } => "team_created",
            DomainEvent::TeamDeleted { .. } => "team_deleted",
            DomainEvent::JoinRequested { .. } => "join_requested",
            DomainEvent::JoinApproved { .. } => "join_approved",
            DomainEvent::JoinRejected { .. } => "join_rejected",
            DomainEvent::JoinCanceled { .. } => "join_canceled",
            DomainEvent::SlotOpened { .. } => "slot_opened",
            DomainEvent::SlotCanceled { .. } => "slot_canceled",
            DomainEvent::MatchRequested { .. } => "match_requested",
            DomainEvent::MatchAccepted { .. } => "match_accepted",
            DomainEvent::MatchRejected { .. } => "match_rejected",
            DomainEvent::MatchCanceled { .. } => "match_canceled",
            DomainEvent::MemberExited { .. } => "member_exited",
            DomainEvent::MemberRemoved { .. } => "member_removed",
            DomainEvent::RoleChanged { .. } => "role_changed",
            DomainEvent::LeadershipTransferred { .. } => "leadership_transferred",
            DomainEvent::ResultRecorded { .. } => "result_recorded",
        }
    }

    /// Teams whose activity log should carry the event.
    pub fn team_ids(&self) -> Vec<Uuid> {
        match self {
            DomainEvent::TeamCreated { team_id, .. }
            | DomainEvent::TeamDeleted { team_id, .. }
            | DomainEvent::JoinRequested { team_id, .. }
            | DomainEvent::JoinApproved { team_id, .. }
            | DomainEvent::JoinRejected { team_id, .. }
            | DomainEvent::JoinCanceled { team_id, .. }
            | DomainEvent::SlotOpened { team_id, .. }
            | DomainEvent::SlotCanceled { team_id, .. }
            | DomainEvent::MemberExited { team_id, .. }
            | DomainEvent::MemberRemoved { team_id, .. }
            | DomainEvent::RoleChanged { team_id, .. }
            | DomainEvent::LeadershipTransferred { team_id, .. } => vec![*team_id],
            DomainEvent::MatchRequested {
                requesting_team_id,
                target_team_id,
                ..
            }
            | DomainEvent::MatchAccepted {
                requesting_team_id,
                target_team_id,
                ..
            }
            | DomainEvent::MatchRejected {
                requesting_team_id,
                target_team_id,
                ..
            }
            | DomainEvent::MatchCanceled {
                requesting_team_id,
                target_team_id,
                ..
            } => vec![*requesting_team_id, *target_team_id],
            DomainEvent::ResultRecorded {
                home_team_id,
                away_team_id,
                ..
            } => vec![*home_team_id, *away_team_id],
        }
    }

    pub fn actor_id(&self) -> Option<Uuid> {
        match self {
            DomainEvent::TeamCreated { leader_id, .. } => Some(*leader_id),
            DomainEvent::JoinRequested { applicant_id, .. }
            | DomainEvent::JoinCanceled { applicant_id, .. } => Some(*applicant_id),
            DomainEvent::MemberExited { user_id, .. } => Some(*user_id),
            DomainEvent::LeadershipTransferred {
                previous_leader_id, ..
            } => Some(*previous_leader_id),
            DomainEvent::MatchRejected { actor_id, .. } => *actor_id,
            DomainEvent::TeamDeleted { actor_id, .. }
            | DomainEvent::JoinApproved { actor_id, .. }
            | DomainEvent::JoinRejected { actor_id, .. }
            | DomainEvent::SlotOpened { actor_id, .. }
            | DomainEvent::SlotCanceled { actor_id, .. }
            | DomainEvent::MatchRequested { actor_id, .. }
            | DomainEvent::MatchAccepted { actor_id, .. }
            | DomainEvent::MatchCanceled { actor_id, .. }
            | DomainEvent::MemberRemoved { actor_id, .. }
            | DomainEvent::RoleChanged { actor_id, .. }
            | DomainEvent::ResultRecorded { actor_id, .. } => Some(*actor_id),
        }
    }

    /// The row the event is about.
    pub fn entity_id(&self) -> Uuid {
        match self {
            DomainEvent::TeamCreated { team_id, .. } | DomainEvent::TeamDeleted { team_id, .. } => {
                *team_id
            }
            DomainEvent::JoinRequested { request_id, .. }
            | DomainEvent::JoinApproved { request_id, .. }
            | DomainEvent::JoinRejected { request_id, .. }
            | DomainEvent::JoinCanceled { request_id, .. }
            | DomainEvent::MatchRequested { request_id, .. }
            | DomainEvent::MatchAccepted { request_id, .. }
            | DomainEvent::MatchRejected { request_id, .. }
            | DomainEvent::MatchCanceled { request_id, .. } => *request_id,
            DomainEvent::SlotOpened { slot_id, .. } | DomainEvent::SlotCanceled { slot_id, .. } => {
                *slot_id
            }
            DomainEvent::MemberExited { user_id, .. }
            | DomainEvent::MemberRemoved { user_id, .. }
            | DomainEvent::RoleChanged { user_id, .. } => *user_id,
            DomainEvent::LeadershipTransferred { new_leader_id, .. } => *new_leader_id,
            DomainEvent::ResultRecorded { match_id, .. } => *match_id,
        }
    }
}

/// Receives domain events. Publishing never blocks and never fails the
/// operation that produced the event; delivery is at-least-once at best.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, event: DomainEvent);

    fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

/// Persists events to the activity log on a background task.
#[derive(Clone)]
pub struct ActivityNotifier {
    pool: SqlitePool,
}

impl ActivityNotifier {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write the event synchronously, one row per involved team.
    pub async fn record(&self, event: &DomainEvent) -> Result<(), sqlx::Error> {
        let payload = serde_json::to_value(event).unwrap_or_default();
        let mut conn = self.pool.acquire().await?;

        for team_id in event.team_ids() {
            activity_repo::log_activity(
                &mut conn,
                CreateActivityInput {
                    team_id,
                    actor_id: event.actor_id(),
                    event_type: event.event_type(),
                    entity_id: event.entity_id(),
                    payload: payload.clone(),
                },
            )
            .await?;
        }

        Ok(())
    }
}

impl NotificationSink for ActivityNotifier {
    fn publish(&self, event: DomainEvent) {
        log::info!("Domain event {}: {:?}", event.event_type(), event);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::warn!(
                "No runtime available, dropping {} event",
                event.event_type()
            );
            return;
        };

        let notifier = self.clone();
        handle.spawn(async move {
            if let Err(e) = notifier.record(&event).await {
                log::warn!("Failed to record {} event: {}", event.event_type(), e);
            }
        });
    }
}
