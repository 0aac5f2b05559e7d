use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    database::{
        models::{FinishedMatch, FinishedMatchInput, MatchOutcome, TeamRecord},
        repositories::{finished_match as match_repo, team as team_repo},
        transaction::DatabaseTransaction,
    },
    error::{AppError, Entity},
    services::{
        notifier::{DomainEvent, NotificationSink},
        roles,
    },
};

/// Result of a finished match from one side's point of view.
pub fn outcome(finished: &FinishedMatch, team_id: Uuid) -> Result<MatchOutcome, AppError> {
    let (own, other) = if team_id == finished.home_team_id {
        (finished.home_score, finished.away_score)
    } else if team_id == finished.away_team_id {
        (finished.away_score, finished.home_score)
    } else {
        return Err(AppError::NotParticipant {
            match_id: finished.id,
            team_id,
        });
    };

    Ok(match own.cmp(&other) {
        std::cmp::Ordering::Greater => MatchOutcome::Win,
        std::cmp::Ordering::Less => MatchOutcome::Lose,
        std::cmp::Ordering::Equal => MatchOutcome::Draw,
    })
}

fn validate_result(input: &FinishedMatchInput) -> Result<(), AppError> {
    if input.home_team_id == input.away_team_id {
        return Err(AppError::BadRequest(
            "A team cannot play against itself".to_string(),
        ));
    }
    if input.home_score < 0 || input.away_score < 0 {
        return Err(AppError::BadRequest("Scores cannot be negative".to_string()));
    }
    if input.venue.trim().is_empty() {
        return Err(AppError::BadRequest("Venue is required".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct OutcomeService {
    pool: SqlitePool,
    notifier: Arc<dyn NotificationSink>,
}

impl OutcomeService {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { pool, notifier }
    }

    pub async fn outcome_of(&self, match_id: Uuid, team_id: Uuid) -> Result<MatchOutcome, AppError> {
        let mut conn = self.pool.acquire().await?;
        let finished = match_repo::get_finished_match_by_id(&mut conn, match_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: Entity::FinishedMatch,
                id: match_id,
            })?;

        outcome(&finished, team_id)
    }

    /// Store a played match. Either side's managers may record it; once
    /// stored it never changes.
    pub async fn record_result(
        &self,
        actor_id: Uuid,
        input: FinishedMatchInput,
    ) -> Result<FinishedMatch, AppError> {
        validate_result(&input)?;

        let finished = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let finished =
                    match_repo::create_finished_match(tx, input, actor_id, Utc::now()).await?;

                for team_id in [finished.home_team_id, finished.away_team_id] {
                    if team_repo::get_team_by_id(tx, team_id).await?.is_none() {
                        return Err(AppError::NotFound {
                            entity: Entity::Team,
                            id: team_id,
                        });
                    }
                }

                let home = roles::resolve_role(tx, finished.home_team_id, actor_id).await?;
                let away = roles::resolve_role(tx, finished.away_team_id, actor_id).await?;
                if !roles::can_manage(home) && !roles::can_manage(away) {
                    return Err(AppError::Forbidden {
                        entity: Entity::FinishedMatch,
                        id: finished.id,
                    });
                }

                Ok(finished)
            })
        })
        .await?;

        log::info!(
            "Result {}-{} recorded for match {}",
            finished.home_score,
            finished.away_score,
            finished.id
        );
        self.notifier.publish(DomainEvent::ResultRecorded {
            match_id: finished.id,
            home_team_id: finished.home_team_id,
            away_team_id: finished.away_team_id,
            actor_id,
        });

        Ok(finished)
    }

    /// Wins, losses and draws over every recorded match of the team.
    pub async fn team_record(&self, team_id: Uuid) -> Result<TeamRecord, AppError> {
        let mut conn = self.pool.acquire().await?;
        if team_repo::get_team_by_id(&mut conn, team_id).await?.is_none() {
            return Err(AppError::NotFound {
                entity: Entity::Team,
                id: team_id,
            });
        }

        let matches = match_repo::get_finished_matches_for_team(&mut conn, team_id).await?;

        let mut record = TeamRecord::new(team_id);
        for finished in &matches {
            record.tally(outcome(finished, team_id)?);
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;

    fn finished(home_score: i64, away_score: i64) -> FinishedMatch {
        FinishedMatch {
            id: Uuid::new_v4(),
            home_team_id: Uuid::new_v4(),
            away_team_id: Uuid::new_v4(),
            home_score,
            away_score,
            match_date: NaiveDate::from_ymd_opt(2026, 4, 12).unwrap(),
            venue: "North field".to_string(),
            recorded_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn higher_score_wins() {
        let m = finished(3, 1);
        assert_eq!(outcome(&m, m.home_team_id).unwrap(), MatchOutcome::Win);
        assert_eq!(outcome(&m, m.away_team_id).unwrap(), MatchOutcome::Lose);
    }

    #[test]
    fn away_side_can_win() {
        let m = finished(0, 2);
        assert_eq!(outcome(&m, m.home_team_id).unwrap(), MatchOutcome::Lose);
        assert_eq!(outcome(&m, m.away_team_id).unwrap(), MatchOutcome::Win);
    }

    #[test]
    fn equal_scores_draw_for_both_sides() {
        let m = finished(2, 2);
        assert_eq!(outcome(&m, m.home_team_id).unwrap(), MatchOutcome::Draw);
        assert_eq!(outcome(&m, m.away_team_id).unwrap(), MatchOutcome::Draw);
    }

    #[test]
    fn outcomes_are_never_both_win_or_both_lose() {
        for (home, away) in [(0, 0), (1, 0), (0, 1), (5, 4), (4, 5)] {
            let m = finished(home, away);
            let h = outcome(&m, m.home_team_id).unwrap();
            let a = outcome(&m, m.away_team_id).unwrap();
            match h {
                MatchOutcome::Win => assert_eq!(a, MatchOutcome::Lose),
                MatchOutcome::Lose => assert_eq!(a, MatchOutcome::Win),
                MatchOutcome::Draw => assert_eq!(a, MatchOutcome::Draw),
            }
        }
    }

    #[test]
    fn outsiders_are_not_participants() {
        let m = finished(1, 0);
        let outsider = Uuid::new_v4();
        assert!(matches!(
            outcome(&m, outsider),
            Err(AppError::NotParticipant { team_id, .. }) if team_id == outsider
        ));
    }

    #[test]
    fn results_are_validated() {
        let m = finished(1, 0);
        let mut input = FinishedMatchInput {
            home_team_id: m.home_team_id,
            away_team_id: m.home_team_id,
            home_score: 1,
            away_score: 0,
            match_date: m.match_date,
            venue: m.venue.clone(),
        };
        assert!(validate_result(&input).is_err());

        input.away_team_id = m.away_team_id;
        input.home_score = -1;
        assert!(validate_result(&input).is_err());

        input.home_score = 1;
        assert!(validate_result(&input).is_ok());
    }
}
