use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FinishedMatch {
    pub id: Uuid,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub home_score: i64,
    pub away_score: i64,
    pub match_date: NaiveDate,
    pub venue: String,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedMatchInput {
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub home_score: i64,
    pub away_score: i64,
    pub match_date: NaiveDate,
    pub venue: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchOutcome {
    Win,
    Lose,
    Draw,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecord {
    pub team_id: Uuid,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl TeamRecord {
    pub fn new(team_id: Uuid) -> Self {
        Self {
            team_id,
            ..Default::default()
        }
    }

    pub fn tally(&mut self, outcome: MatchOutcome) {
        self.played += 1;
        match outcome {
            MatchOutcome::Win => self.wins += 1,
            MatchOutcome::Lose => self.losses += 1,
            MatchOutcome::Draw => self.draws += 1,
        }
    }
}
