use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::database::models::{FinishedMatch, FinishedMatchInput};

const MATCH_COLUMNS: &str = r#"
    id,
    home_team_id,
    away_team_id,
    home_score,
    away_score,
    match_date,
    venue,
    recorded_by,
    created_at
"#;

pub async fn create_finished_match(
    conn: &mut SqliteConnection,
    input: FinishedMatchInput,
    recorded_by: Uuid,
    now: DateTime<Utc>,
) -> Result<FinishedMatch, sqlx::Error> {
    let query = format!(
        r#"
            INSERT INTO
                finished_matches (
                    id,
                    home_team_id,
                    away_team_id,
                    home_score,
                    away_score,
                    match_date,
                    venue,
                    recorded_by,
                    created_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {MATCH_COLUMNS}
        "#
    );

    sqlx::query_as::<_, FinishedMatch>(&query)
        .bind(Uuid::new_v4())
        .bind(input.home_team_id)
        .bind(input.away_team_id)
        .bind(input.home_score)
        .bind(input.away_score)
        .bind(input.match_date)
        .bind(input.venue)
        .bind(recorded_by)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
}

pub async fn get_finished_match_by_id(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<FinishedMatch>, sqlx::Error> {
    let query = format!("SELECT {MATCH_COLUMNS} FROM finished_matches WHERE id = ?");

    sqlx::query_as::<_, FinishedMatch>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Matches the team played on either side, most recent first
pub async fn get_finished_matches_for_team(
    conn: &mut SqliteConnection,
    team_id: Uuid,
) -> Result<Vec<FinishedMatch>, sqlx::Error> {
    let query = format!(
        r#"
            SELECT {MATCH_COLUMNS}
            FROM
                finished_matches
            WHERE
                home_team_id = ?1
                OR away_team_id = ?1
            ORDER BY
                match_date DESC,
                rowid DESC
        "#
    );

    sqlx::query_as::<_, FinishedMatch>(&query)
        .bind(team_id)
        .fetch_all(&mut *conn)
        .await
}
