use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::database::models::{ActivityRecord, CreateActivityInput};

const ACTIVITY_COLUMNS: &str = r#"
    id,
    team_id,
    actor_id,
    event_type,
    entity_id,
    payload,
    created_at
"#;

/// Log a new activity
pub async fn log_activity(
    conn: &mut SqliteConnection,
    input: CreateActivityInput,
) -> Result<ActivityRecord, sqlx::Error> {
    let query = format!(
        r#"
            INSERT INTO
                activity_log (
                    id,
                    team_id,
                    actor_id,
                    event_type,
                    entity_id,
                    payload,
                    created_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?)
            RETURNING {ACTIVITY_COLUMNS}
        "#
    );

    sqlx::query_as::<_, ActivityRecord>(&query)
        .bind(Uuid::new_v4())
        .bind(input.team_id)
        .bind(input.actor_id)
        .bind(input.event_type)
        .bind(input.entity_id)
        .bind(input.payload.to_string())
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await
}

pub async fn get_team_activity(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    limit: i64,
) -> Result<Vec<ActivityRecord>, sqlx::Error> {
    let query = format!(
        r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM
                activity_log
            WHERE
                team_id = ?
            ORDER BY
                rowid DESC
            LIMIT ?
        "#
    );

    sqlx::query_as::<_, ActivityRecord>(&query)
        .bind(team_id)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await
}
