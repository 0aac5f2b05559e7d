use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::database::models::{JoinRequest, JoinRequestStatus};

const JOIN_REQUEST_COLUMNS: &str = r#"
    id,
    team_id,
    applicant_id,
    message,
    status,
    decided_by,
    decided_at,
    reason,
    created_at,
    updated_at
"#;

/// Create a new pending join request
pub async fn create_join_request(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    applicant_id: Uuid,
    message: Option<String>,
    now: DateTime<Utc>,
) -> Result<JoinRequest, sqlx::Error> {
    let query = format!(
        r#"
            INSERT INTO
                join_requests (
                    id,
                    team_id,
                    applicant_id,
                    message,
                    status,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?)
            RETURNING {JOIN_REQUEST_COLUMNS}
        "#
    );

    sqlx::query_as::<_, JoinRequest>(&query)
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(applicant_id)
        .bind(message)
        .bind(JoinRequestStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
}

pub async fn get_join_request_by_id(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<JoinRequest>, sqlx::Error> {
    let query = format!("SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests WHERE id = ?");

    sqlx::query_as::<_, JoinRequest>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Requests for a team in creation order (oldest first)
pub async fn get_join_requests_by_team(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    status: Option<JoinRequestStatus>,
) -> Result<Vec<JoinRequest>, sqlx::Error> {
    let query = format!(
        r#"
            SELECT {JOIN_REQUEST_COLUMNS}
            FROM
                join_requests
            WHERE
                team_id = ?
                AND (? IS NULL OR status = ?)
            ORDER BY
                rowid ASC
        "#
    );

    sqlx::query_as::<_, JoinRequest>(&query)
        .bind(team_id)
        .bind(status)
        .bind(status)
        .fetch_all(&mut *conn)
        .await
}

pub async fn get_join_requests_by_applicant(
    conn: &mut SqliteConnection,
    applicant_id: Uuid,
) -> Result<Vec<JoinRequest>, sqlx::Error> {
    let query = format!(
        r#"
            SELECT {JOIN_REQUEST_COLUMNS}
            FROM
                join_requests
            WHERE
                applicant_id = ?
            ORDER BY
                rowid DESC
        "#
    );

    sqlx::query_as::<_, JoinRequest>(&query)
        .bind(applicant_id)
        .fetch_all(&mut *conn)
        .await
}

/// Move a pending request to a terminal status. Returns `None` when the
/// request is missing or no longer pending, so concurrent deciders cannot
/// both win.
pub async fn transition_pending(
    conn: &mut SqliteConnection,
    id: Uuid,
    status: JoinRequestStatus,
    decided_by: Option<Uuid>,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<Option<JoinRequest>, sqlx::Error> {
    let query = format!(
        r#"
            UPDATE
                join_requests
            SET
                status = ?,
                decided_by = ?,
                decided_at = ?,
                reason = ?,
                updated_at = ?
            WHERE
                id = ?
                AND status = 'pending'
            RETURNING {JOIN_REQUEST_COLUMNS}
        "#
    );

    sqlx::query_as::<_, JoinRequest>(&query)
        .bind(status)
        .bind(decided_by)
        .bind(now)
        .bind(reason)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}
