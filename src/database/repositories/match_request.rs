use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::database::models::{
    MatchRequest, MatchRequestStatus, MatchWaitingSlot, SkillLevel, SlotStatus, WaitingSlotInput,
};

const SLOT_COLUMNS: &str = r#"
    id,
    owner_team_id,
    preferred_date,
    time_start,
    time_end,
    venue_id,
    skill_level_min,
    skill_level_max,
    university_only,
    message,
    status,
    version,
    created_by,
    created_at,
    updated_at
"#;

const REQUEST_COLUMNS: &str = r#"
    id,
    waiting_slot_id,
    requesting_team_id,
    target_team_id,
    request_message,
    status,
    decided_by,
    decided_at,
    created_by,
    created_at,
    updated_at
"#;

// Waiting slots
pub async fn create_slot(
    conn: &mut SqliteConnection,
    input: WaitingSlotInput,
    created_by: Uuid,
    now: DateTime<Utc>,
) -> Result<MatchWaitingSlot, sqlx::Error> {
    let query = format!(
        r#"
            INSERT INTO
                match_waiting_slots (
                    id,
                    owner_team_id,
                    preferred_date,
                    time_start,
                    time_end,
                    venue_id,
                    skill_level_min,
                    skill_level_max,
                    university_only,
                    message,
                    status,
                    version,
                    created_by,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            RETURNING {SLOT_COLUMNS}
        "#
    );

    sqlx::query_as::<_, MatchWaitingSlot>(&query)
        .bind(Uuid::new_v4())
        .bind(input.owner_team_id)
        .bind(input.preferred_date)
        .bind(input.time_start)
        .bind(input.time_end)
        .bind(input.venue_id)
        .bind(input.skill_level_min)
        .bind(input.skill_level_max)
        .bind(input.university_only)
        .bind(input.message)
        .bind(SlotStatus::Waiting)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
}

pub async fn get_slot_by_id(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<MatchWaitingSlot>, sqlx::Error> {
    let query = format!("SELECT {SLOT_COLUMNS} FROM match_waiting_slots WHERE id = ?");

    sqlx::query_as::<_, MatchWaitingSlot>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Open slots, soonest first. A skill level keeps only slots that accept it;
/// a university keeps only slots owned by teams from it.
pub async fn get_waiting_slots(
    conn: &mut SqliteConnection,
    skill_level: Option<SkillLevel>,
    university: Option<&str>,
) -> Result<Vec<MatchWaitingSlot>, sqlx::Error> {
    let query = format!(
        r#"
            SELECT {SLOT_COLUMNS}
            FROM
                match_waiting_slots
            WHERE
                status = 'waiting'
                AND (
                    ?1 IS NULL
                    OR owner_team_id IN (SELECT id FROM teams WHERE university = ?1)
                )
            ORDER BY
                preferred_date ASC,
                time_start ASC,
                rowid ASC
        "#
    );

    let slots = sqlx::query_as::<_, MatchWaitingSlot>(&query)
        .bind(university)
        .fetch_all(&mut *conn)
        .await?;

    // Skill levels are stored as names, so ordering is applied here
    Ok(match skill_level {
        Some(level) => slots.into_iter().filter(|s| s.accepts_skill(level)).collect(),
        None => slots,
    })
}

/// Lock the slot row for the rest of the transaction.
pub async fn touch_slot(
    conn: &mut SqliteConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<()>, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE
                match_waiting_slots
            SET
                version = version + 1,
                updated_at = ?
            WHERE
                id = ?
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(if result.rows_affected() > 0 {
        Some(())
    } else {
        None
    })
}

/// Compare-and-swap on the slot status.
pub async fn transition_slot(
    conn: &mut SqliteConnection,
    id: Uuid,
    from: SlotStatus,
    to: SlotStatus,
    now: DateTime<Utc>,
) -> Result<Option<MatchWaitingSlot>, sqlx::Error> {
    let query = format!(
        r#"
            UPDATE
                match_waiting_slots
            SET
                status = ?,
                updated_at = ?
            WHERE
                id = ?
                AND status = ?
            RETURNING {SLOT_COLUMNS}
        "#
    );

    sqlx::query_as::<_, MatchWaitingSlot>(&query)
        .bind(to)
        .bind(now)
        .bind(id)
        .bind(from)
        .fetch_optional(&mut *conn)
        .await
}

// Match requests
pub async fn create_match_request(
    conn: &mut SqliteConnection,
    slot: &MatchWaitingSlot,
    requesting_team_id: Uuid,
    message: Option<String>,
    created_by: Uuid,
    now: DateTime<Utc>,
) -> Result<MatchRequest, sqlx::Error> {
    let query = format!(
        r#"
            INSERT INTO
                match_requests (
                    id,
                    waiting_slot_id,
                    requesting_team_id,
                    target_team_id,
                    request_message,
                    status,
                    created_by,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {REQUEST_COLUMNS}
        "#
    );

    sqlx::query_as::<_, MatchRequest>(&query)
        .bind(Uuid::new_v4())
        .bind(slot.id)
        .bind(requesting_team_id)
        .bind(slot.owner_team_id)
        .bind(message)
        .bind(MatchRequestStatus::Pending)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
}

pub async fn get_match_request_by_id(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<MatchRequest>, sqlx::Error> {
    let query = format!("SELECT {REQUEST_COLUMNS} FROM match_requests WHERE id = ?");

    sqlx::query_as::<_, MatchRequest>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// All requests against a slot, oldest first
pub async fn get_match_requests_by_slot(
    conn: &mut SqliteConnection,
    slot_id: Uuid,
) -> Result<Vec<MatchRequest>, sqlx::Error> {
    let query = format!(
        r#"
            SELECT {REQUEST_COLUMNS}
            FROM
                match_requests
            WHERE
                waiting_slot_id = ?
            ORDER BY
                rowid ASC
        "#
    );

    sqlx::query_as::<_, MatchRequest>(&query)
        .bind(slot_id)
        .fetch_all(&mut *conn)
        .await
}

pub async fn get_match_requests_sent_by(
    conn: &mut SqliteConnection,
    team_id: Uuid,
) -> Result<Vec<MatchRequest>, sqlx::Error> {
    let query = format!(
        r#"
            SELECT {REQUEST_COLUMNS}
            FROM
                match_requests
            WHERE
                requesting_team_id = ?
            ORDER BY
                rowid DESC
        "#
    );

    sqlx::query_as::<_, MatchRequest>(&query)
        .bind(team_id)
        .fetch_all(&mut *conn)
        .await
}

pub async fn get_match_requests_received_by(
    conn: &mut SqliteConnection,
    team_id: Uuid,
) -> Result<Vec<MatchRequest>, sqlx::Error> {
    let query = format!(
        r#"
            SELECT {REQUEST_COLUMNS}
            FROM
                match_requests
            WHERE
                target_team_id = ?
            ORDER BY
                rowid ASC
        "#
    );

    sqlx::query_as::<_, MatchRequest>(&query)
        .bind(team_id)
        .fetch_all(&mut *conn)
        .await
}

/// Compare-and-swap a pending request into a terminal status.
pub async fn transition_pending(
    conn: &mut SqliteConnection,
    id: Uuid,
    status: MatchRequestStatus,
    decided_by: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Option<MatchRequest>, sqlx::Error> {
    let query = format!(
        r#"
            UPDATE
                match_requests
            SET
                status = ?,
                decided_by = ?,
                decided_at = ?,
                updated_at = ?
            WHERE
                id = ?
                AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
        "#
    );

    sqlx::query_as::<_, MatchRequest>(&query)
        .bind(status)
        .bind(decided_by)
        .bind(now)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// System rejection of every other pending request on the slot.
pub async fn reject_pending_siblings(
    conn: &mut SqliteConnection,
    slot_id: Uuid,
    except_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Vec<MatchRequest>, sqlx::Error> {
    let query = format!(
        r#"
            UPDATE
                match_requests
            SET
                status = 'rejected',
                decided_by = NULL,
                decided_at = ?,
                updated_at = ?
            WHERE
                waiting_slot_id = ?
                AND status = 'pending'
                AND (? IS NULL OR id <> ?)
            RETURNING {REQUEST_COLUMNS}
        "#
    );

    sqlx::query_as::<_, MatchRequest>(&query)
        .bind(now)
        .bind(now)
        .bind(slot_id)
        .bind(except_id)
        .bind(except_id)
        .fetch_all(&mut *conn)
        .await
}
