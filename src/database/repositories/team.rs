use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::database::models::{Team, TeamInput, TeamMember, TeamRole};

const TEAM_COLUMNS: &str = r#"
    id,
    name,
    university,
    skill_level,
    team_type,
    description,
    member_count,
    version,
    created_at,
    updated_at
"#;

const MEMBER_COLUMNS: &str = r#"
    team_id,
    user_id,
    role,
    joined_at
"#;

// Team management methods
pub async fn create_team(
    conn: &mut SqliteConnection,
    input: TeamInput,
    now: DateTime<Utc>,
) -> Result<Team, sqlx::Error> {
    let query = format!(
        r#"
            INSERT INTO
                teams (
                    id,
                    name,
                    university,
                    skill_level,
                    team_type,
                    description,
                    member_count,
                    version,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
            RETURNING {TEAM_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Team>(&query)
        .bind(Uuid::new_v4())
        .bind(input.name)
        .bind(input.university)
        .bind(input.skill_level)
        .bind(input.team_type)
        .bind(input.description)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
}

pub async fn get_team_by_id(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<Team>, sqlx::Error> {
    let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?");

    sqlx::query_as::<_, Team>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Newest first.
pub async fn get_teams_by_university(
    conn: &mut SqliteConnection,
    university: &str,
) -> Result<Vec<Team>, sqlx::Error> {
    let query = format!(
        r#"
            SELECT {TEAM_COLUMNS}
            FROM
                teams
            WHERE
                university = ?
            ORDER BY
                rowid DESC
        "#
    );

    sqlx::query_as::<_, Team>(&query)
        .bind(university)
        .fetch_all(&mut *conn)
        .await
}

/// Bumps the row version. Used as the opening write of a transaction so the
/// team row is locked before anything is read.
pub async fn touch_team(
    conn: &mut SqliteConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<()>, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE
                teams
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

pub async fn delete_team(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<()>, sqlx::Error> {
    let result = sqlx::query("DELETE FROM teams WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(if result.rows_affected() > 0 {
        Some(())
    } else {
        None
    })
}

/// Pending join requests, pending match requests on either side, open
/// waiting slots, and accepted requests the team made on another team's
/// slot. Deleting the requester would drop the accepted row and leave that
/// slot matched with nobody.
pub async fn count_open_negotiations(
    conn: &mut SqliteConnection,
    team_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
            SELECT
                (
                    SELECT COUNT(*) FROM join_requests
                    WHERE team_id = ?1 AND status = 'pending'
                ) + (
                    SELECT COUNT(*) FROM match_requests
                    WHERE (requesting_team_id = ?1 OR target_team_id = ?1)
                        AND status = 'pending'
                ) + (
                    SELECT COUNT(*) FROM match_waiting_slots
                    WHERE owner_team_id = ?1 AND status = 'waiting'
                ) + (
                    SELECT COUNT(*) FROM match_requests
                    WHERE requesting_team_id = ?1 AND status = 'accepted'
                )
        "#,
    )
    .bind(team_id)
    .fetch_one(&mut *conn)
    .await
}

// Team member management
pub async fn add_team_member(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_id: Uuid,
    role: TeamRole,
    now: DateTime<Utc>,
) -> Result<TeamMember, sqlx::Error> {
    let query = format!(
        r#"
            INSERT INTO
                team_members (
                    team_id,
                    user_id,
                    role,
                    joined_at
                )
            VALUES
                (?, ?, ?, ?)
            RETURNING {MEMBER_COLUMNS}
        "#
    );

    let member = sqlx::query_as::<_, TeamMember>(&query)
        .bind(team_id)
        .bind(user_id)
        .bind(role)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    sqlx::query("UPDATE teams SET member_count = member_count + 1, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(team_id)
        .execute(&mut *conn)
        .await?;

    Ok(member)
}

pub async fn get_team_member(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<Option<TeamMember>, sqlx::Error> {
    let query = format!("SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = ? AND user_id = ?");

    sqlx::query_as::<_, TeamMember>(&query)
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn get_member_role(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<Option<TeamRole>, sqlx::Error> {
    sqlx::query_scalar::<_, TeamRole>(
        "SELECT role FROM team_members WHERE team_id = ? AND user_id = ?",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn get_team_members(
    conn: &mut SqliteConnection,
    team_id: Uuid,
) -> Result<Vec<TeamMember>, sqlx::Error> {
    let query = format!(
        r#"
            SELECT {MEMBER_COLUMNS}
            FROM
                team_members
            WHERE
                team_id = ?
            ORDER BY
                rowid
        "#
    );

    sqlx::query_as::<_, TeamMember>(&query)
        .bind(team_id)
        .fetch_all(&mut *conn)
        .await
}

pub async fn count_team_members(
    conn: &mut SqliteConnection,
    team_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM team_members WHERE team_id = ?")
        .bind(team_id)
        .fetch_one(&mut *conn)
        .await
}

pub async fn update_member_role(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_id: Uuid,
    role: TeamRole,
) -> Result<Option<TeamMember>, sqlx::Error> {
    let query = format!(
        r#"
            UPDATE
                team_members
            SET
                role = ?
            WHERE
                team_id = ?
                AND user_id = ?
            RETURNING {MEMBER_COLUMNS}
        "#
    );

    sqlx::query_as::<_, TeamMember>(&query)
        .bind(role)
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn remove_team_member(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<()>, sqlx::Error> {
    let result = sqlx::query("DELETE FROM team_members WHERE team_id = ? AND user_id = ?")
        .bind(team_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    sqlx::query("UPDATE teams SET member_count = member_count - 1, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(team_id)
        .execute(&mut *conn)
        .await?;

    Ok(Some(()))
}
