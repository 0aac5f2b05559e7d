use actix_web::{
    HttpResponse,
    web::{Data, Json, Path, Query},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::Claims,
    database::models::{TeamInput, TeamRole},
    error::AppError,
    handlers::shared::ApiResponse,
    services::listing::TeamFilter,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamListQuery {
    pub university: String,
    /// Comma separated, e.g. `amateur,semi_pro`
    pub skill_levels: Option<String>,
    pub team_types: Option<String>,
    pub max_member_count: Option<i64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleInput {
    pub role: TeamRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferLeadershipInput {
    pub new_leader_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

fn parse_list<T: std::str::FromStr<Err = String>>(raw: Option<&str>) -> Result<Vec<T>, AppError> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<T>().map_err(AppError::BadRequest))
            .collect()
    })
    .unwrap_or_else(|| Ok(Vec::new()))
}

pub async fn list_teams(
    state: Data<AppState>,
    query: Query<TeamListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = TeamFilter {
        skill_levels: parse_list(query.skill_levels.as_deref())?,
        team_types: parse_list(query.team_types.as_deref())?,
        max_member_count: query.max_member_count,
    };

    let page = state
        .listing
        .list_teams(
            &query.university,
            &filter,
            query.page.unwrap_or(0),
            query.page_size.unwrap_or(20),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

pub async fn create_team(
    claims: Claims,
    state: Data<AppState>,
    input: Json<TeamInput>,
) -> Result<HttpResponse, AppError> {
    let team = state
        .membership
        .create_team(claims.user_id(), input.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(team)))
}

pub async fn get_team(state: Data<AppState>, path: Path<Uuid>) -> Result<HttpResponse, AppError> {
    let team = state.membership.get_team(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(team)))
}

pub async fn delete_team(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .membership
        .delete_team(path.into_inner(), claims.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        None,
        "Team deleted",
    )))
}

pub async fn can_delete_team(
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let deletable = state.membership.can_delete_team(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "deletable": deletable
    }))))
}

pub async fn list_members(
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let members = state.membership.list_members(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(members)))
}

pub async fn change_role(
    claims: Claims,
    state: Data<AppState>,
    path: Path<(Uuid, Uuid)>,
    input: Json<ChangeRoleInput>,
) -> Result<HttpResponse, AppError> {
    let (team_id, user_id) = path.into_inner();
    let member = state
        .membership
        .change_role(team_id, claims.user_id(), user_id, input.role)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(member)))
}

pub async fn remove_member(
    claims: Claims,
    state: Data<AppState>,
    path: Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (team_id, user_id) = path.into_inner();
    state
        .membership
        .remove_member(team_id, claims.user_id(), user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        None,
        "Member removed",
    )))
}

pub async fn transfer_leadership(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
    input: Json<TransferLeadershipInput>,
) -> Result<HttpResponse, AppError> {
    let leader = state
        .membership
        .transfer_leadership(path.into_inner(), claims.user_id(), input.new_leader_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(leader)))
}

pub async fn exit_team(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .membership
        .exit(path.into_inner(), claims.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        None,
        "Left the team",
    )))
}

pub async fn team_record(
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let record = state.outcome.team_record(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(record)))
}

pub async fn team_activity(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
    query: Query<ActivityQuery>,
) -> Result<HttpResponse, AppError> {
    let activity = state
        .membership
        .team_activity(path.into_inner(), claims.user_id(), query.limit.unwrap_or(50))
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(activity)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::SkillLevel;
    use pretty_assertions::assert_eq;

    #[test]
    fn comma_separated_lists_are_parsed() {
        let levels: Vec<SkillLevel> = parse_list(Some("amateur, semi_pro,")).unwrap();
        assert_eq!(levels, vec![SkillLevel::Amateur, SkillLevel::SemiPro]);

        let none: Vec<SkillLevel> = parse_list(None).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn unknown_values_are_bad_requests() {
        let result: Result<Vec<SkillLevel>, _> = parse_list(Some("legendary"));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
