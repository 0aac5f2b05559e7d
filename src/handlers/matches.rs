use actix_web::{
    HttpResponse,
    web::{Data, Json, Path, Query},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::Claims,
    database::models::{
        FinishedMatchInput, MatchDecisionInput, MatchRequestInput, RequestDirection, SkillLevel,
        WaitingSlotInput,
    },
    error::AppError,
    handlers::shared::ApiResponse,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub skill_level: Option<SkillLevel>,
    pub university: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DirectionQuery {
    #[serde(default)]
    pub direction: RequestDirection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeQuery {
    pub team_id: Uuid,
}

pub async fn open_slot(
    claims: Claims,
    state: Data<AppState>,
    input: Json<WaitingSlotInput>,
) -> Result<HttpResponse, AppError> {
    let slot = state
        .match_requests
        .open_slot(claims.user_id(), input.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(slot)))
}

pub async fn list_open_slots(
    state: Data<AppState>,
    query: Query<SlotQuery>,
) -> Result<HttpResponse, AppError> {
    let slots = state
        .match_requests
        .list_open_slots(query.skill_level, query.university.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(slots)))
}

pub async fn get_slot(state: Data<AppState>, path: Path<Uuid>) -> Result<HttpResponse, AppError> {
    let slot = state.match_requests.get_slot(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(slot)))
}

pub async fn cancel_slot(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let slot = state
        .match_requests
        .cancel_slot(path.into_inner(), claims.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(slot)))
}

pub async fn request_match(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
    input: Json<MatchRequestInput>,
) -> Result<HttpResponse, AppError> {
    let MatchRequestInput {
        requesting_team_id,
        message,
    } = input.into_inner();

    let request = state
        .match_requests
        .request(path.into_inner(), requesting_team_id, claims.user_id(), message)
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(request)))
}

pub async fn list_for_slot(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let requests = state
        .match_requests
        .list_for_slot(path.into_inner(), claims.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(requests)))
}

pub async fn list_for_team(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
    query: Query<DirectionQuery>,
) -> Result<HttpResponse, AppError> {
    let requests = state
        .match_requests
        .list_for_team(path.into_inner(), claims.user_id(), query.direction)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(requests)))
}

pub async fn decide(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
    input: Json<MatchDecisionInput>,
) -> Result<HttpResponse, AppError> {
    let request = state
        .match_requests
        .decide(path.into_inner(), claims.user_id(), input.outcome)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn cancel(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let request = state
        .match_requests
        .cancel(path.into_inner(), claims.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn record_result(
    claims: Claims,
    state: Data<AppState>,
    input: Json<FinishedMatchInput>,
) -> Result<HttpResponse, AppError> {
    let finished = state
        .outcome
        .record_result(claims.user_id(), input.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(finished)))
}

pub async fn outcome_of(
    state: Data<AppState>,
    path: Path<Uuid>,
    query: Query<OutcomeQuery>,
) -> Result<HttpResponse, AppError> {
    let match_id = path.into_inner();
    let outcome = state.outcome.outcome_of(match_id, query.team_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "matchId": match_id,
        "teamId": query.team_id,
        "outcome": outcome,
    }))))
}
