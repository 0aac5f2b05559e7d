use actix_web::{
    HttpResponse,
    web::{Data, Json, Path, Query},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::Claims,
    database::models::{ApplyToJoinInput, JoinDecisionInput, JoinRequestStatus},
    error::AppError,
    handlers::shared::ApiResponse,
};

#[derive(Debug, Deserialize)]
pub struct JoinRequestQuery {
    pub status: Option<JoinRequestStatus>,
}

pub async fn apply(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
    input: Option<Json<ApplyToJoinInput>>,
) -> Result<HttpResponse, AppError> {
    let message = input.and_then(|input| input.into_inner().message);
    let request = state
        .join_requests
        .apply(path.into_inner(), claims.user_id(), message)
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(request)))
}

pub async fn list_for_team(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
    query: Query<JoinRequestQuery>,
) -> Result<HttpResponse, AppError> {
    let requests = state
        .join_requests
        .list_for_team(path.into_inner(), claims.user_id(), query.status)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(requests)))
}

pub async fn list_mine(claims: Claims, state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let requests = state
        .join_requests
        .list_for_applicant(claims.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(requests)))
}

pub async fn get_request(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let request = state
        .join_requests
        .get(path.into_inner(), claims.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn decide(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
    input: Json<JoinDecisionInput>,
) -> Result<HttpResponse, AppError> {
    let JoinDecisionInput { outcome, reason } = input.into_inner();
    let request = state
        .join_requests
        .decide(path.into_inner(), claims.user_id(), outcome, reason)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn cancel(
    claims: Claims,
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let request = state
        .join_requests
        .cancel(path.into_inner(), claims.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}
