use actix_web::{App, http::StatusCode, test, web};
use kickoff::{AppState, auth::issue_token, routes, services::ActivityNotifier};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

mod common;

macro_rules! init_app {
    ($ctx:expr) => {{
        let state = web::Data::new(AppState::new(
            $ctx.pool.clone(),
            Arc::new(ActivityNotifier::new($ctx.pool.clone())),
        ));
        test::init_service(
            App::new()
                .app_data(state)
                .app_data(web::Data::new($ctx.config.clone()))
                .configure(routes::configure),
        )
        .await
    }};
}

fn token(ctx: &common::TestContext, user_id: Uuid) -> String {
    issue_token(user_id, &ctx.config).unwrap()
}

#[actix_web::test]
async fn test_requests_without_token_are_unauthorized() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/v1/teams")
        .set_json(json!({
            "name": "Lions",
            "university": "Hanbit University",
            "skillLevel": "amateur",
            "teamType": "casual"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["kind"], "unauthorized");
}

#[actix_web::test]
async fn test_join_flow_over_http() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let app = init_app!(ctx);
    let leader = Uuid::new_v4();
    let applicant = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri("/api/v1/teams")
        .insert_header(common::auth_header(&token(&ctx, leader)))
        .set_json(json!({
            "name": "Lions",
            "university": "Hanbit University",
            "skillLevel": "amateur",
            "teamType": "department_club"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let team_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["memberCount"], 1);

    let apply = || {
        test::TestRequest::post()
            .uri(&format!("/api/v1/teams/{team_id}/join-requests"))
            .insert_header(common::auth_header(&token(&ctx, applicant)))
            .set_json(json!({ "message": "Can I join?" }))
            .to_request()
    };

    let resp = test::call_service(&app, apply()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let request_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "pending");

    let resp = test::call_service(&app, apply()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["kind"], "conflict");

    let req = test::TestRequest::get()
        .uri("/api/v1/join-requests/mine")
        .insert_header(common::auth_header(&token(&ctx, applicant)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/join-requests/{request_id}/decision"))
        .insert_header(common::auth_header(&token(&ctx, applicant)))
        .set_json(json!({ "outcome": "approved" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/join-requests/{request_id}/decision"))
        .insert_header(common::auth_header(&token(&ctx, leader)))
        .set_json(json!({ "outcome": "approved" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "approved");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/teams/{team_id}/members"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/teams/{team_id}/exit"))
        .insert_header(common::auth_header(&token(&ctx, leader)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["kind"], "leader_cannot_exit");
}

#[actix_web::test]
async fn test_team_listing_over_http() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let app = init_app!(ctx);
    ctx.team(Uuid::new_v4(), "Lions").await;
    ctx.team(Uuid::new_v4(), "Tigers").await;

    let req = test::TestRequest::get()
        .uri("/api/v1/teams?university=Hanbit%20University&skillLevels=amateur,pro&page=0&pageSize=1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["totalItems"], 2);
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(body["data"]["items"][0]["name"], "Tigers");

    let req = test::TestRequest::get()
        .uri("/api/v1/teams?university=Hanbit%20University&skillLevels=legendary")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_match_flow_over_http() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let app = init_app!(ctx);
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
    let t1 = ctx.team(u1, "T1").await;
    let t2 = ctx.team(u2, "T2").await;

    let req = test::TestRequest::post()
        .uri("/api/v1/match-slots")
        .insert_header(common::auth_header(&token(&ctx, u1)))
        .set_json(common::slot_input(t1.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let slot_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/match-slots/{slot_id}/requests"))
        .insert_header(common::auth_header(&token(&ctx, u1)))
        .set_json(json!({ "requestingTeamId": t1.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/match-slots/{slot_id}/requests"))
        .insert_header(common::auth_header(&token(&ctx, u2)))
        .set_json(json!({ "requestingTeamId": t2.id, "message": "Up for it" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/match-requests/{request_id}/decision"))
        .insert_header(common::auth_header(&token(&ctx, u1)))
        .set_json(json!({ "outcome": "accepted" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/match-slots/{slot_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "matched");

    let req = test::TestRequest::post()
        .uri("/api/v1/matches")
        .insert_header(common::auth_header(&token(&ctx, u1)))
        .set_json(json!({
            "homeTeamId": t1.id,
            "awayTeamId": t2.id,
            "homeScore": 2,
            "awayScore": 2,
            "matchDate": "2026-11-14",
            "venue": "North field"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let match_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/matches/{match_id}/outcome?teamId={}", t2.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["outcome"], "DRAW");
}

#[actix_web::test]
async fn test_activity_log_is_written_after_commit() {
    common::setup_test_env();
    let ctx = common::TestContext::new().await.unwrap();
    let app = init_app!(ctx);
    let leader = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri("/api/v1/teams")
        .insert_header(common::auth_header(&token(&ctx, leader)))
        .set_json(json!({
            "name": "Lions",
            "university": "Hanbit University",
            "skillLevel": "pro",
            "teamType": "central_club"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    let team_id = body["data"]["id"].as_str().unwrap().to_string();

    // The activity notifier writes on a background task
    let mut entries = Vec::new();
    for _ in 0..50 {
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/teams/{team_id}/activity"))
            .insert_header(common::auth_header(&token(&ctx, leader)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        entries = body["data"].as_array().cloned().unwrap_or_default();
        if !entries.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["eventType"], "team_created");
}
