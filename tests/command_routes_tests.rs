// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP surface tests: health, command relay, OAuth callback.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use common::account;
use sub_league::db::CredentialStore;
use sub_league::routes::auth::LINKED_MESSAGE;
use tower::ServiceExt;

mod common;

const TOKEN: &str = "test_command_token";

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn authed_get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap()
}

fn authed_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_commands_require_bearer_token() {
    let (app, _) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/commands/leaderboard")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/commands/leaderboard")
                .header(header::AUTHORIZATION, "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_leaderboard_defaults_to_lowest_league() {
    let (app, h) = common::create_test_app();
    h.store
        .upsert(&account("a", "Alpha", 10, "Bronze"))
        .await
        .unwrap();
    h.store
        .upsert(&account("b", "Bravo", 900, "Bronze"))
        .await
        .unwrap();

    let response = app.oneshot(authed_get("/commands/leaderboard")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["tier"], "Bronze");
    assert_eq!(json["entries"][0]["channel_name"], "Bravo");
    assert_eq!(json["entries"][0]["rank"], 1);
    assert_eq!(json["entries"][1]["subscriber_count"], 10);
    assert!(json["text"]
        .as_str()
        .unwrap()
        .starts_with("🏆 Top 10 of the Bronze league 🏆"));
}

#[tokio::test]
async fn test_leaderboard_league_is_case_insensitive() {
    let (app, h) = common::create_test_app();
    h.store
        .upsert(&account("g", "Golden", 25_000, "Gold"))
        .await
        .unwrap();

    let response = app
        .oneshot(authed_get("/commands/leaderboard?league=gOLD"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["tier"], "Gold");
    assert_eq!(json["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_league_is_not_found() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(authed_get("/commands/leaderboard?league=Diamond"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["details"], "This league does not exist");
}

#[tokio::test]
async fn test_link_command_returns_consent_url() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(authed_post(
            "/commands/link",
            serde_json::json!({ "external_id": "discord-9" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["url"]
        .as_str()
        .unwrap()
        .starts_with("https://accounts.example/consent?state="));
}

#[tokio::test]
async fn test_link_command_rejects_blank_id() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(authed_post(
            "/commands/link",
            serde_json::json!({ "external_id": "  " }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_command_reports_unlinked_user() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(authed_post(
            "/commands/refresh",
            serde_json::json!({ "external_id": "stranger" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["tier_changed"], false);
    assert!(json["message"].as_str().unwrap().contains("/link"));
}

#[tokio::test]
async fn test_auth_link_redirects_to_consent() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(authed_get("/auth/link?external_id=discord-7"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers().get(header::LOCATION).unwrap();
    assert!(location
        .to_str()
        .unwrap()
        .starts_with("https://accounts.example/consent?state="));
}

#[tokio::test]
async fn test_callback_without_state_is_bad_request() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/callback?code=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_with_garbage_state_is_bad_request() {
    let (app, h) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/callback?code=abc&state=not-a-state")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("/link"));
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn test_callback_links_channel() {
    let h = common::test_harness(
        common::FakeProvider::new().with_channel("Browser Flow", 42),
        common::RecordingMessenger::with_tier_channels(),
    );
    let app = sub_league::routes::create_router(h.state.clone());
    let url = h.state.commands.request_link("discord-8").unwrap();
    let state = url.split("state=").nth(1).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/auth/callback?code=abc&state={}", state))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, LINKED_MESSAGE);
    let stored = h.store.find_by_external_id("discord-8").await.unwrap();
    assert_eq!(stored.unwrap().tier, "Bronze");
}
