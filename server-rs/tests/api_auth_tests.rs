//! Router-level admission tests. None of these reach the database: every
//! request is refused before a query runs.

use axum::http::StatusCode;
use ecoverse_api::config::Config;
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(common::get("/api/user/profile", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "No token provided");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(common::get("/api/activities", Some("not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let (app, _state) = common::create_test_app();

    let mut forger = Config::test_default();
    forger.auth.dev_secret = Some("a-completely-different-secret-value".into());
    let token = common::mint_token(&forger, "uid-forged", json!({}));

    let response = app
        .oneshot(common::get("/api/user/stats", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_other_project_is_rejected() {
    let (app, _state) = common::create_test_app();

    let token = common::mint_token(
        &Config::test_default(),
        "uid-1",
        json!({ "aud": "someone-elses-project" }),
    );

    let response = app
        .oneshot(common::get("/api/user/profile", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let (app, _state) = common::create_test_app();

    let past = chrono::Utc::now().timestamp() - 7200;
    let token = common::mint_token(
        &Config::test_default(),
        "uid-1",
        json!({ "iat": past - 3600, "exp": past }),
    );

    let response = app
        .oneshot(common::send_json("POST", "/api/user/sync", Some(&token), json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_authentication() {
    for (method, uri) in [
        ("GET", "/api/admin/stats"),
        ("POST", "/api/admin/tiers/reconcile"),
        ("GET", "/api/activities/pending"),
        ("POST", "/api/notifications/send"),
    ] {
        let (app, _state) = common::create_test_app();
        let response = app
            .oneshot(common::send_json(method, uri, None, json!({})))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri} should require a token"
        );
    }
}

#[tokio::test]
async fn test_mutating_routes_require_authentication() {
    for (method, uri) in [
        ("POST", "/api/activities"),
        ("POST", "/api/shop/orders"),
        ("POST", "/api/tours/book"),
        ("POST", "/api/carbon/calculate"),
        ("PUT", "/api/user/fcm-token"),
        (
            "POST",
            "/api/missions/00000000-0000-0000-0000-000000000001/join",
        ),
        (
            "POST",
            "/api/circles/00000000-0000-0000-0000-000000000001/join",
        ),
    ] {
        let (app, _state) = common::create_test_app();
        let response = app
            .oneshot(common::send_json(method, uri, None, json!({})))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri} should require a token"
        );
    }
}

#[tokio::test]
async fn test_security_headers_are_set() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(common::get("/api/user/profile", None))
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("x-content-type-options")
            .and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
}

#[tokio::test]
async fn test_rate_limit_applies_per_client() {
    let mut config = Config::test_default();
    config.rate_limit.max_requests = 2;
    let (app, _state) = common::create_test_app_with(config, common::offline_pool());

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(common::get("/api/user/profile", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .oneshot(common::get("/api/user/profile", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "Too many requests");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(common::get("/api/does-not-exist", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
