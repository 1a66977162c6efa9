//! Router-level smoke tests.
//!
//! These exercise routing, the auth middleware, and response shapes without
//! a live database: every asserted path is rejected before a query runs.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header::AUTHORIZATION};
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use tower::ServiceExt;

use bolso_api::{AppState, create_router};
use bolso_shared::{JwtConfig, JwtService};

fn test_state() -> AppState {
    AppState {
        db: Arc::new(DatabaseConnection::default()),
        jwt_service: Arc::new(JwtService::new(JwtConfig {
            secret: "router-test-secret".to_string(),
            access_token_expires_minutes: 15,
        })),
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = create_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_transactions_require_token() {
    let app = create_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/transactions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "missing_token");
}

#[tokio::test]
async fn test_invoices_reject_garbage_token() {
    let app = create_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/invoices")
                .header(AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let foreign = JwtService::new(JwtConfig {
        secret: "some-other-secret".to_string(),
        access_token_expires_minutes: 15,
    });
    let token = foreign
        .generate_access_token(uuid::Uuid::new_v4())
        .unwrap();

    let app = create_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/transactions")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = create_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/budgets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
