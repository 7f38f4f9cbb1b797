//! Router-level tests for the pieces that need no store: health, token
//! checks, role gates and the error envelope.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::middleware;
use axum::routing::{get, post};
use axum::{Extension, Router};
use corehub_core::access::{Principal, Role};
use corehub_core::account::model::User;
use corehub_web::auth::{self, AuthKeys};
use corehub_web::error::{ok, ApiJson, ApiResult};
use corehub_web::routes::health;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "api-test-secret";

fn user(id: &str, role: Role) -> User {
    User {
        id: id.into(),
        role,
        name: id.into(),
        email: format!("{}@example.com", id),
        phone: None,
        admin_id: Some("adm-1".into()),
        super_admin_id: None,
        company_name: None,
        enquiry_slug: None,
        is_active: true,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

fn token(role: Role) -> String {
    AuthKeys::new(SECRET, 1).issue(&user("u-1", role)).unwrap()
}

async fn whoami(Extension(principal): Extension<Principal>) -> ApiResult<axum::Json<corehub_web::error::ApiResponse<String>>> {
    Ok(ok(principal.user_id))
}

async fn echo(ApiJson(body): ApiJson<Value>) -> ApiResult<axum::Json<corehub_web::error::ApiResponse<Value>>> {
    Ok(ok(body))
}

/// A role-gated prefix behind the bearer-token check, like the real router.
fn gated_app(roles: &'static [Role]) -> Router {
    let ops = Router::new()
        .route("/whoami", get(whoami))
        .route("/echo", post(echo))
        .layer(middleware::from_fn_with_state(roles, auth::require_roles));
    Router::new()
        .nest("/api/ops", ops)
        .layer(middleware::from_fn_with_state(
            Arc::new(AuthKeys::new(SECRET, 1)),
            auth::authenticate,
        ))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = Router::new().route("/api/health", get(health::health));
    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let response = gated_app(&[Role::Ops])
        .oneshot(Request::get("/api/ops/whoami").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Authentication required");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let response = gated_app(&[Role::Ops])
        .oneshot(
            Request::get("/api/ops/whoami")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_role_prefix_is_forbidden() {
    let response = gated_app(&[Role::Ops])
        .oneshot(
            Request::get("/api/ops/whoami")
                .header(header::AUTHORIZATION, format!("Bearer {}", token(Role::Student)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Role STUDENT cannot access this endpoint");
}

#[tokio::test]
async fn test_matching_role_reaches_handler() {
    let response = gated_app(&[Role::Ops])
        .oneshot(
            Request::get("/api/ops/whoami")
                .header(header::AUTHORIZATION, format!("Bearer {}", token(Role::Ops)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!({ "success": true, "data": "u-1" }));
}

#[tokio::test]
async fn test_malformed_json_uses_envelope() {
    let response = gated_app(&[Role::Ops])
        .oneshot(
            Request::post("/api/ops/echo")
                .header(header::AUTHORIZATION, format!("Bearer {}", token(Role::Ops)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{ not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}
