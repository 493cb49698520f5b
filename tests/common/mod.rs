// Shared helpers for integration tests

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use registrar::aggregate::AggregationEngine;
use registrar::api::{create_router, AppState, RelationalStore};
use registrar::auth::audit_logger::AuditLogger;
use registrar::auth::auth_middleware::AuthState;
use registrar::auth::credentials::CredentialStore;
use registrar::auth::token::TokenIssuer;
use registrar::config::Config;
use registrar::state::store::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Build an AppState over a fresh in-memory store
pub fn create_test_app_state() -> AppState {
    let config = Config::test_config();
    let store: Arc<dyn RelationalStore + Send + Sync> = Arc::new(MemoryStore::new());

    AppState {
        store: store.clone(),
        credentials: Arc::new(CredentialStore::new(config.bcrypt_cost)),
        tokens: Arc::new(TokenIssuer::new(
            config.jwt_secret.as_bytes(),
            &config.jwt_issuer,
            &config.jwt_audience,
            config.token_ttl_minutes,
        )),
        aggregator: Arc::new(AggregationEngine::new(store)),
        config: Arc::new(config),
    }
}

/// Router with the auth middleware wired in, as in production
pub fn create_test_router() -> (Router, AppState) {
    let app_state = create_test_app_state();
    let auth_state = Arc::new(AuthState {
        tokens: app_state.tokens.clone(),
        audit_logger: Arc::new(AuditLogger::new()),
    });
    let router = create_router(app_state.clone(), Some(auth_state));
    (router, app_state)
}

/// Fire a single request at the router and decode the JSON body
///
/// Empty bodies (e.g. 204 responses) decode to `Value::Null`.
pub async fn send_request(
    router: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register an account and return its token
pub async fn register(
    router: &Router,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> String {
    let (status, body) = send_request(
        router,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({
            "name": name,
            "email": email,
            "password": password,
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

/// Log in with existing credentials and return the token
pub async fn login(router: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send_request(
        router,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}
