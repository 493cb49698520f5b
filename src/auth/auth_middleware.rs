// Axum authentication middleware

use crate::api::responses::ApiError;
use crate::auth::audit_logger::{AuditLogger, AuthEvent};
use crate::auth::token::TokenIssuer;
use crate::core::errors::RegistrarError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authentication state containing all dependencies
#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenIssuer>,
    pub audit_logger: Arc<AuditLogger>,
}

/// Authentication middleware function
///
/// Extracts a bearer token from the `Authorization` header, validates it,
/// and sets the resulting claims in request extensions for handlers to use.
/// Every rejection surfaces as the same Unauthorized response.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match extract_bearer_token(request.headers()) {
        Some(token) => token,
        None => {
            auth_state.audit_logger.log_auth_event(
                AuthEvent::AuthFailure {
                    reason: "missing bearer token".to_string(),
                },
                None,
            );
            return Err(ApiError::from(RegistrarError::Unauthorized));
        }
    };

    match auth_state.tokens.validate(&token) {
        Ok(claims) => {
            auth_state
                .audit_logger
                .log_auth_event(AuthEvent::AuthSuccess, Some(&claims.sub));
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(_) => {
            auth_state.audit_logger.log_auth_event(
                AuthEvent::AuthFailure {
                    reason: "invalid or expired token".to_string(),
                },
                None,
            );
            Err(ApiError::from(RegistrarError::Unauthorized))
        }
    }
}

/// Extract a bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.to_string())
}
