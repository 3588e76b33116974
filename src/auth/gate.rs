//! Access control for private routes

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::token::TokenService;
use crate::account::AccountId;
use crate::api::error::ApiError;
use crate::error::ServiceError;

/// Account id resolved from the bearer credential, stored in request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedAccount(pub AccountId);

/// Split an `Authorization` value into its token. Exactly `Bearer <token>` is accepted.
pub fn bearer_token(value: &str) -> Option<&str> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() => {
            Some(token)
        }
        _ => None,
    }
}

/// Resolve an `Authorization` header value to an account id
pub fn authenticate(tokens: &TokenService, header: Option<&str>) -> Result<AccountId, ServiceError> {
    let token = header
        .and_then(bearer_token)
        .ok_or_else(|| ServiceError::Unauthorized("missing bearer credential".to_string()))?;

    if !tokens.verify_access(token) {
        return Err(ServiceError::Unauthorized("unauthorized".to_string()));
    }

    tokens
        .access_subject(token)
        .map_err(|e| ServiceError::Unauthorized(e.to_string()))
}

/// Middleware: reject the request unless it carries a valid access token
pub async fn require_bearer(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let account_id = authenticate(&tokens, header).map_err(|e| {
        debug!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(AuthenticatedAccount(account_id));
    Ok(next.run(request).await)
}
