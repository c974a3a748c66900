use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::auth::cookies::{read_cookie, AUTH_COOKIE};
use crate::auth::{Claims, TokenService};
use crate::constants::messages;
use crate::error::ApiError;
use crate::routing::Middleware;

/// Name the registrar uses to recognise the authorization middleware.
pub const AUTHORIZATION_MIDDLEWARE: &str = "authorization";

/// Authenticated user context extracted from the session token
#[derive(Clone, Debug, Serialize)]
#[serde(transparent)]
pub struct AuthUser(pub Claims);

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self(claims)
    }
}

pub fn authorization() -> Middleware {
    Middleware::new(AUTHORIZATION_MIDDLEWARE, require_auth)
}

/// Verifies the session token and stores the caller as [`AuthUser`].
///
/// Expects an `Arc<TokenService>` in the request extensions.
pub async fn require_auth(mut request: Request, next: Next) -> Response {
    let Some(tokens) = request.extensions().get::<Arc<TokenService>>().cloned() else {
        tracing::error!("Authorization middleware has no token service");
        return ApiError::internal_server_error(messages::INTERNAL_SERVER_ERROR).into_response();
    };

    let Some(token) = extract_token(request.headers()) else {
        return ApiError::unauthorized(messages::NO_TOKEN_PROVIDED).into_response();
    };

    match tokens.verify(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthUser::from(claims));
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!("Rejected session token: {}", e);
            ApiError::bad_request(messages::INVALID_TOKEN).into_response()
        }
    }
}

/// Session cookie first, then `Authorization: Bearer <token>`.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = read_cookie(headers, AUTH_COOKIE) {
        return Some(token);
    }

    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}
