//! Authentication extractors for bearer-token requests.
//!
//! Clients hold an opaque token issued at login and attach it as
//! `Authorization: Bearer <token>`; only the token's digest is stored, so
//! the lookup hashes first.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use crate::db::UserRepository;
use crate::models::session::CurrentUser;
use crate::services::auth::token_digest;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but missing or invalid.
pub enum AuthRejection {
    /// No usable `Authorization` header on the request.
    MissingToken,
    /// The token is unknown, revoked, or the lookup failed.
    InvalidToken,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::MissingToken => "Missing bearer token",
            Self::InvalidToken => "Invalid or revoked token",
        };
        (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({ "error": message })),
        )
            .into_response()
    }
}

/// Pull the bearer token out of the `Authorization` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve a bearer token to its user, if valid.
async fn resolve_user(state: &AppState, token: &str) -> Option<CurrentUser> {
    let digest = token_digest(token);
    let user = UserRepository::new(state.pool())
        .find_user_by_token(&digest)
        .await
        .ok()
        .flatten()?;

    Some(CurrentUser {
        id: user.id,
        email: user.email,
    })
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthRejection::MissingToken)?;
        let user = resolve_user(state, token)
            .await
            .ok_or(AuthRejection::InvalidToken)?;
        Ok(Self(user))
    }
}

/// Extractor that optionally resolves the current user.
///
/// Unlike [`RequireAuth`], this does not reject unauthenticated requests;
/// cart routes use it to pick between the guest and user cart stores.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match bearer_token(parts) {
            Some(token) => resolve_user(state, token).await,
            None => None,
        };
        Ok(Self(user))
    }
}
