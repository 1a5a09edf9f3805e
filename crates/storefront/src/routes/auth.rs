//! Authentication route handlers.
//!
//! Registration and login both end a guest session: the one-time
//! guest-to-user cart merge runs here, on the auth transition, and nowhere
//! else. A failed merge preserves the guest cart and is reported in the
//! response rather than failing the login.

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use aurelia_core::Email;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::models::session::CurrentUser;
use crate::services::auth::{self, AuthError};
use crate::services::cart::{CartStore, GuestCartStore, UserCartStore};
use crate::services::kv::SessionKv;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful auth response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Opaque bearer token for subsequent requests.
    pub token: String,
    pub user: CurrentUser,
    /// Whether a non-empty guest cart was merged into the user cart.
    pub cart_merged: bool,
}

/// Register a new account.
#[instrument(skip(state, session, body))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let email = Email::parse(&body.email).map_err(AuthError::InvalidEmail)?;
    let password_hash = auth::hash_password(&body.password)?;

    let repo = UserRepository::new(state.pool());
    let user = repo.create(&email, &password_hash).await.map_err(|e| {
        if matches!(e, crate::db::RepositoryError::Conflict(_)) {
            AppError::Auth(AuthError::AccountExists)
        } else {
            AppError::Database(e)
        }
    })?;

    let (token, digest) = auth::generate_token();
    repo.insert_token(user.id, &digest).await?;

    let current = CurrentUser {
        id: user.id,
        email: user.email,
    };
    let cart_merged = merge_guest_cart(&state, &session, &current).await;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: current,
            cart_merged,
        }),
    ))
}

/// Log in with email and password.
#[instrument(skip(state, session, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = Email::parse(&body.email).map_err(AuthError::InvalidEmail)?;

    let repo = UserRepository::new(state.pool());
    let (user, password_hash) = repo
        .get_password_hash(&email)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    auth::verify_password(&body.password, &password_hash)?;

    let (token, digest) = auth::generate_token();
    repo.insert_token(user.id, &digest).await?;

    let current = CurrentUser {
        id: user.id,
        email: user.email,
    };
    let cart_merged = merge_guest_cart(&state, &session, &current).await;

    Ok(Json(AuthResponse {
        token,
        user: current,
        cart_merged,
    }))
}

/// Revoke the presented bearer token.
#[instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let digest = auth::token_digest(token);
    let revoked = UserRepository::new(state.pool())
        .revoke_token(&digest)
        .await?;

    if !revoked {
        return Err(AppError::Unauthorized("Invalid or revoked token".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Merge the session guest cart into the user's cart, once, on the
/// guest-to-authenticated transition.
///
/// Same-key quantities are summed by the server-side merge; on success the
/// guest copy is discarded entirely. On failure the guest cart is left
/// untouched and the caller reports `cart_merged: false` - the merge is
/// not retried automatically.
async fn merge_guest_cart(state: &AppState, session: &Session, user: &CurrentUser) -> bool {
    let guest_store = GuestCartStore::new(SessionKv::new(session.clone()));

    let guest_cart = match guest_store.get().await {
        Ok(cart) => cart,
        Err(e) => {
            tracing::warn!("Failed to read guest cart during login merge: {e}");
            return false;
        }
    };

    if guest_cart.is_empty() {
        return false;
    }

    let user_store = UserCartStore::new(state.pool(), user.id);
    if let Err(e) = user_store.merge(guest_cart).await {
        tracing::warn!(user_id = %user.id, "Guest cart merge failed, guest cart preserved: {e}");
        return false;
    }

    // Merge landed; drop the guest copy so it cannot merge twice.
    if let Err(e) = guest_store.clear().await {
        tracing::warn!(user_id = %user.id, "Failed to clear guest cart after merge: {e}");
    }

    true
}
