//! Checkout route handlers: address validation, payment session creation,
//! and order finalization.
//!
//! The flow is strictly ordered. An address must pass carrier validation
//! before a payment session can be created, and a payment session must
//! report settled before an order is finalized. Each step blocks on its
//! external dependency; there is no accept-on-failure path.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use aurelia_core::PaymentMethod;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::address::ShippingAddress;
use crate::models::order::{NewOrder, Order, OrderError};
use crate::models::session::CurrentUser;
use crate::models::session_keys;
use crate::services::carrier::AddressValidation;
use crate::services::cart::{CartStore, UserCartStore};
use crate::services::checkout::FinalizeRejection;
use crate::services::kv::{KvStore, SessionKv};
use crate::state::AppState;

/// Address validation response.
#[derive(Debug, Serialize)]
pub struct AddressResponse {
    /// "valid" when accepted as entered, "standardized" when the carrier's
    /// canonical form replaced the entered fields.
    pub status: &'static str,
    /// The address checkout will ship to.
    pub address: ShippingAddress,
}

/// Validate the shipping address with the carrier.
///
/// On success the accepted address (standardized if the carrier returned a
/// canonical form) is held in the session for the rest of the checkout.
/// Carrier rejection or outage blocks advancement.
#[instrument(skip(state, session, _user, body))]
pub async fn validate_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
    Json(body): Json<ShippingAddress>,
) -> Result<Json<AddressResponse>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let outcome = state.carrier().validate(&body).await?;

    let (status, address) = match outcome {
        AddressValidation::Rejected(messages) => {
            let first = messages
                .into_iter()
                .next()
                .unwrap_or_else(|| "Address could not be validated".to_string());
            return Err(AppError::Validation(first));
        }
        AddressValidation::Standardized(standardized) => ("standardized", standardized),
        AddressValidation::Valid => ("valid", body),
    };

    let kv = SessionKv::new(session);
    kv.write(
        session_keys::CHECKOUT_ADDRESS,
        serde_json::to_value(&address).map_err(crate::services::kv::KvError::Serde)?,
    )
    .await?;

    Ok(Json(AddressResponse { status, address }))
}

/// Payment session request body.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Payment session response.
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    /// Provider session id; comes back as a query parameter after redirect.
    pub session_id: String,
    /// Hosted payment page to redirect the shopper to.
    pub url: String,
}

/// Create a hosted payment session for the current cart.
///
/// Requires a non-empty cart and a carrier-accepted address in the
/// session. Nothing is mutated locally; the shopper is redirected to the
/// provider and the cart only becomes an order at finalization.
#[instrument(skip(state, session, user, body))]
pub async fn create_session(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>> {
    let store = UserCartStore::new(state.pool(), user.id);
    let cart = store.get().await?;
    if cart.is_empty() {
        return Err(AppError::Validation("cart is empty".to_string()));
    }

    let kv = SessionKv::new(session);
    if checkout_address(&kv).await?.is_none() {
        return Err(AppError::Validation(
            "shipping address has not been validated".to_string(),
        ));
    }

    let created = state
        .payments()
        .create_session(cart.items(), body.payment_method)
        .await?;

    // Remember the method so finalization records it on the order.
    kv.write(
        session_keys::PAYMENT_METHOD,
        serde_json::to_value(body.payment_method).map_err(crate::services::kv::KvError::Serde)?,
    )
    .await?;

    Ok(Json(CreateSessionResponse {
        session_id: created.id,
        url: created.url,
    }))
}

/// Finalize request body: the session id carried back on the redirect URL.
#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub session_id: String,
}

/// Create the order after returning from the payment provider.
///
/// Runs at most once per payment session: the in-process guard rejects
/// re-entry, and the `payment_session_id` unique constraint backstops it
/// across restarts, so a double-fired callback yields exactly one order.
/// On failure the cart is deliberately left intact so the same snapshot
/// can be retried.
#[instrument(skip(state, session, user, body), fields(session_id = %body.session_id))]
pub async fn finalize(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(body): Json<FinalizeRequest>,
) -> Result<Json<Order>> {
    let session_id = body.session_id;

    if let Err(rejection) = state.finalizer().begin(&session_id) {
        return match rejection {
            // Already finalized: report the existing order, don't fail the
            // shopper's confirmation page.
            FinalizeRejection::Completed => {
                let existing = OrderRepository::new(state.pool())
                    .get_by_payment_session(&session_id)
                    .await?
                    .ok_or(AppError::Finalize(rejection))?;
                Ok(Json(existing))
            }
            FinalizeRejection::InFlight => Err(AppError::Finalize(rejection)),
        };
    }

    match finalize_inner(&state, &session, &user, &session_id).await {
        Ok(order) => {
            state.finalizer().complete(&session_id);
            Ok(Json(order))
        }
        Err(e) => {
            // Allow a retry with the same snapshot.
            state.finalizer().reset(&session_id);
            Err(e)
        }
    }
}

async fn finalize_inner(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    session_id: &str,
) -> Result<Order> {
    // Trust the provider, not the redirect: confirm the session settled.
    let status = state.payments().retrieve_session(session_id).await?;
    if !status.is_paid() {
        return Err(AppError::Validation(
            "payment has not completed for this session".to_string(),
        ));
    }

    let store = UserCartStore::new(state.pool(), user.id);
    let cart = store.get().await?;

    let kv = SessionKv::new(session.clone());
    let address = checkout_address(&kv)
        .await?
        .ok_or_else(|| AppError::Validation("no validated shipping address on file".to_string()))?;
    let payment_method = stored_payment_method(&kv).await?.unwrap_or_default();

    // Snapshot the cart at this instant: names, images and prices on the
    // order are frozen here.
    let new_order =
        NewOrder::from_cart(user.id, &cart, address, payment_method, session_id.to_string())
            .map_err(|e| match e {
                OrderError::EmptyCart => AppError::Validation("cart is empty".to_string()),
                OrderError::Money(_) => {
                    AppError::Internal("order total computation failed".to_string())
                }
            })?;

    let (order, created) = OrderRepository::new(state.pool())
        .create_idempotent(&new_order)
        .await?;

    if created {
        // Success path only: clear the cart and the lingering checkout state.
        store.clear().await?;
        kv.clear(session_keys::CHECKOUT_ADDRESS).await?;
        kv.clear(session_keys::PAYMENT_METHOD).await?;
    }

    Ok(order)
}

async fn checkout_address(kv: &SessionKv) -> Result<Option<ShippingAddress>> {
    let Some(value) = kv.read(session_keys::CHECKOUT_ADDRESS).await? else {
        return Ok(None);
    };
    let address =
        serde_json::from_value(value).map_err(crate::services::kv::KvError::Serde)?;
    Ok(Some(address))
}

async fn stored_payment_method(kv: &SessionKv) -> Result<Option<PaymentMethod>> {
    let Some(value) = kv.read(session_keys::PAYMENT_METHOD).await? else {
        return Ok(None);
    };
    let method = serde_json::from_value(value).map_err(crate::services::kv::KvError::Serde)?;
    Ok(Some(method))
}
