//! Cart route handlers.
//!
//! The same handlers serve guests and authenticated users: requests with a
//! valid bearer token hit the database-backed user cart, everything else
//! hits the session-backed guest cart. Line prices, names and images always
//! come from the catalog, never from the request body.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use aurelia_core::{Money, ProductId, UserId, VariantId};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::cart::{Cart, CartError, CartItem, LineKey};
use crate::state::AppState;

use crate::services::cart::{ActiveCart, CartStore, UserCartStore};

/// Cart response with its derived totals.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    /// Derived: sum of quantity x unit price over all lines.
    pub subtotal: Money,
    /// Derived: sum of quantities over all lines.
    pub item_count: u32,
}

impl CartResponse {
    fn from_cart(cart: Cart) -> Result<Self> {
        let subtotal = cart.subtotal().map_err(CartError::Money)?;
        let item_count = cart.item_count();
        Ok(Self {
            items: cart.items().to_vec(),
            subtotal,
            item_count,
        })
    }
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Quantity-update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Merge request body: the client's locally held guest cart.
///
/// Only identities and quantities are accepted; prices are re-read from
/// the catalog.
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub items: Vec<AddItemRequest>,
}

fn active_cart<'a>(
    state: &'a AppState,
    session: Session,
    user_id: Option<UserId>,
) -> ActiveCart<'a> {
    ActiveCart::for_request(state.pool(), session, user_id)
}

/// Build a catalog-priced cart line from a client-supplied identity.
async fn catalog_item(
    state: &AppState,
    product_id: ProductId,
    variant_id: VariantId,
    quantity: u32,
) -> Result<CartItem> {
    let product = ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .ok_or(AppError::Cart(CartError::UnknownVariant))?;

    Ok(product.cart_item(variant_id, quantity)?)
}

/// Get the current cart.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartResponse>> {
    let store = active_cart(&state, session, user.map(|u| u.id));
    let cart = store.get().await?;
    Ok(Json(CartResponse::from_cart(cart)?))
}

/// Add an item to the cart.
///
/// Same `(product, variant)` lines have their quantities summed.
#[instrument(skip(state, session, user, body))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartResponse>> {
    let item = catalog_item(&state, body.product_id, body.variant_id, body.quantity).await?;

    let store = active_cart(&state, session, user.map(|u| u.id));
    let cart = store.add(item).await?;
    Ok(Json(CartResponse::from_cart(cart)?))
}

/// Set a line's quantity; 0 removes the line.
#[instrument(skip(state, session, user, body))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>> {
    // A non-zero target quantity must still respect stock.
    if body.quantity > 0 {
        catalog_item(&state, body.product_id, body.variant_id, body.quantity).await?;
    }

    let key = LineKey {
        product_id: body.product_id,
        variant_id: body.variant_id,
    };
    let store = active_cart(&state, session, user.map(|u| u.id));
    let cart = store.update_quantity(key, body.quantity).await?;
    Ok(Json(CartResponse::from_cart(cart)?))
}

/// Remove a line from the cart.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path((product_id, variant_id)): Path<(i64, i64)>,
) -> Result<Json<CartResponse>> {
    let key = LineKey {
        product_id: ProductId::new(product_id),
        variant_id: VariantId::new(variant_id),
    };
    let store = active_cart(&state, session, user.map(|u| u.id));
    let cart = store.remove(key).await?;
    Ok(Json(CartResponse::from_cart(cart)?))
}

/// Clear the cart.
#[instrument(skip(state, session, user))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<StatusCode> {
    let store = active_cart(&state, session, user.map(|u| u.id));
    store.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Merge a client-held guest cart into the authenticated user's cart.
///
/// The server-side policy is authoritative: same-key quantities are
/// summed. The merge is transactional; if any line fails (unknown variant,
/// stock exceeded), nothing is merged and the client keeps its guest cart.
#[instrument(skip(state, user, body), fields(line_count = body.items.len()))]
pub async fn merge(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<MergeRequest>,
) -> Result<Json<CartResponse>> {
    let mut incoming = Cart::new();
    for line in body.items {
        let item = catalog_item(&state, line.product_id, line.variant_id, line.quantity).await?;
        incoming.add(item).map_err(AppError::Cart)?;
    }

    let store = UserCartStore::new(state.pool(), user.id);
    let cart = store.merge(incoming).await?;
    Ok(Json(CartResponse::from_cart(cart)?))
}
