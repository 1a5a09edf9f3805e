//! Order history route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use aurelia_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::order::Order;
use crate::state::AppState;

/// Order history response.
#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
}

/// List the authenticated user's orders, newest first.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<OrderListResponse>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    Ok(Json(OrderListResponse { orders }))
}

/// Show one of the authenticated user's orders.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .get_for_user(user.id, OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order not found: {id}")))?;

    Ok(Json(order))
}
