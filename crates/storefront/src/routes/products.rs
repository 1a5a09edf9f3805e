//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::product::Product;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 24;
const MAX_PAGE_SIZE: i64 = 100;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Product listing response.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
}

/// List products, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductListResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let products = ProductRepository::new(state.pool())
        .list(limit, offset)
        .await?;

    Ok(Json(ProductListResponse { products }))
}

/// Show a product by its URL handle.
#[instrument(skip(state), fields(handle = %handle))]
pub async fn show(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get_by_handle(&handle)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {handle}")))?;

    Ok(Json(product))
}
