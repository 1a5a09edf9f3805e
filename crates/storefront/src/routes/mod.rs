//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (verifies database)
//!
//! # Auth
//! POST /auth/register           - Create account, returns bearer token
//! POST /auth/login              - Login, returns bearer token; merges guest cart
//! POST /auth/logout             - Revoke the presented bearer token
//!
//! # Catalog
//! GET  /products                - Product listing (paginated)
//! GET  /products/{handle}       - Product detail with variants
//!
//! # Cart (guest via session cookie, user via bearer token)
//! GET    /cart                                     - Current cart
//! POST   /cart/items                               - Add line
//! PATCH  /cart/items                               - Set line quantity (0 removes)
//! DELETE /cart/items/{product_id}/{variant_id}     - Remove line
//! DELETE /cart                                     - Clear cart
//! POST   /cart/merge                               - Merge a client-held guest cart (auth)
//!
//! # Checkout (auth)
//! POST /checkout/address        - Validate/standardize shipping address
//! POST /checkout/session        - Create hosted payment session
//! POST /checkout/finalize       - Create order after payment redirect
//!
//! # Orders (auth)
//! GET  /orders                  - Order history
//! GET  /orders/{id}             - Order detail
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{handle}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add).patch(cart::update))
        .route(
            "/items/{product_id}/{variant_id}",
            delete(cart::remove),
        )
        .route("/merge", post(cart::merge))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/address", post(checkout::validate_address))
        .route("/session", post(checkout::create_session))
        .route("/finalize", post(checkout::finalize))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
        .layer(api_rate_limiter())
}
