//! Session-related types.
//!
//! The cookie session is the server-side home of guest client state: the
//! guest cart and the validated checkout address live here under fixed keys.

use serde::{Deserialize, Serialize};

use aurelia_core::{Email, UserId};

/// Authenticated user identity resolved from a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

/// Session keys for guest and checkout state.
pub mod keys {
    /// Key for the guest cart (JSON-serialized [`crate::models::Cart`]).
    pub const GUEST_CART: &str = "guest_cart";

    /// Key for the carrier-accepted shipping address awaiting checkout.
    pub const CHECKOUT_ADDRESS: &str = "checkout_address";

    /// Key for the payment method selected when the hosted session was
    /// created, recalled at finalization.
    pub const PAYMENT_METHOD: &str = "checkout_payment_method";
}
