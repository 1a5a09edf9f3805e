//! User domain types.

use chrono::{DateTime, Utc};

use aurelia_core::{Email, UserId};

/// A storefront user (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}
