//! Domain types for the storefront.
//!
//! These types represent validated domain objects separate from database
//! row types and wire formats.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use address::{AddressError, ShippingAddress};
pub use cart::{Cart, CartError, CartItem, LineKey, VariantDetails, WeightUnit};
pub use order::{NewOrder, Order, OrderError, OrderItem};
pub use product::{Product, Variant};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
