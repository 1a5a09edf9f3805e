//! Order domain model.
//!
//! An [`Order`] is an immutable snapshot taken at payment confirmation:
//! line names, images and prices are copied out of the cart at that instant
//! and are never re-read from the catalog, so later price changes cannot
//! retroactively alter an existing order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use aurelia_core::{
    Money, MoneyError, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
    VariantId,
};

use super::address::ShippingAddress;
use super::cart::{Cart, CartItem};

/// Errors building an order from a cart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Orders cannot be created from an empty cart.
    #[error("cannot create an order from an empty cart")]
    EmptyCart,

    /// Monetary arithmetic failed while computing the total.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// A snapshotted order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    /// Product name at purchase time.
    pub name: String,
    /// Product image at purchase time.
    pub main_image: Option<String>,
    /// Unit price at purchase time.
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderItem {
    /// Snapshot a cart line.
    #[must_use]
    pub fn from_cart_item(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            variant_id: item.variant_id,
            name: item.name.clone(),
            main_image: item.main_image.clone(),
            unit_price: item.variant.price,
            quantity: item.quantity,
        }
    }

    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the line total does not fit.
    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// An order awaiting insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub total: Money,
    pub payment_method: PaymentMethod,
    /// Payment provider session this order settles; unique per order.
    pub payment_session_id: String,
}

impl NewOrder {
    /// Snapshot a cart into an order for the given payment session.
    ///
    /// The total is computed here, from the snapshotted lines, and stored
    /// with the order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::EmptyCart`] for an empty cart and
    /// [`OrderError::Money`] if the total cannot be computed.
    pub fn from_cart(
        user_id: UserId,
        cart: &Cart,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        payment_session_id: String,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let items: Vec<OrderItem> = cart.items().iter().map(OrderItem::from_cart_item).collect();
        let total = cart.subtotal()?;

        Ok(Self {
            user_id,
            items,
            shipping_address,
            total,
            payment_method,
            payment_session_id,
        })
    }
}

/// A persisted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_session_id: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::address::tests::address;
    use crate::models::cart::tests::{item, usd};

    #[test]
    fn test_from_cart_snapshots_lines_and_total() {
        let mut cart = Cart::new();
        cart.add(item(1, 1, 2, "1200.00")).unwrap();
        cart.add(item(2, 4, 1, "349.99")).unwrap();

        let order = NewOrder::from_cart(
            UserId::new(7),
            &cart,
            address(),
            PaymentMethod::Card,
            "cs_test_a1B2c3".to_string(),
        )
        .unwrap();

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total, usd("2749.99"));
        assert_eq!(order.items[0].unit_price, usd("1200.00"));
        assert_eq!(order.items[0].name, "Ring 1");
    }

    #[test]
    fn test_total_equals_sum_of_snapshot_lines() {
        let mut cart = Cart::new();
        cart.add(item(1, 1, 3, "99.50")).unwrap();
        cart.add(item(5, 9, 2, "20.25")).unwrap();

        let order = NewOrder::from_cart(
            UserId::new(1),
            &cart,
            address(),
            PaymentMethod::Card,
            "cs_test_sum".to_string(),
        )
        .unwrap();

        let mut sum = Money::zero(order.total.currency);
        for line in &order.items {
            sum = sum.checked_add(&line.line_total().unwrap()).unwrap();
        }
        assert_eq!(order.total, sum);
    }

    #[test]
    fn test_snapshot_is_insulated_from_catalog_changes() {
        let mut cart = Cart::new();
        cart.add(item(1, 1, 1, "500.00")).unwrap();

        let order = NewOrder::from_cart(
            UserId::new(1),
            &cart,
            address(),
            PaymentMethod::Card,
            "cs_test_snap".to_string(),
        )
        .unwrap();

        // Catalog price changes after the snapshot...
        let mut repriced = item(1, 1, 1, "999.00");
        repriced.variant.price = usd("999.00");

        // ...but the order keeps the purchase-time price.
        assert_eq!(order.items[0].unit_price, usd("500.00"));
        assert_eq!(order.total, usd("500.00"));
    }

    #[test]
    fn test_empty_cart_rejected() {
        let result = NewOrder::from_cart(
            UserId::new(1),
            &Cart::new(),
            address(),
            PaymentMethod::Card,
            "cs_test_empty".to_string(),
        );
        assert_eq!(result.unwrap_err(), OrderError::EmptyCart);
    }
}
