//! Cart domain model.
//!
//! A [`Cart`] is a list of [`CartItem`] lines keyed by `(product, variant)`.
//! Subtotal and item count are always derived from the lines; they are never
//! stored, so they cannot drift.
//!
//! The same model backs both guest carts (session-persisted) and user carts
//! (database-persisted); see [`crate::services::cart`] for the stores.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use aurelia_core::{CurrencyCode, Money, MoneyError, ProductId, VariantId};

/// Errors from cart mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// A line quantity must be at least 1.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// The referenced variant does not exist in the catalog.
    #[error("variant not found")]
    UnknownVariant,

    /// Requested more units than the variant has in stock.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// Monetary arithmetic failed while deriving totals.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Unit in which a variant's weight is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    #[default]
    Grams,
    Carats,
}

impl std::fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grams => f.write_str("grams"),
            Self::Carats => f.write_str("carats"),
        }
    }
}

impl std::str::FromStr for WeightUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grams" => Ok(Self::Grams),
            "carats" => Ok(Self::Carats),
            _ => Err(format!("invalid weight unit: {s}")),
        }
    }
}

/// The purchasable configuration captured on a cart line.
///
/// Copied from the catalog when the line is created so the cart remains
/// renderable even if the variant is later edited; the price here is still
/// the live price until an order snapshots it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDetails {
    /// Metal or base material (e.g. "18k gold").
    pub material: String,
    /// Metal purity marking, when applicable (e.g. "925").
    pub purity: Option<String>,
    /// Ring/chain size selected by the shopper.
    pub selected_size: Option<String>,
    /// Unit price.
    pub price: Money,
    /// Item weight, for customs and shipping quotes.
    pub weight: Decimal,
    /// Unit for `weight`.
    pub weight_unit: WeightUnit,
    /// Harmonized System code for customs declarations.
    pub hs_code: Option<String>,
    /// ISO country of origin for customs declarations.
    pub country_of_origin: Option<String>,
}

/// Identity of a cart line: one line per `(product, variant)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    pub variant_id: VariantId,
}

/// A line item in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Specific variant of the product.
    pub variant_id: VariantId,
    /// Number of units; always >= 1 inside a cart.
    pub quantity: u32,
    /// Product display name.
    pub name: String,
    /// Primary product image URL.
    pub main_image: Option<String>,
    /// Variant configuration and unit price.
    pub variant: VariantDetails,
}

impl CartItem {
    /// The `(product, variant)` identity of this line.
    #[must_use]
    pub const fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id,
            variant_id: self.variant_id,
        }
    }

    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the line total does not fit.
    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.variant.price.checked_mul(self.quantity)
    }
}

/// A shopping cart: guest (session) or user (database) owned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from existing lines, combining any duplicate keys.
    ///
    /// Used when loading persisted lines; zero-quantity lines are dropped.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            // Ignore malformed persisted lines rather than failing the load.
            let _ = cart.add(item);
        }
        cart
    }

    /// The cart lines.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a line to the cart.
    ///
    /// If a line with the same `(product, variant)` key exists, its quantity
    /// is incremented; otherwise the line is appended.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] if `item.quantity` is 0.
    pub fn add(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        if let Some(existing) = self.items.iter_mut().find(|i| i.key() == item.key()) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
        Ok(())
    }

    /// Remove the line with the given key.
    ///
    /// Returns `true` if a line was removed.
    pub fn remove(&mut self, key: LineKey) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.key() != key);
        self.items.len() != before
    }

    /// Set the quantity of the line with the given key.
    ///
    /// A quantity of 0 removes the line. Returns `true` if a matching line
    /// existed.
    pub fn update_quantity(&mut self, key: LineKey, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(key);
        }

        match self.items.iter_mut().find(|i| i.key() == key) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove all lines.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Fold another cart into this one.
    ///
    /// Same-key quantities are summed, never overwritten; new keys are
    /// appended. This is the authoritative guest-to-user merge policy.
    pub fn merge(&mut self, other: Self) {
        for item in other.items {
            if item.quantity == 0 {
                continue;
            }
            // add() only fails on zero quantity, which is excluded above.
            let _ = self.add(item);
        }
    }

    /// Sum of `quantity * unit price` over all lines.
    ///
    /// Empty carts total zero in the store's default currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] on currency mismatch between lines or overflow.
    pub fn subtotal(&self) -> Result<Money, MoneyError> {
        let mut total = Money::zero(
            self.items
                .first()
                .map_or(CurrencyCode::default(), |i| i.variant.price.currency),
        );
        for item in &self.items {
            total = total.checked_add(&item.line_total()?)?;
        }
        Ok(total)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, i| acc.saturating_add(i.quantity))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn usd(s: &str) -> Money {
        Money::new(s.parse().unwrap(), CurrencyCode::USD)
    }

    pub(crate) fn item(product: i64, variant: i64, quantity: u32, price: &str) -> CartItem {
        CartItem {
            product_id: ProductId::new(product),
            variant_id: VariantId::new(variant),
            quantity,
            name: format!("Ring {product}"),
            main_image: Some(format!("https://cdn.test/ring-{product}.jpg")),
            variant: VariantDetails {
                material: "18k gold".to_string(),
                purity: Some("750".to_string()),
                selected_size: Some("7".to_string()),
                price: usd(price),
                weight: "4.2".parse().unwrap(),
                weight_unit: WeightUnit::Grams,
                hs_code: Some("7113.19".to_string()),
                country_of_origin: Some("IT".to_string()),
            },
        }
    }

    #[test]
    fn test_add_appends_new_line() {
        let mut cart = Cart::new();
        cart.add(item(1, 1, 2, "100")).unwrap();
        cart.add(item(2, 5, 1, "250")).unwrap();
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_add_same_key_sums_quantities() {
        let mut cart = Cart::new();
        cart.add(item(1, 1, 2, "100")).unwrap();
        cart.add(item(1, 1, 3, "100")).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn test_add_same_product_different_variant_is_new_line() {
        let mut cart = Cart::new();
        cart.add(item(1, 1, 1, "100")).unwrap();
        cart.add(item(1, 2, 1, "120")).unwrap();
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_add_zero_quantity_rejected() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(item(1, 1, 0, "100")), Err(CartError::ZeroQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_zero_equals_remove() {
        let mut with_update = Cart::new();
        with_update.add(item(1, 1, 2, "100")).unwrap();
        with_update.add(item(2, 2, 1, "50")).unwrap();

        let mut with_remove = with_update.clone();

        assert!(with_update.update_quantity(item(1, 1, 2, "100").key(), 0));
        assert!(with_remove.remove(item(1, 1, 2, "100").key()));
        assert_eq!(with_update, with_remove);
    }

    #[test]
    fn test_update_quantity_missing_line() {
        let mut cart = Cart::new();
        assert!(!cart.update_quantity(item(9, 9, 1, "10").key(), 3));
    }

    #[test]
    fn test_derived_totals_track_every_operation() {
        let mut cart = Cart::new();

        let expect = |cart: &Cart, subtotal: &str, count: u32| {
            assert_eq!(cart.subtotal().unwrap(), usd(subtotal));
            assert_eq!(cart.item_count(), count);
        };

        expect(&cart, "0", 0);

        cart.add(item(1, 1, 2, "100.50")).unwrap();
        expect(&cart, "201.00", 2);

        cart.add(item(2, 2, 1, "49.99")).unwrap();
        expect(&cart, "250.99", 3);

        cart.update_quantity(item(1, 1, 1, "100.50").key(), 4);
        expect(&cart, "451.99", 5);

        cart.remove(item(2, 2, 1, "49.99").key());
        expect(&cart, "402.00", 4);

        cart.clear();
        expect(&cart, "0", 0);
    }

    #[test]
    fn test_merge_sums_same_key_and_appends_new() {
        // Server cart [A:1], guest cart [A:2, B:1] -> [A:3, B:1]
        let mut server = Cart::new();
        server.add(item(1, 1, 1, "100")).unwrap();

        let mut guest = Cart::new();
        guest.add(item(1, 1, 2, "100")).unwrap();
        guest.add(item(2, 2, 1, "50")).unwrap();

        server.merge(guest);

        assert_eq!(server.items().len(), 2);
        assert_eq!(server.items()[0].quantity, 3);
        assert_eq!(server.items()[1].quantity, 1);
    }

    #[test]
    fn test_from_items_combines_duplicates_and_drops_zeroes() {
        let cart = Cart::from_items(vec![
            item(1, 1, 1, "100"),
            item(1, 1, 2, "100"),
            item(2, 2, 0, "50"),
        ]);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn test_subtotal_currency_mismatch() {
        let mut cart = Cart::new();
        cart.add(item(1, 1, 1, "100")).unwrap();
        let mut eur_item = item(2, 2, 1, "100");
        eur_item.variant.price.currency = CurrencyCode::EUR;
        cart.add(eur_item).unwrap();

        assert!(matches!(
            cart.subtotal(),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
    }
}
