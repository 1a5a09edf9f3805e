//! Catalog domain types.
//!
//! The catalog is read-only from the storefront's perspective; it exists to
//! price cart lines and enforce stock limits. Rows are seeded through the
//! CLI.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aurelia_core::{Money, ProductId, VariantId};

use super::cart::{CartError, CartItem, VariantDetails, WeightUnit};

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// URL handle (e.g. "aurora-solitaire-ring").
    pub handle: String,
    pub title: String,
    pub description: String,
    pub main_image: Option<String>,
    pub variants: Vec<Variant>,
}

/// A purchasable configuration of a product with its own price and stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub material: String,
    pub purity: Option<String>,
    pub selected_size: Option<String>,
    pub price: Money,
    /// Units currently available for sale.
    pub stock: u32,
    pub weight: Decimal,
    pub weight_unit: WeightUnit,
    pub hs_code: Option<String>,
    pub country_of_origin: Option<String>,
}

impl Variant {
    /// The details copied onto a cart line for this variant.
    #[must_use]
    pub fn details(&self) -> VariantDetails {
        VariantDetails {
            material: self.material.clone(),
            purity: self.purity.clone(),
            selected_size: self.selected_size.clone(),
            price: self.price,
            weight: self.weight,
            weight_unit: self.weight_unit,
            hs_code: self.hs_code.clone(),
            country_of_origin: self.country_of_origin.clone(),
        }
    }
}

impl Product {
    /// Look up a variant of this product.
    #[must_use]
    pub fn variant(&self, variant_id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// Build a cart line for `quantity` units of the given variant.
    ///
    /// Name, image and price come from the catalog row, never from the
    /// client, so a tampered request cannot change what is charged.
    ///
    /// # Errors
    ///
    /// - [`CartError::UnknownVariant`] if the variant is not on this product
    /// - [`CartError::ZeroQuantity`] if `quantity` is 0
    /// - [`CartError::InsufficientStock`] if `quantity` exceeds stock
    pub fn cart_item(&self, variant_id: VariantId, quantity: u32) -> Result<CartItem, CartError> {
        let variant = self.variant(variant_id).ok_or(CartError::UnknownVariant)?;

        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if quantity > variant.stock {
            return Err(CartError::InsufficientStock {
                requested: quantity,
                available: variant.stock,
            });
        }

        Ok(CartItem {
            product_id: self.id,
            variant_id,
            quantity,
            name: self.title.clone(),
            main_image: self.main_image.clone(),
            variant: variant.details(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use aurelia_core::CurrencyCode;

    fn product() -> Product {
        Product {
            id: ProductId::new(1),
            handle: "aurora-solitaire-ring".to_string(),
            title: "Aurora Solitaire Ring".to_string(),
            description: "A hand-set solitaire in recycled gold.".to_string(),
            main_image: Some("https://cdn.test/aurora.jpg".to_string()),
            variants: vec![Variant {
                id: VariantId::new(11),
                material: "18k gold".to_string(),
                purity: Some("750".to_string()),
                selected_size: Some("6".to_string()),
                price: Money::new("1290.00".parse().unwrap(), CurrencyCode::USD),
                stock: 3,
                weight: "3.8".parse().unwrap(),
                weight_unit: WeightUnit::Grams,
                hs_code: Some("7113.19".to_string()),
                country_of_origin: Some("IT".to_string()),
            }],
        }
    }

    #[test]
    fn test_cart_item_copies_catalog_fields() {
        let product = product();
        let item = product.cart_item(VariantId::new(11), 2).unwrap();
        assert_eq!(item.name, "Aurora Solitaire Ring");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.variant.price, product.variants[0].price);
    }

    #[test]
    fn test_cart_item_unknown_variant() {
        let result = product().cart_item(VariantId::new(99), 1);
        assert_eq!(result.unwrap_err(), CartError::UnknownVariant);
    }

    #[test]
    fn test_cart_item_stock_limit() {
        let result = product().cart_item(VariantId::new(11), 4);
        assert_eq!(
            result.unwrap_err(),
            CartError::InsufficientStock {
                requested: 4,
                available: 3
            }
        );
    }

    #[test]
    fn test_cart_item_zero_quantity() {
        let result = product().cart_item(VariantId::new(11), 0);
        assert_eq!(result.unwrap_err(), CartError::ZeroQuantity);
    }
}
