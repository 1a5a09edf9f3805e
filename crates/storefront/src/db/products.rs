//! Catalog repository.
//!
//! Read-only from the storefront's perspective; rows are seeded via the CLI.

use rust_decimal::Decimal;
use sqlx::PgPool;

use aurelia_core::{CurrencyCode, Money, ProductId, VariantId};

use super::RepositoryError;
use crate::models::cart::WeightUnit;
use crate::models::product::{Product, Variant};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    handle: String,
    title: String,
    description: String,
    main_image: Option<String>,
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: i64,
    product_id: i64,
    material: String,
    purity: Option<String>,
    selected_size: Option<String>,
    price: Decimal,
    currency: String,
    stock: i32,
    weight: Decimal,
    weight_unit: String,
    hs_code: Option<String>,
    country_of_origin: Option<String>,
}

impl VariantRow {
    fn into_variant(self) -> Result<Variant, RepositoryError> {
        let currency: CurrencyCode = self
            .currency
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let weight_unit: WeightUnit = self
            .weight_unit
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let stock = u32::try_from(self.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative stock: {}", self.stock))
        })?;

        Ok(Variant {
            id: VariantId::new(self.id),
            material: self.material,
            purity: self.purity,
            selected_size: self.selected_size,
            price: Money::new(self.price, currency),
            stock,
            weight: self.weight,
            weight_unit,
            hs_code: self.hs_code,
            country_of_origin: self.country_of_origin,
        })
    }
}

fn assemble(
    products: Vec<ProductRow>,
    variants: Vec<VariantRow>,
) -> Result<Vec<Product>, RepositoryError> {
    let mut assembled: Vec<Product> = products
        .into_iter()
        .map(|p| Product {
            id: ProductId::new(p.id),
            handle: p.handle,
            title: p.title,
            description: p.description,
            main_image: p.main_image,
            variants: Vec::new(),
        })
        .collect();

    for row in variants {
        let product_id = ProductId::new(row.product_id);
        let variant = row.into_variant()?;
        if let Some(product) = assembled.iter_mut().find(|p| p.id == product_id) {
            product.variants.push(variant);
        }
    }

    Ok(assembled)
}

/// Repository for catalog reads.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products with their variants, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if a row cannot be interpreted.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Product>, RepositoryError> {
        let products: Vec<ProductRow> = sqlx::query_as(
            r"
            SELECT id, handle, title, description, main_image
            FROM product
            ORDER BY id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let variants: Vec<VariantRow> = sqlx::query_as(
            r"
            SELECT id, product_id, material, purity, selected_size,
                   price, currency, stock, weight, weight_unit,
                   hs_code, country_of_origin
            FROM variant
            WHERE product_id = ANY($1)
            ORDER BY id ASC
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        assemble(products, variants)
    }

    /// Get a product by its URL handle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if a row cannot be interpreted.
    pub async fn get_by_handle(&self, handle: &str) -> Result<Option<Product>, RepositoryError> {
        let product: Option<ProductRow> = sqlx::query_as(
            r"
            SELECT id, handle, title, description, main_image
            FROM product
            WHERE handle = $1
            ",
        )
        .bind(handle)
        .fetch_optional(self.pool)
        .await?;

        match product {
            Some(row) => self.with_variants(row).await.map(Some),
            None => Ok(None),
        }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if a row cannot be interpreted.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product: Option<ProductRow> = sqlx::query_as(
            r"
            SELECT id, handle, title, description, main_image
            FROM product
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        match product {
            Some(row) => self.with_variants(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn with_variants(&self, product: ProductRow) -> Result<Product, RepositoryError> {
        let variants: Vec<VariantRow> = sqlx::query_as(
            r"
            SELECT id, product_id, material, purity, selected_size,
                   price, currency, stock, weight, weight_unit,
                   hs_code, country_of_origin
            FROM variant
            WHERE product_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(product.id)
        .fetch_all(self.pool)
        .await?;

        let mut assembled = assemble(vec![product], variants)?;
        assembled.pop().ok_or(RepositoryError::NotFound)
    }
}
