//! Authenticated cart repository.
//!
//! One row per `(user, product, variant)`; the primary key enforces the
//! cart's line-uniqueness invariant at the storage layer. Add and merge use
//! the same upsert, so same-key quantities are always summed, never
//! overwritten.

use rust_decimal::Decimal;
use sqlx::PgPool;

use aurelia_core::{CurrencyCode, Money, ProductId, UserId, VariantId};

use super::RepositoryError;
use crate::models::cart::{CartItem, LineKey, VariantDetails, WeightUnit};

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: i64,
    variant_id: i64,
    quantity: i32,
    name: String,
    main_image: Option<String>,
    material: String,
    purity: Option<String>,
    selected_size: Option<String>,
    price: Decimal,
    currency: String,
    weight: Decimal,
    weight_unit: String,
    hs_code: Option<String>,
    country_of_origin: Option<String>,
}

impl CartItemRow {
    fn into_item(self) -> Result<CartItem, RepositoryError> {
        let currency: CurrencyCode = self
            .currency
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let weight_unit: WeightUnit = self
            .weight_unit
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let quantity = u32::try_from(self.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative quantity: {}", self.quantity))
        })?;

        Ok(CartItem {
            product_id: ProductId::new(self.product_id),
            variant_id: VariantId::new(self.variant_id),
            quantity,
            name: self.name,
            main_image: self.main_image,
            variant: VariantDetails {
                material: self.material,
                purity: self.purity,
                selected_size: self.selected_size,
                price: Money::new(self.price, currency),
                weight: self.weight,
                weight_unit,
                hs_code: self.hs_code,
                country_of_origin: self.country_of_origin,
            },
        })
    }
}

const UPSERT_SQL: &str = r"
    INSERT INTO cart_item (
        user_id, product_id, variant_id, quantity, name, main_image,
        material, purity, selected_size, price, currency,
        weight, weight_unit, hs_code, country_of_origin
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
    ON CONFLICT (user_id, product_id, variant_id)
    DO UPDATE SET quantity = cart_item.quantity + EXCLUDED.quantity
";

/// Repository for authenticated users' cart lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch all cart lines for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if a row cannot be interpreted.
    pub async fn fetch_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows: Vec<CartItemRow> = sqlx::query_as(
            r"
            SELECT product_id, variant_id, quantity, name, main_image,
                   material, purity, selected_size, price, currency,
                   weight, weight_unit, hs_code, country_of_origin
            FROM cart_item
            WHERE user_id = $1
            ORDER BY added_at ASC
            ",
        )
        .bind(user_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartItemRow::into_item).collect()
    }

    /// Insert a line, summing the quantity into an existing same-key line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert_add(&self, user_id: UserId, item: &CartItem) -> Result<(), RepositoryError> {
        bind_item(sqlx::query(UPSERT_SQL), user_id, item)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Set the quantity of an existing line. Missing lines are left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        key: LineKey,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE cart_item
            SET quantity = $4
            WHERE user_id = $1 AND product_id = $2 AND variant_id = $3
            ",
        )
        .bind(user_id.as_i64())
        .bind(key.product_id.as_i64())
        .bind(key.variant_id.as_i64())
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Delete a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_item(&self, user_id: UserId, key: LineKey) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            DELETE FROM cart_item
            WHERE user_id = $1 AND product_id = $2 AND variant_id = $3
            ",
        )
        .bind(user_id.as_i64())
        .bind(key.product_id.as_i64())
        .bind(key.variant_id.as_i64())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Merge a batch of lines in one transaction.
    ///
    /// Either the whole guest cart merges or none of it does, so a failed
    /// merge leaves both carts unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any upsert fails.
    pub async fn merge_items(
        &self,
        user_id: UserId,
        items: &[CartItem],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for item in items {
            if item.quantity == 0 {
                continue;
            }
            bind_item(sqlx::query(UPSERT_SQL), user_id, item)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete every line for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_item WHERE user_id = $1")
            .bind(user_id.as_i64())
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

fn bind_item<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    user_id: UserId,
    item: &'q CartItem,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(user_id.as_i64())
        .bind(item.product_id.as_i64())
        .bind(item.variant_id.as_i64())
        .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
        .bind(&item.name)
        .bind(&item.main_image)
        .bind(&item.variant.material)
        .bind(&item.variant.purity)
        .bind(&item.variant.selected_size)
        .bind(item.variant.price.amount)
        .bind(item.variant.price.currency.code())
        .bind(item.variant.weight)
        .bind(item.variant.weight_unit.to_string())
        .bind(&item.variant.hs_code)
        .bind(&item.variant.country_of_origin)
}
