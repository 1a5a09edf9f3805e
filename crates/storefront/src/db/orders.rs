//! Order repository.
//!
//! Orders are write-once snapshots. `payment_session_id` carries a unique
//! constraint, so a payment callback replayed with the same session id
//! cannot create a second order: the insert is a no-op and the existing
//! order is returned instead.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use aurelia_core::{
    CurrencyCode, Money, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
    VariantId,
};

use super::RepositoryError;
use crate::models::address::ShippingAddress;
use crate::models::order::{NewOrder, Order, OrderItem};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    total: Decimal,
    currency: String,
    payment_method: String,
    payment_status: String,
    payment_session_id: String,
    status: String,
    full_name: String,
    address_line1: String,
    address_line2: Option<String>,
    city: String,
    state: String,
    zip_code: String,
    country: String,
    phone_number: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let currency: CurrencyCode = self
            .currency
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let payment_method: PaymentMethod = self
            .payment_method
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let payment_status: PaymentStatus = self
            .payment_status
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            items,
            shipping_address: ShippingAddress {
                full_name: self.full_name,
                address_line1: self.address_line1,
                address_line2: self.address_line2,
                city: self.city,
                state: self.state,
                zip_code: self.zip_code,
                country: self.country,
                phone_number: self.phone_number,
            },
            total: Money::new(self.total, currency),
            payment_method,
            payment_status,
            payment_session_id: self.payment_session_id,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: i64,
    product_id: i64,
    variant_id: i64,
    name: String,
    main_image: Option<String>,
    unit_price: Decimal,
    currency: String,
    quantity: i32,
}

impl OrderItemRow {
    fn into_item(self) -> Result<(OrderId, OrderItem), RepositoryError> {
        let currency: CurrencyCode = self
            .currency
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let quantity = u32::try_from(self.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative quantity: {}", self.quantity))
        })?;

        Ok((
            OrderId::new(self.order_id),
            OrderItem {
                product_id: ProductId::new(self.product_id),
                variant_id: VariantId::new(self.variant_id),
                name: self.name,
                main_image: self.main_image,
                unit_price: Money::new(self.unit_price, currency),
                quantity,
            },
        ))
    }
}

const SELECT_ORDER: &str = r"
    SELECT id, user_id, total, currency, payment_method, payment_status,
           payment_session_id, status, full_name, address_line1,
           address_line2, city, state, zip_code, country, phone_number,
           created_at
    FROM orders
";

const SELECT_ITEMS: &str = r"
    SELECT order_id, product_id, variant_id, name, main_image,
           unit_price, currency, quantity
    FROM order_item
";

/// Repository for order snapshots.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order, or return the existing one for the same payment
    /// session.
    ///
    /// # Returns
    ///
    /// `(order, created)` where `created` is `false` when the payment
    /// session had already been finalized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create_idempotent(
        &self,
        new: &NewOrder,
    ) -> Result<(Order, bool), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            r"
            INSERT INTO orders (
                user_id, total, currency, payment_method, payment_status,
                payment_session_id, status, full_name, address_line1,
                address_line2, city, state, zip_code, country, phone_number
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (payment_session_id) DO NOTHING
            RETURNING id, created_at
            ",
        )
        .bind(new.user_id.as_i64())
        .bind(new.total.amount)
        .bind(new.total.currency.code())
        .bind(new.payment_method.to_string())
        .bind(PaymentStatus::Confirmed.to_string())
        .bind(&new.payment_session_id)
        .bind(OrderStatus::Pending.to_string())
        .bind(&new.shipping_address.full_name)
        .bind(&new.shipping_address.address_line1)
        .bind(&new.shipping_address.address_line2)
        .bind(&new.shipping_address.city)
        .bind(&new.shipping_address.state)
        .bind(&new.shipping_address.zip_code)
        .bind(&new.shipping_address.country)
        .bind(&new.shipping_address.phone_number)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((order_id, created_at)) = inserted else {
            // Replayed callback: the order for this session already exists.
            drop(tx);
            let existing = self
                .get_by_payment_session(&new.payment_session_id)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            return Ok((existing, false));
        };

        for item in &new.items {
            sqlx::query(
                r"
                INSERT INTO order_item (
                    order_id, product_id, variant_id, name, main_image,
                    unit_price, currency, quantity
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(order_id)
            .bind(item.product_id.as_i64())
            .bind(item.variant_id.as_i64())
            .bind(&item.name)
            .bind(&item.main_image)
            .bind(item.unit_price.amount)
            .bind(item.unit_price.currency.code())
            .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let order = Order {
            id: OrderId::new(order_id),
            user_id: new.user_id,
            items: new.items.clone(),
            shipping_address: new.shipping_address.clone(),
            total: new.total,
            payment_method: new.payment_method,
            payment_status: PaymentStatus::Confirmed,
            payment_session_id: new.payment_session_id.clone(),
            status: OrderStatus::Pending,
            created_at,
        };

        Ok((order, true))
    }

    /// Get the order finalized for a payment session, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_payment_session(
        &self,
        payment_session_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("{SELECT_ORDER} WHERE payment_session_id = $1"))
                .bind(payment_session_id)
                .fetch_optional(self.pool)
                .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }

    /// Get one of a user's orders.
    ///
    /// Scoped by owner so users cannot read each other's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("{SELECT_ORDER} WHERE id = $1 AND user_id = $2"))
                .bind(order_id.as_i64())
                .bind(user_id.as_i64())
                .fetch_optional(self.pool)
                .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> =
            sqlx::query_as(&format!("{SELECT_ORDER} WHERE user_id = $1 ORDER BY id DESC"))
                .bind(user_id.as_i64())
                .fetch_all(self.pool)
                .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let item_rows: Vec<OrderItemRow> =
            sqlx::query_as(&format!("{SELECT_ITEMS} WHERE order_id = ANY($1) ORDER BY id ASC"))
                .bind(&ids)
                .fetch_all(self.pool)
                .await?;

        let mut items_by_order: std::collections::HashMap<OrderId, Vec<OrderItem>> =
            std::collections::HashMap::new();
        for row in item_rows {
            let (order_id, item) = row.into_item()?;
            items_by_order.entry(order_id).or_default().push(item);
        }

        rows.into_iter()
            .map(|row| {
                let items = items_by_order
                    .remove(&OrderId::new(row.id))
                    .unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }

    async fn hydrate(&self, row: OrderRow) -> Result<Order, RepositoryError> {
        let item_rows: Vec<OrderItemRow> =
            sqlx::query_as(&format!("{SELECT_ITEMS} WHERE order_id = $1 ORDER BY id ASC"))
                .bind(row.id)
                .fetch_all(self.pool)
                .await?;

        let items = item_rows
            .into_iter()
            .map(|r| r.into_item().map(|(_, item)| item))
            .collect::<Result<Vec<_>, _>>()?;

        row.into_order(items)
    }
}
