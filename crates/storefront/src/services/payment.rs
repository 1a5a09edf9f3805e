//! Payment provider client for hosted checkout sessions.
//!
//! Creates a hosted payment session from the final cart contents and later
//! retrieves it to confirm the shopper actually paid before an order is
//! finalized. The provider speaks form-encoded requests and JSON responses
//! in the Stripe style; amounts travel in minor units.

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use aurelia_core::{MoneyError, PaymentMethod};

use crate::config::PaymentConfig;
use crate::models::cart::CartItem;

/// Request timeout for payment provider calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur when interacting with the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A line amount could not be expressed in minor units.
    #[error("Amount error: {0}")]
    Amount(#[from] MoneyError),
}

/// A newly created hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Opaque session identifier; correlates the redirect callback.
    pub id: String,
    /// Hosted payment page the shopper is redirected to.
    pub url: String,
}

/// A retrieved checkout session's settlement state.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStatus {
    pub id: String,
    /// "paid", "unpaid" or "no_payment_required".
    pub payment_status: String,
}

impl SessionStatus {
    /// Whether the session settled.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// Client for the hosted-checkout payment provider.
#[derive(Clone)]
pub struct PaymentClient {
    inner: Arc<PaymentClientInner>,
}

struct PaymentClientInner {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
    success_url: String,
    cancel_url: String,
}

impl PaymentClient {
    /// Create a new payment provider client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(PaymentClientInner {
                client,
                api_url: config.api_url.trim_end_matches('/').to_string(),
                secret_key: config.secret_key.expose_secret().to_string(),
                success_url: config.success_url.clone(),
                cancel_url: config.cancel_url.clone(),
            }),
        })
    }

    /// Create a hosted checkout session for the given cart lines.
    ///
    /// No local state is mutated here; the session only becomes an order
    /// when the shopper returns and finalization runs.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] if the provider rejects the request or
    /// cannot be reached.
    #[instrument(skip(self, items), fields(line_count = items.len()))]
    pub async fn create_session(
        &self,
        items: &[CartItem],
        method: PaymentMethod,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.inner.success_url.clone()),
            ("cancel_url".to_string(), self.inner.cancel_url.clone()),
            (
                "payment_method_types[0]".to_string(),
                method.to_string(),
            ),
        ];

        for (i, item) in items.iter().enumerate() {
            form.push((
                format!("line_items[{i}][quantity]"),
                item.quantity.to_string(),
            ));
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                item.variant.price.currency.provider_code(),
            ));
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                item.variant.price.minor_units()?.to_string(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
        }

        let url = format!("{}/v1/checkout/sessions", self.inner.api_url);
        let response = self
            .inner
            .client
            .post(&url)
            .basic_auth(&self.inner.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }

    /// Retrieve a session to check whether it settled.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] if the session is unknown or the provider
    /// cannot be reached.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError> {
        let url = format!("{}/v1/checkout/sessions/{session_id}", self.inner.api_url);
        let response = self
            .inner
            .client
            .get(&url)
            .basic_auth(&self.inner.secret_key, None::<&str>)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_is_paid() {
        let paid: SessionStatus = serde_json::from_value(serde_json::json!({
            "id": "cs_test_123",
            "payment_status": "paid"
        }))
        .unwrap();
        assert!(paid.is_paid());

        let unpaid: SessionStatus = serde_json::from_value(serde_json::json!({
            "id": "cs_test_456",
            "payment_status": "unpaid"
        }))
        .unwrap();
        assert!(!unpaid.is_paid());
    }

    #[test]
    fn test_checkout_session_parses_provider_response() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_a1B2c3",
            "url": "https://checkout.provider.test/pay/cs_test_a1B2c3",
            "object": "checkout.session",
            "livemode": false
        }))
        .unwrap();
        assert_eq!(session.id, "cs_test_a1B2c3");
        assert!(session.url.contains("cs_test_a1B2c3"));
    }
}
