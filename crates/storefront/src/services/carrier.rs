//! Carrier address-validation API client.
//!
//! Standardizes and validates shipping addresses before checkout may
//! advance. Authenticates with OAuth client credentials; tokens are cached
//! until shortly before expiry, and validation outcomes are cached by
//! normalized address for five minutes.
//!
//! A carrier outage blocks checkout: there is deliberately no
//! accept-on-failure fallback, since an unvalidated address risks an
//! undeliverable shipment.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::CarrierConfig;
use crate::models::address::ShippingAddress;

/// Request timeout for carrier calls; a timeout surfaces as the same
/// service-error path as any other network failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Refresh the OAuth token this long before the carrier expires it.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Validation outcome cache TTL.
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Errors that can occur when interacting with the carrier API.
#[derive(Debug, Error)]
pub enum CarrierError {
    /// HTTP request failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// OAuth token request failed.
    #[error("Auth error: {0}")]
    Auth(String),

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Outcome of validating a shipping address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressValidation {
    /// Accepted exactly as entered.
    Valid,
    /// Accepted, but the carrier returned a canonical postal form which
    /// must replace the entered address.
    Standardized(ShippingAddress),
    /// Rejected; checkout must not advance. Messages are customer-facing.
    Rejected(Vec<String>),
}

/// Client for the carrier address-validation API.
#[derive(Clone)]
pub struct CarrierClient {
    inner: Arc<CarrierClientInner>,
}

struct CarrierClientInner {
    client: reqwest::Client,
    api_url: String,
    client_id: String,
    client_secret: String,
    token: tokio::sync::Mutex<Option<CachedToken>>,
    cache: Cache<String, AddressValidation>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CarrierClient {
    /// Create a new carrier API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CarrierConfig) -> Result<Self, CarrierError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(CarrierClientInner {
                client,
                api_url: config.api_url.trim_end_matches('/').to_string(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.expose_secret().to_string(),
                token: tokio::sync::Mutex::new(None),
                cache,
            }),
        })
    }

    /// Get a valid OAuth access token, refreshing if needed.
    async fn access_token(&self) -> Result<String, CarrierError> {
        let mut guard = self.inner.token.lock().await;

        if let Some(cached) = guard.as_ref()
            && cached.expires_at > Instant::now()
        {
            return Ok(cached.access_token.clone());
        }

        let url = format!("{}/oauth/token", self.inner.api_url);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.as_str()),
        ];

        let response = self.inner.client.post(&url).form(&params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CarrierError::Auth(format!("HTTP {status}: {message}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CarrierError::Parse(e.to_string()))?;

        let expires_at = Instant::now()
            + Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);

        let access_token = token.access_token.clone();
        *guard = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });

        Ok(access_token)
    }

    /// Validate a shipping address.
    ///
    /// # Errors
    ///
    /// Returns [`CarrierError`] if the carrier cannot be reached or returns
    /// an unusable response. Callers must treat this as blocking: the
    /// address is neither accepted nor rejected.
    #[instrument(skip(self, address), fields(country = %address.country))]
    pub async fn validate(
        &self,
        address: &ShippingAddress,
    ) -> Result<AddressValidation, CarrierError> {
        let cache_key = normalize_cache_key(address);

        if let Some(outcome) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for address validation");
            return Ok(outcome);
        }

        let token = self.access_token().await?;

        let mut street_lines = vec![address.address_line1.clone()];
        if let Some(line2) = &address.address_line2
            && !line2.trim().is_empty()
        {
            street_lines.push(line2.clone());
        }

        let body = serde_json::json!({
            "addressesToValidate": [{
                "address": {
                    "streetLines": street_lines,
                    "city": address.city,
                    "stateOrProvinceCode": address.state,
                    "postalCode": address.zip_code,
                    "countryCode": country_to_code(&address.country),
                }
            }]
        });

        let url = format!("{}/address/v1/addresses/resolve", self.inner.api_url);
        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CarrierError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ResolveResponse = response
            .json()
            .await
            .map_err(|e| CarrierError::Parse(e.to_string()))?;

        let resolved = parsed
            .output
            .resolved_addresses
            .into_iter()
            .next()
            .ok_or_else(|| CarrierError::Parse("no resolved address in response".to_string()))?;

        let outcome = outcome_from_resolved(resolved, address);

        self.inner.cache.insert(cache_key, outcome.clone()).await;

        Ok(outcome)
    }
}

/// Decide the validation outcome from a resolved address.
///
/// Customer messages reject the address outright; otherwise the carrier's
/// `Resolved` attribute means it produced a canonical form that replaces
/// the entered one. Name and phone are not postal data and carry over.
fn outcome_from_resolved(
    resolved: ResolvedAddress,
    original: &ShippingAddress,
) -> AddressValidation {
    if !resolved.customer_messages.is_empty() {
        let messages = resolved
            .customer_messages
            .into_iter()
            .map(|m| m.message)
            .collect();
        return AddressValidation::Rejected(messages);
    }

    let standardized = resolved
        .attributes
        .get("Resolved")
        .is_some_and(|v| v == "true");

    if !standardized {
        return AddressValidation::Valid;
    }

    let mut lines = resolved.street_lines_token.into_iter();
    AddressValidation::Standardized(ShippingAddress {
        full_name: original.full_name.clone(),
        address_line1: lines.next().unwrap_or_else(|| original.address_line1.clone()),
        address_line2: lines.next().filter(|l| !l.trim().is_empty()),
        city: resolved.city,
        state: resolved.state_or_province_code,
        zip_code: resolved.postal_code,
        country: code_to_country(&resolved.country_code),
        phone_number: original.phone_number.clone(),
    })
}

/// Cache key: the normalized postal fields of the address.
fn normalize_cache_key(address: &ShippingAddress) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}",
        address.address_line1.trim().to_lowercase(),
        address
            .address_line2
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_lowercase(),
        address.city.trim().to_lowercase(),
        address.state.trim().to_lowercase(),
        address.zip_code.trim().to_lowercase(),
        address.country.trim().to_lowercase(),
    )
}

// =============================================================================
// Country code mapping
// =============================================================================

/// Ship-to countries and their ISO codes.
const COUNTRIES: &[(&str, &str)] = &[
    ("US", "United States"),
    ("CA", "Canada"),
    ("GB", "United Kingdom"),
    ("AU", "Australia"),
    ("FR", "France"),
    ("DE", "Germany"),
    ("IT", "Italy"),
    ("ES", "Spain"),
    ("JP", "Japan"),
    ("IN", "India"),
];

/// Map a country name to its ISO code for the carrier request.
///
/// Two-letter input is assumed to already be a code.
fn country_to_code(country: &str) -> String {
    let trimmed = country.trim();
    if trimmed.len() == 2 {
        return trimmed.to_ascii_uppercase();
    }
    COUNTRIES
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(trimmed))
        .map_or_else(|| trimmed.to_string(), |(code, _)| (*code).to_string())
}

/// Map a carrier country code back to the display name used in addresses.
fn code_to_country(code: &str) -> String {
    COUNTRIES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code.trim()))
        .map_or_else(|| code.to_string(), |(_, name)| (*name).to_string())
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    output: ResolveOutput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveOutput {
    #[serde(default)]
    resolved_addresses: Vec<ResolvedAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedAddress {
    #[serde(default)]
    street_lines_token: Vec<String>,
    city: String,
    state_or_province_code: String,
    postal_code: String,
    country_code: String,
    #[serde(default)]
    customer_messages: Vec<CustomerMessage>,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CustomerMessage {
    #[allow(dead_code)]
    #[serde(default)]
    code: String,
    message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::address::tests::address;

    fn resolved(json: serde_json::Value) -> ResolvedAddress {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_customer_messages_reject() {
        let resolved = resolved(serde_json::json!({
            "streetLinesToken": [],
            "city": "MEMPHIS",
            "stateOrProvinceCode": "TN",
            "postalCode": "38117",
            "countryCode": "US",
            "customerMessages": [
                {"code": "STANDARDIZED.ADDRESS.NOTFOUND",
                 "message": "The address could not be found."},
                {"code": "SUITE.NUMBER.REQUIRED",
                 "message": "A suite number is required."}
            ]
        }));

        let outcome = outcome_from_resolved(resolved, &address());
        assert_eq!(
            outcome,
            AddressValidation::Rejected(vec![
                "The address could not be found.".to_string(),
                "A suite number is required.".to_string(),
            ])
        );
    }

    #[test]
    fn test_standardized_replaces_fields_exactly() {
        let resolved = resolved(serde_json::json!({
            "streetLinesToken": ["10 CROWN ST"],
            "city": "MEMPHIS",
            "stateOrProvinceCode": "TN",
            "postalCode": "38117-5017",
            "countryCode": "US",
            "attributes": {"Resolved": "true", "Matched": "true"}
        }));

        let original = address();
        let outcome = outcome_from_resolved(resolved, &original);

        let AddressValidation::Standardized(standardized) = outcome else {
            panic!("expected standardized outcome");
        };

        assert_eq!(standardized.address_line1, "10 CROWN ST");
        assert_eq!(standardized.address_line2, None);
        assert_eq!(standardized.city, "MEMPHIS");
        assert_eq!(standardized.state, "TN");
        assert_eq!(standardized.zip_code, "38117-5017");
        // Country code mapped back to display name
        assert_eq!(standardized.country, "United States");
        // Non-postal fields carry over from the entered address
        assert_eq!(standardized.full_name, original.full_name);
        assert_eq!(standardized.phone_number, original.phone_number);
    }

    #[test]
    fn test_unresolved_without_messages_is_valid() {
        let resolved = resolved(serde_json::json!({
            "streetLinesToken": ["10 Crown Street"],
            "city": "Memphis",
            "stateOrProvinceCode": "TN",
            "postalCode": "38117",
            "countryCode": "US",
            "attributes": {"Resolved": "false"}
        }));

        assert_eq!(
            outcome_from_resolved(resolved, &address()),
            AddressValidation::Valid
        );
    }

    #[test]
    fn test_country_mapping() {
        assert_eq!(country_to_code("United States"), "US");
        assert_eq!(country_to_code("united kingdom"), "GB");
        assert_eq!(country_to_code("fr"), "FR");
        // Unknown names pass through untouched
        assert_eq!(country_to_code("Atlantis"), "Atlantis");

        assert_eq!(code_to_country("US"), "United States");
        assert_eq!(code_to_country("it"), "Italy");
        assert_eq!(code_to_country("ZZ"), "ZZ");
    }

    #[test]
    fn test_normalize_cache_key_ignores_case_and_whitespace() {
        let a = address();
        let mut b = address();
        b.city = "  MEMPHIS ".to_string();
        assert_eq!(normalize_cache_key(&a), normalize_cache_key(&b));
    }

    #[test]
    fn test_second_street_line_preserved_when_present() {
        let resolved = resolved(serde_json::json!({
            "streetLinesToken": ["10 CROWN ST", "APT 4B"],
            "city": "MEMPHIS",
            "stateOrProvinceCode": "TN",
            "postalCode": "38117",
            "countryCode": "US",
            "attributes": {"Resolved": "true"}
        }));

        let AddressValidation::Standardized(standardized) =
            outcome_from_resolved(resolved, &address())
        else {
            panic!("expected standardized outcome");
        };
        assert_eq!(standardized.address_line2.as_deref(), Some("APT 4B"));
    }
}
