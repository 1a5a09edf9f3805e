//! Shipping address domain type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A required address field was empty.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("missing required address field: {0}")]
pub struct AddressError(pub &'static str);

/// A shipping address as entered by the shopper.
///
/// May be replaced wholesale with the carrier-standardized form before it
/// is attached to an order; see [`crate::services::carrier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone_number: String,
}

impl ShippingAddress {
    /// Check that every required field is non-blank.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError`] naming the first missing field.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required: [(&'static str, &str); 7] = [
            ("full_name", &self.full_name),
            ("address_line1", &self.address_line1),
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
            ("phone_number", &self.phone_number),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AddressError(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            address_line1: "10 Crown Street".to_string(),
            address_line2: None,
            city: "Memphis".to_string(),
            state: "TN".to_string(),
            zip_code: "38117".to_string(),
            country: "United States".to_string(),
            phone_number: "+1 901 555 0101".to_string(),
        }
    }

    #[test]
    fn test_validate_complete_address() {
        assert!(address().validate().is_ok());
    }

    #[test]
    fn test_validate_names_first_missing_field() {
        let mut addr = address();
        addr.city = "  ".to_string();
        assert_eq!(addr.validate(), Err(AddressError("city")));
    }

    #[test]
    fn test_line2_is_optional() {
        let mut addr = address();
        addr.address_line2 = None;
        assert!(addr.validate().is_ok());
    }

    #[test]
    fn test_serde_omits_empty_line2() {
        let json = serde_json::to_value(address()).unwrap();
        assert!(json.get("address_line2").is_none());
    }
}
