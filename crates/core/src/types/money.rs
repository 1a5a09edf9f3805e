//! Type-safe monetary amounts using decimal arithmetic.
//!
//! Cart subtotals and order totals are always recomputed from line items
//! with [`Money`] arithmetic; floating point never touches a price.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from monetary arithmetic.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoneyError {
    /// Attempted to combine amounts in different currencies.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        left: CurrencyCode,
        right: CurrencyCode,
    },
    /// Arithmetic overflowed the decimal range.
    #[error("monetary amount overflow")]
    Overflow,
}

/// A monetary amount with its currency.
///
/// Amounts are in the currency's standard unit (dollars, not cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Decimal amount (preserves precision).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Create an amount from the smallest currency unit (e.g. cents for USD).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::new(minor, 2),
            currency,
        }
    }

    /// Amount in the smallest currency unit, rounded half-up.
    ///
    /// Payment providers express line amounts in minor units.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the amount does not fit in `i64`.
    pub fn minor_units(&self) -> Result<i64, MoneyError> {
        self.amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(MoneyError::Overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(MoneyError::Overflow)
    }

    /// Add two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns an error on currency mismatch or overflow.
    pub fn checked_add(&self, other: &Self) -> Result<Self, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self {
            amount,
            currency: self.currency,
        })
    }

    /// Multiply by a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the result does not fit.
    pub fn checked_mul(&self, quantity: u32) -> Result<Self, MoneyError> {
        let amount = self
            .amount
            .checked_mul(Decimal::from(quantity))
            .ok_or(MoneyError::Overflow)?;
        Ok(Self {
            amount,
            currency: self.currency,
        })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:.2}", self.currency.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes supported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }

    /// ISO 4217 three-letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }

    /// Lowercase code as payment providers expect it.
    #[must_use]
    pub fn provider_code(&self) -> String {
        self.code().to_ascii_lowercase()
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(format!("unsupported currency code: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn usd(s: &str) -> Money {
        Money::new(s.parse().unwrap(), CurrencyCode::USD)
    }

    #[test]
    fn test_checked_add_same_currency() {
        let sum = usd("129.99").checked_add(&usd("70.01")).unwrap();
        assert_eq!(sum, usd("200.00"));
    }

    #[test]
    fn test_checked_add_currency_mismatch() {
        let eur = Money::new(Decimal::TEN, CurrencyCode::EUR);
        assert!(matches!(
            usd("10").checked_add(&eur),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_checked_mul() {
        let line = usd("49.50").checked_mul(3).unwrap();
        assert_eq!(line, usd("148.50"));
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(usd("1299.99").minor_units().unwrap(), 129_999);
    }

    #[test]
    fn test_minor_units_rounds_half_up() {
        assert_eq!(usd("10.005").minor_units().unwrap(), 1001);
    }

    #[test]
    fn test_from_minor_units_roundtrip() {
        let price = Money::from_minor_units(34_999, CurrencyCode::USD);
        assert_eq!(price, usd("349.99"));
        assert_eq!(price.minor_units().unwrap(), 34_999);
    }

    #[test]
    fn test_display() {
        assert_eq!(usd("89.9").to_string(), "$89.90");
        let gbp = Money::new("120".parse().unwrap(), CurrencyCode::GBP);
        assert_eq!(gbp.to_string(), "\u{a3}120.00");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_provider_code() {
        assert_eq!(CurrencyCode::USD.provider_code(), "usd");
    }
}
