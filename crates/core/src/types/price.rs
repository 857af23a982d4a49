//! Type-safe price representation using decimal arithmetic.
//!
//! Prices come from a content backend that has shipped them both as JSON
//! numbers and as numeric strings, so every entry point here coerces either
//! form. Serialized prices are always JSON numbers.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when building a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a number.
    #[error("not a numeric amount: {0}")]
    Invalid(String),
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A non-negative unit price in the store currency.
///
/// Single currency. The amount is in the currency's standard unit
/// (e.g. euros, not cents).
///
/// ## Examples
///
/// ```
/// use boutique_core::Price;
/// use serde_json::json;
///
/// assert_eq!(Price::parse("12.50").unwrap().to_string(), "12.50");
/// assert_eq!(Price::coerce(&json!("19.9")), Price::parse("19.9").ok());
/// assert!(Price::parse("-1").is_err());
/// assert!(Price::coerce(&json!("free")).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount.normalize()))
    }

    /// Parse a price from its textual form (`"12"`, `"12.5"`, `" 3.99 "`).
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not numeric or is negative.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = parse_decimal(s).ok_or_else(|| PriceError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }

    /// Coerce a loosely-typed JSON value into a price.
    ///
    /// Accepts JSON numbers and numeric strings. Returns `None` for anything
    /// else, including negative amounts.
    #[must_use]
    pub fn coerce(value: &serde_json::Value) -> Option<Self> {
        coerce_decimal(value).and_then(|amount| Self::new(amount).ok())
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Subtotal for `quantity` units at this price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("{:.2}", self.0))
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        number::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = number::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

/// Coerce a JSON number or numeric string into a decimal.
#[must_use]
pub fn coerce_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => parse_decimal(&n.to_string()),
        serde_json::Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Serde adapter that stores a [`Decimal`] as a JSON number and reads it back
/// from either a number or a numeric string.
///
/// ```rust
/// # use rust_decimal::Decimal;
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Fee {
///     #[serde(with = "boutique_core::price::number")]
///     amount: Decimal,
/// }
/// ```
pub mod number {
    use super::{
        Decimal, Deserialize, Deserializer, Serializer, ToPrimitive, coerce_decimal, parse_decimal,
    };

    /// Serialize as an integer when the amount has no fractional part,
    /// otherwise as a float.
    ///
    /// An amount with more significant digits than an `f64` holds is written
    /// as its exact decimal text instead, which [`deserialize`] reads back
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        if value.fract().is_zero()
            && let Some(whole) = value.to_i64()
        {
            return serializer.serialize_i64(whole);
        }
        match value
            .to_f64()
            .filter(|float| parse_decimal(&float.to_string()) == Some(*value))
        {
            Some(float) => serializer.serialize_f64(float),
            None => serializer.serialize_str(&value.to_string()),
        }
    }

    /// Deserialize from a number or a numeric string.
    ///
    /// # Errors
    ///
    /// Fails if the value is neither.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        coerce_decimal(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a numeric value, got {raw}")))
    }
}
