//! Type-safe money representation.
//!
//! The Shopify Ajax API reports every price as an integer number of minor
//! units (cents). [`Money`] keeps that representation for arithmetic and only
//! switches to decimal arithmetic for display and for parsing the decimal
//! strings some endpoints (search suggestions) return.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing a decimal price string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseMoneyError {
    #[error("invalid decimal amount: {0}")]
    InvalidDecimal(String),
    #[error("amount out of range: {0}")]
    OutOfRange(String),
}

/// An amount in minor currency units (cents).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create an amount from cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Amount in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Amount in the currency's standard unit (e.g. dollars).
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Parse a decimal string such as `"19.99"` into cents.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a decimal number or does not fit
    /// into an `i64` number of cents.
    pub fn parse_decimal(s: &str) -> Result<Self, ParseMoneyError> {
        let amount = Decimal::from_str(s.trim())
            .map_err(|_| ParseMoneyError::InvalidDecimal(s.to_string()))?;
        let cents = (amount * Decimal::ONE_HUNDRED).round();
        cents
            .to_i64()
            .map(Self)
            .ok_or_else(|| ParseMoneyError::OutOfRange(s.to_string()))
    }

    /// Whether this amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_decimal())
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * i64::from(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    CNY,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::CNY => "¥",
        }
    }
}
