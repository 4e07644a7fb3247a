//! Fixed-point amounts: [`Money`] and [`Points`].
//!
//! Both types are integers under the hood so sums are exact. Money counts minor
//! currency units (paise); points count hundredths of a point, which keeps
//! fractional book point values such as `0.5` exact.
//!
//! Parsed amounts are capped at [`MAX_AMOUNT`] hundredths. Operator arithmetic
//! saturates at the `i64` bounds, so a report over an absurd volume clamps
//! instead of wrapping. Writes that must not clamp use the `checked_*` methods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a decimal amount cannot be turned into a fixed-point value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The input was not a finite number.
    #[error("amount is not a finite number: {0}")]
    NotFinite(String),

    /// The input could not be parsed as a decimal number.
    #[error("amount is not a decimal number: {0:?}")]
    Malformed(String),

    /// The input is out of the representable range.
    #[error("amount is out of range: {0}")]
    OutOfRange(String),
}

/// Largest magnitude, in hundredths, accepted when parsing an amount
/// (₹1,000,000,000,000.00 or a trillion points).
pub const MAX_AMOUNT: i64 = 100_000_000_000_000;

/// Converts a decimal major-unit value into hundredths, rounding half away from zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // range checked before the cast
fn hundredths_from_f64(value: f64) -> Result<i64, AmountError> {
    if !value.is_finite() {
        return Err(AmountError::NotFinite(value.to_string()));
    }
    let scaled = (value * 100.0).round();
    if scaled.abs() > MAX_AMOUNT as f64 {
        return Err(AmountError::OutOfRange(value.to_string()));
    }
    Ok(scaled as i64)
}

/// Parses `"150"`, `"99.5"` or `"-3.25"` into hundredths without going through floats.
fn hundredths_from_str(input: &str) -> Result<i64, AmountError> {
    let trimmed = input.trim();
    let malformed = || AmountError::Malformed(input.to_string());

    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(malformed());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    if fraction.len() > 2 {
        return Err(malformed());
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| AmountError::OutOfRange(input.to_string()))?
    };
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| malformed())? * 10,
        _ => fraction.parse().map_err(|_| malformed())?,
    };

    let value = whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(fraction))
        .filter(|v| *v <= MAX_AMOUNT)
        .ok_or_else(|| AmountError::OutOfRange(input.to_string()))?;
    Ok(if negative { -value } else { value })
}

fn fmt_hundredths(value: i64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Money amount in minor units (paise).
///
/// Signed because derived figures such as net profit may be negative; every
/// amount that enters the ledger is checked to be non-negative first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero rupees.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from minor units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates an amount from whole rupees.
    #[must_use]
    pub const fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    /// Creates an amount from a decimal rupee value, rounding to the nearest paisa.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] for NaN, infinities and values out of range.
    pub fn from_decimal(rupees: f64) -> Result<Self, AmountError> {
        hundredths_from_f64(rupees).map(Self)
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the amount as a decimal rupee value (for display and JSON consumers).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if this amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if this amount is below zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `self - other`, or zero when that would be negative.
    #[must_use]
    pub const fn saturating_excess_over(self, other: Self) -> Self {
        if self.0 > other.0 {
            Self(self.0 - other.0)
        } else {
            Self::ZERO
        }
    }

    /// `self + other`, or `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// `self * quantity`, or `None` on overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(quantity)).map(Self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("₹")?;
        fmt_hundredths(self.0, f)
    }
}

impl FromStr for Money {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hundredths_from_str(s).map(Self)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Reward points in hundredths of a point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Points(i64);

impl Points {
    /// No points.
    pub const ZERO: Self = Self(0);

    /// Creates a value from hundredths of a point.
    #[must_use]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// Creates a value from whole points.
    #[must_use]
    pub const fn from_whole(points: i64) -> Self {
        Self(points * 100)
    }

    /// Creates a value from a decimal point count, rounding to the nearest hundredth.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] for NaN, infinities and values out of range.
    pub fn from_decimal(points: f64) -> Result<Self, AmountError> {
        hundredths_from_f64(points).map(Self)
    }

    /// Returns the value in hundredths of a point.
    #[must_use]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    /// Returns the value as a decimal point count.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if this value is below zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// `self + other`, or `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}", self.0 / 100)
        } else {
            fmt_hundredths(self.0, f)
        }
    }
}

impl FromStr for Points {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hundredths_from_str(s).map(Self)
    }
}

impl Add for Points {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Points {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Points {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}
