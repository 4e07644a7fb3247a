//! Raw requests as they arrive at the query boundary.
//!
//! Identifiers come in as strings and amounts as loose JSON values (a number,
//! a numeric string, or nothing). `validate` turns each request into typed
//! arguments or an [`LedgerError::InvalidArgument`] naming the bad field.
//! Amounts are never negative; the sign is checked before any rounding.

use distribution_core::{
    AmountError, BookId, BookType, CenterId, Language, LedgerError, Money, Points, Result, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

pub(crate) fn id<T>(field: &str, raw: &str) -> Result<T>
where
    T: FromStr<Err = LedgerError>,
{
    raw.trim()
        .parse()
        .map_err(|_| LedgerError::invalid(format!("{field} is not a valid id: {raw:?}")))
}

fn decimal<T>(
    field: &str,
    value: Option<&Value>,
    from_f64: fn(f64) -> std::result::Result<T, AmountError>,
) -> Result<Option<T>>
where
    T: FromStr<Err = AmountError>,
{
    let negative = || LedgerError::invalid(format!("{field} cannot be negative"));
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => {
            let raw = n
                .as_f64()
                .ok_or_else(|| LedgerError::invalid(format!("{field} is out of range")))?;
            if raw < 0.0 {
                return Err(negative());
            }
            from_f64(raw).map_err(|e| LedgerError::invalid(format!("{field}: {e}")))?
        }
        Some(Value::String(s)) => {
            if s.trim_start().starts_with('-') {
                return Err(negative());
            }
            s.parse()
                .map_err(|e| LedgerError::invalid(format!("{field}: {e}")))?
        }
        Some(other) => {
            return Err(LedgerError::invalid(format!("{field} must be a number, got {other}")));
        }
    };
    Ok(Some(parsed))
}

fn money(field: &str, value: Option<&Value>) -> Result<Option<Money>> {
    decimal(field, value, Money::from_decimal)
}

fn required_money(field: &str, value: Option<&Value>) -> Result<Money> {
    money(field, value)?.ok_or_else(|| LedgerError::invalid(format!("{field} is required")))
}

fn quantity(value: Option<&Value>) -> Result<u32> {
    let raw = match value {
        None | Some(Value::Null) => return Err(LedgerError::invalid("quantity is required")),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    }
    .ok_or_else(|| LedgerError::invalid("quantity must be a whole number"))?;

    u32::try_from(raw)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| LedgerError::invalid(format!("quantity must be at least 1, got {raw}")))
}

/// `recordDistribution` input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDistribution {
    /// User handing out the book
    pub user_id: String,
    /// Book handed out
    pub book_id: String,
    /// Amount collected
    #[serde(default)]
    pub price_paid: Option<Value>,
}

/// Validated [`RecordDistribution`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DistributionArgs {
    /// User handing out the book
    pub user: UserId,
    /// Book handed out
    pub book: BookId,
    /// Amount collected, at least zero
    pub price_paid: Money,
}

impl RecordDistribution {
    /// Parses ids and the price.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] for a malformed id or a missing,
    /// negative or non-numeric price.
    pub fn validate(&self) -> Result<DistributionArgs> {
        Ok(DistributionArgs {
            user: id("userId", &self.user_id)?,
            book: id("bookId", &self.book_id)?,
            price_paid: required_money("pricePaid", self.price_paid.as_ref())?,
        })
    }
}

/// `recordStock` input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStock {
    /// Receiving center
    pub center_id: String,
    /// Book received
    pub book_id: String,
    /// Number of copies
    #[serde(default)]
    pub quantity: Option<Value>,
    /// Cost of the batch; defaults to list price times quantity
    #[serde(default)]
    pub cost_paid: Option<Value>,
}

/// Validated [`RecordStock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockArgs {
    /// Receiving center
    pub center: CenterId,
    /// Book received
    pub book: BookId,
    /// At least one
    pub quantity: u32,
    /// Explicit cost, if given
    pub cost_paid: Option<Money>,
}

impl RecordStock {
    /// Parses ids, quantity and the optional cost.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] for a malformed id, a quantity below
    /// one, or a negative or non-numeric cost.
    pub fn validate(&self) -> Result<StockArgs> {
        Ok(StockArgs {
            center: id("centerId", &self.center_id)?,
            book: id("bookId", &self.book_id)?,
            quantity: quantity(self.quantity.as_ref())?,
            cost_paid: money("costPaid", self.cost_paid.as_ref())?,
        })
    }
}

/// `registerBook` input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterBook {
    /// Title
    pub name: String,
    /// Type code (`MB`, `B`, `M`, `S`, `SB`, `CC`)
    #[serde(rename = "type")]
    pub book_type: String,
    /// Language name
    pub language: String,
    /// Points per hand-out
    #[serde(default)]
    pub point: Option<Value>,
    /// List price
    #[serde(default)]
    pub price: Option<Value>,
}

/// Validated [`RegisterBook`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookArgs {
    /// Title
    pub name: String,
    /// Type
    pub book_type: BookType,
    /// Language
    pub language: Language,
    /// Points per hand-out
    pub point: Points,
    /// List price
    pub price: Money,
}

impl RegisterBook {
    /// Parses type, language and amounts.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] for an unknown type or language, or a
    /// missing, negative or non-numeric point value or price.
    pub fn validate(&self) -> Result<BookArgs> {
        let point = decimal("point", self.point.as_ref(), Points::from_decimal)?
            .ok_or_else(|| LedgerError::invalid("point is required"))?;
        Ok(BookArgs {
            name: self.name.clone(),
            book_type: self.book_type.parse()?,
            language: self.language.parse()?,
            point,
            price: required_money("price", self.price.as_ref())?,
        })
    }
}

/// `registerCenter` input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCenter {
    /// Unique center name
    pub name: String,
}

/// `registerUser` input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    /// Display name
    pub name: String,
    /// Phone number
    pub number: String,
    /// Owning center
    pub center_id: String,
}

impl RegisterUser {
    /// Parses the center id.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] for a malformed id.
    pub fn center(&self) -> Result<CenterId> {
        id("centerId", &self.center_id)
    }
}
