//! Ledger events and the append-only distribution log.

use crate::catalog::{BookId, CenterId, StockId};
use crate::error::{LedgerError, Result};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single book hand-out, embedded in its user's [`DistributionLog`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionEvent {
    /// Book handed out
    pub book: BookId,
    /// Amount actually collected
    pub price_paid: Money,
    /// When the hand-out happened
    pub date: DateTime<Utc>,
}

impl DistributionEvent {
    /// Creates an event after checking the price.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] if `price_paid` is negative.
    pub fn new(book: BookId, price_paid: Money, date: DateTime<Utc>) -> Result<Self> {
        if price_paid.is_negative() {
            return Err(LedgerError::invalid("price paid cannot be negative"));
        }
        Ok(Self {
            book,
            price_paid,
            date,
        })
    }
}

/// Insert-only sequence of a user's distributions in chronological order.
///
/// Events cannot be edited or removed once appended.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistributionLog(Vec<DistributionEvent>);

impl DistributionLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an event at the end.
    pub fn append(&mut self, event: DistributionEvent) {
        self.0.push(event);
    }

    /// Iterates in append order.
    pub fn iter(&self) -> std::slice::Iter<'_, DistributionEvent> {
        self.0.iter()
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing was ever appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The most recent event.
    #[must_use]
    pub fn last(&self) -> Option<&DistributionEvent> {
        self.0.last()
    }
}

impl FromIterator<DistributionEvent> for DistributionLog {
    fn from_iter<I: IntoIterator<Item = DistributionEvent>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DistributionLog {
    type Item = &'a DistributionEvent;
    type IntoIter = std::slice::Iter<'a, DistributionEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A batch of books received by a center.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockEvent {
    /// Entry identifier
    pub id: StockId,
    /// Receiving center
    pub center: CenterId,
    /// Book received
    pub book: BookId,
    /// Number of copies, at least one
    pub quantity: u32,
    /// What the center paid for the batch
    pub cost_paid: Money,
    /// When the batch was recorded
    pub date: DateTime<Utc>,
}

impl StockEvent {
    /// Creates a stock entry after checking quantity and cost.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] if `quantity` is zero or
    /// `cost_paid` is negative.
    pub fn new(
        center: CenterId,
        book: BookId,
        quantity: u32,
        cost_paid: Money,
        date: DateTime<Utc>,
    ) -> Result<Self> {
        if quantity == 0 {
            return Err(LedgerError::invalid("quantity must be at least 1"));
        }
        if cost_paid.is_negative() {
            return Err(LedgerError::invalid("cost paid cannot be negative"));
        }
        Ok(Self {
            id: StockId::new(),
            center,
            book,
            quantity,
            cost_paid,
            date,
        })
    }
}
