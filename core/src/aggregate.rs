//! Running totals kept on users and centers.
//!
//! A [`Contribution`] is what one distribution adds. [`Totals`] is the running
//! sum of contributions; it is only ever moved forward by [`Totals::apply`].

use crate::catalog::Book;
use crate::money::{Money, Points};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;

/// The points, donation and loss credited by a single distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// Points credited (the book's point value).
    pub points: Points,
    /// Amount paid above the list price.
    pub donation: Money,
    /// Amount paid below the list price.
    pub loss: Money,
}

impl Contribution {
    /// Prices a hand-out of `book` for `price_paid`.
    ///
    /// At most one of donation and loss is non-zero; both are zero when the
    /// list price was paid exactly.
    #[must_use]
    pub const fn assess(book: &Book, price_paid: Money) -> Self {
        Self {
            points: book.point,
            donation: price_paid.saturating_excess_over(book.price),
            loss: book.price.saturating_excess_over(price_paid),
        }
    }
}

/// Cumulative points, donation and loss.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Cumulative points.
    pub points: Points,
    /// Cumulative donation.
    pub donation: Money,
    /// Cumulative loss.
    pub loss: Money,
}

impl Totals {
    /// Adds one contribution.
    pub fn apply(&mut self, contribution: &Contribution) {
        self.points += contribution.points;
        self.donation += contribution.donation;
        self.loss += contribution.loss;
    }

    /// Returns a copy with `contribution` applied.
    #[must_use]
    pub fn with(mut self, contribution: &Contribution) -> Self {
        self.apply(contribution);
        self
    }

    /// Returns a copy with `contribution` applied, or `None` if any field
    /// would overflow.
    #[must_use]
    pub fn checked_with(&self, contribution: &Contribution) -> Option<Self> {
        Some(Self {
            points: self.points.checked_add(contribution.points)?,
            donation: self.donation.checked_add(contribution.donation)?,
            loss: self.loss.checked_add(contribution.loss)?,
        })
    }

    /// Signed difference `self - other`, field by field.
    #[must_use]
    pub fn drift_from(&self, other: &Self) -> Drift {
        Drift {
            points: self.points - other.points,
            donation: self.donation - other.donation,
            loss: self.loss - other.loss,
        }
    }
}

impl Add for Totals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            points: self.points + rhs.points,
            donation: self.donation + rhs.donation,
            loss: self.loss + rhs.loss,
        }
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a Contribution> for Totals {
    fn sum<I: Iterator<Item = &'a Contribution>>(iter: I) -> Self {
        iter.fold(Self::default(), |totals, c| totals.with(c))
    }
}

/// Signed per-field difference between two [`Totals`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drift {
    /// Points difference.
    pub points: Points,
    /// Donation difference.
    pub donation: Money,
    /// Loss difference.
    pub loss: Money,
}

impl Drift {
    /// True when every field is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}
