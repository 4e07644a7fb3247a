//! Per-book breakdown of a single user's hand-outs.

use crate::breakdown::BookIndex;
use chrono::{DateTime, Utc};
use distribution_core::{Book, BookId, CenterId, Money, Points, User, UserId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The user's identity and stored totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTotals {
    /// User id
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Phone number
    pub number: String,
    /// Owning center
    pub center: CenterId,
    /// Cumulative points
    pub points: Points,
    /// Cumulative donation
    pub total_donation: Money,
    /// Cumulative loss
    pub total_loss: Money,
}

/// How often the user handed out one book.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBookCount {
    /// The book
    pub book: Book,
    /// Hand-outs
    pub count: u64,
    /// Σ book points
    pub total_points: Points,
}

/// `userAnalytics` output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    /// Identity and totals
    pub user: UserTotals,
    /// Per book, in order of first hand-out
    pub book_breakdown: Vec<UserBookCount>,
    /// Every appended event, resolved or not
    pub total_distributions: usize,
}

/// Builds the per-book view of `user`.
#[must_use]
pub fn user_analytics(user: &User, books: &BookIndex) -> UserAnalytics {
    let mut groups: IndexMap<BookId, UserBookCount> = IndexMap::new();
    for (_, book) in books.resolve(&user.distributions) {
        let entry = groups.entry(book.id).or_insert_with(|| UserBookCount {
            book: book.clone(),
            count: 0,
            total_points: Points::ZERO,
        });
        entry.count += 1;
        entry.total_points += book.point;
    }

    UserAnalytics {
        user: UserTotals::of(user),
        book_breakdown: groups.into_values().collect(),
        total_distributions: user.distributions.len(),
    }
}

/// A distribution with its book resolved, if it still exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedDistribution {
    /// The book, or `None` if it was removed from the catalog
    pub book: Option<Book>,
    /// Amount collected
    pub price_paid: Money,
    /// When it happened
    pub date: DateTime<Utc>,
}

/// A user with their full history joined to the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedUser {
    /// Identity and totals
    #[serde(flatten)]
    pub user: UserTotals,
    /// History in append order
    pub distributions: Vec<PopulatedDistribution>,
    /// When the user was registered
    pub created_at: DateTime<Utc>,
}

impl UserTotals {
    fn of(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            number: user.number.clone(),
            center: user.center,
            points: user.totals.points,
            total_donation: user.totals.donation,
            total_loss: user.totals.loss,
        }
    }
}

/// Joins every event of `user` to its book.
#[must_use]
pub fn populate_user(user: &User, books: &BookIndex) -> PopulatedUser {
    PopulatedUser {
        user: UserTotals::of(user),
        distributions: user
            .distributions
            .iter()
            .map(|event| PopulatedDistribution {
                book: books.get(&event.book).cloned(),
                price_paid: event.price_paid,
                date: event.date,
            })
            .collect(),
        created_at: user.created_at,
    }
}
