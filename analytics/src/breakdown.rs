//! Grouped figures over distribution events: per book type and per book.

use distribution_core::{Book, BookId, BookType, Center, DistributionEvent, Money, Points, User};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Catalog books keyed by id, used to resolve distribution events.
#[derive(Clone, Debug, Default)]
pub struct BookIndex(HashMap<BookId, Book>);

impl BookIndex {
    /// Looks up a book.
    #[must_use]
    pub fn get(&self, id: &BookId) -> Option<&Book> {
        self.0.get(id)
    }

    /// Pairs each event with its book, skipping events whose book is gone.
    pub fn resolve<'a, I>(&'a self, events: I) -> impl Iterator<Item = (&'a DistributionEvent, &'a Book)>
    where
        I: IntoIterator<Item = &'a DistributionEvent>,
        I::IntoIter: 'a,
    {
        events
            .into_iter()
            .filter_map(move |event| self.get(&event.book).map(|book| (event, book)))
    }
}

impl FromIterator<Book> for BookIndex {
    fn from_iter<T: IntoIterator<Item = Book>>(iter: T) -> Self {
        Self(iter.into_iter().map(|b| (b.id, b)).collect())
    }
}

/// Count and sums for one group of distributions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Figures {
    /// Number of hand-outs
    pub count: u64,
    /// Σ price paid
    pub total_price: Money,
    /// Σ book points
    pub total_points: Points,
    /// Σ max(price paid − list price, 0)
    pub total_donation: Money,
}

impl Figures {
    /// Adds one resolved hand-out.
    pub fn record(&mut self, event: &DistributionEvent, book: &Book) {
        self.count += 1;
        self.total_price += event.price_paid;
        self.total_points += book.point;
        self.total_donation += event.price_paid.saturating_excess_over(book.price);
    }
}

/// Figures for one book type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSummary {
    /// The book type
    #[serde(rename = "type")]
    pub book_type: BookType,
    /// Accumulated figures
    #[serde(flatten)]
    pub figures: Figures,
}

/// Figures for one book.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    /// The book
    pub book: Book,
    /// Accumulated figures
    #[serde(flatten)]
    pub figures: Figures,
}

/// Groups resolved events by book type, in order of first occurrence.
pub fn by_type<'a>(pairs: impl Iterator<Item = (&'a DistributionEvent, &'a Book)>) -> Vec<TypeSummary> {
    let mut groups: IndexMap<BookType, Figures> = IndexMap::new();
    for (event, book) in pairs {
        groups.entry(book.book_type).or_default().record(event, book);
    }
    groups
        .into_iter()
        .map(|(book_type, figures)| TypeSummary { book_type, figures })
        .collect()
}

/// Groups resolved events by book, in order of first occurrence.
pub fn by_book<'a>(pairs: impl Iterator<Item = (&'a DistributionEvent, &'a Book)>) -> Vec<BookSummary> {
    let mut groups: IndexMap<BookId, (&Book, Figures)> = IndexMap::new();
    for (event, book) in pairs {
        groups
            .entry(book.id)
            .or_insert_with(|| (book, Figures::default()))
            .1
            .record(event, book);
    }
    groups
        .into_values()
        .map(|(book, figures)| BookSummary {
            book: book.clone(),
            figures,
        })
        .collect()
}

/// `analyzeCenter` output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterAnalytics {
    /// The center and its stored totals
    pub center: Center,
    /// Figures per book type
    pub type_breakdown: Vec<TypeSummary>,
    /// Figures per book
    pub book_breakdown: Vec<BookSummary>,
    /// Number of users registered at the center
    pub total_users: usize,
}

/// Builds the center breakdown from its users, in registration order.
#[must_use]
pub fn analyze_center(center: Center, users: &[User], books: &BookIndex) -> CenterAnalytics {
    let events = || users.iter().flat_map(|u| u.distributions.iter());
    CenterAnalytics {
        center,
        type_breakdown: by_type(books.resolve(events())),
        book_breakdown: by_book(books.resolve(events())),
        total_users: users.len(),
    }
}
