//! Stock reconciliation: what arrived at a center versus what was handed out.

use crate::breakdown::BookIndex;
use distribution_core::{Book, BookId, Money, StockEvent, User};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How many stock entries `recentEntries` shows.
pub const RECENT_ENTRIES: usize = 10;

/// Stock received for one book.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    /// The book
    pub book: Book,
    /// Σ quantity
    pub stock_added: u64,
    /// Σ cost paid
    pub total_cost_paid: Money,
}

/// Hand-outs of one book at the center.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributedBook {
    /// The book
    pub book: Book,
    /// Number of hand-outs
    pub count: u64,
    /// Σ price paid
    pub total_revenue: Money,
}

/// Stock level of one book.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    /// The book
    pub book: Book,
    /// Σ quantity received
    pub stock_added: u64,
    /// Number of hand-outs
    pub distributed: u64,
    /// `stock_added - distributed`; negative means over-distribution
    pub remaining: i64,
}

/// Center-wide money figures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTotals {
    /// Σ cost paid over all stock entries
    pub total_cost_paid: Money,
    /// Σ price paid over all hand-outs
    pub total_revenue: Money,
    /// `total_revenue - total_cost_paid`, may be negative
    pub net_profit: Money,
}

/// `stockStatus` output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockStatus {
    /// Per book with stock
    pub stock_summary: Vec<StockSummary>,
    /// Per book handed out
    pub distributed_books: Vec<DistributedBook>,
    /// Per book with stock
    pub current_stock: Vec<StockLevel>,
    /// Money totals
    pub totals: StockTotals,
    /// Newest stock entries first
    pub recent_entries: Vec<StockEvent>,
}

#[derive(Default)]
struct Received {
    quantity: u64,
    cost: Money,
}

#[derive(Default)]
struct HandedOut {
    count: u64,
    revenue: Money,
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Reconciles a center's stock entries against its users' distributions.
///
/// Money sums clamp at the `i64` range rather than wrapping.
#[must_use]
pub fn stock_status(entries: &[StockEvent], users: &[User], books: &BookIndex) -> StockStatus {
    let mut received: IndexMap<BookId, Received> = IndexMap::new();
    let mut total_cost_paid = Money::ZERO;
    for entry in entries {
        let r = received.entry(entry.book).or_default();
        r.quantity += u64::from(entry.quantity);
        r.cost += entry.cost_paid;
        total_cost_paid += entry.cost_paid;
    }

    let mut handed_out: IndexMap<BookId, HandedOut> = IndexMap::new();
    let mut total_revenue = Money::ZERO;
    for event in users.iter().flat_map(|u| u.distributions.iter()) {
        let h = handed_out.entry(event.book).or_default();
        h.count += 1;
        h.revenue += event.price_paid;
        total_revenue += event.price_paid;
    }

    let mut stock_summary = Vec::with_capacity(received.len());
    let mut current_stock = Vec::with_capacity(received.len());
    for (id, r) in &received {
        let Some(book) = books.get(id) else { continue };
        let distributed = handed_out.get(id).map_or(0, |h| h.count);
        stock_summary.push(StockSummary {
            book: book.clone(),
            stock_added: r.quantity,
            total_cost_paid: r.cost,
        });
        current_stock.push(StockLevel {
            book: book.clone(),
            stock_added: r.quantity,
            distributed,
            remaining: to_i64(r.quantity) - to_i64(distributed),
        });
    }

    let distributed_books = handed_out
        .iter()
        .filter_map(|(id, h)| {
            books.get(id).map(|book| DistributedBook {
                book: book.clone(),
                count: h.count,
                total_revenue: h.revenue,
            })
        })
        .collect();

    let mut recent_entries: Vec<StockEvent> = entries.iter().rev().cloned().collect();
    recent_entries.sort_by(|a, b| b.date.cmp(&a.date));
    recent_entries.truncate(RECENT_ENTRIES);

    StockStatus {
        stock_summary,
        distributed_books,
        current_stock,
        totals: StockTotals {
            total_cost_paid,
            total_revenue,
            net_profit: total_revenue - total_cost_paid,
        },
        recent_entries,
    }
}
