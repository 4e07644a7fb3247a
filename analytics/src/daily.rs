//! One center's activity on one local calendar day.

use crate::breakdown::BookIndex;
use crate::leaderboard::{Devotee, UserRef, top_devotees};
use crate::window::DayWindow;
use chrono::NaiveDate;
use distribution_core::{BookType, Center, CenterId, Contribution, Language, Money, Points, Totals, User};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Composite grouping key for the daily breakdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeLanguage {
    /// Book type
    #[serde(rename = "type")]
    pub book_type: BookType,
    /// Book language
    pub language: Language,
}

/// Figures for one (type, language) pair within the day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyGroup {
    /// The grouping key
    #[serde(flatten)]
    pub key: TypeLanguage,
    /// Hand-outs
    pub count: u64,
    /// Σ book points
    pub total_points: Points,
    /// Σ price paid
    pub total_price: Money,
}

/// Day totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotals {
    /// Hand-outs in the window
    pub total_distributions: u64,
    /// Σ book points
    pub total_points: Points,
    /// Σ donation
    pub total_donation: Money,
    /// Σ loss
    pub total_loss: Money,
}

/// Center name and id, without totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterRef {
    /// Center id
    pub id: CenterId,
    /// Center name
    pub name: String,
}

/// `dailyAnalytics` output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAnalytics {
    /// The center
    pub center: CenterRef,
    /// The local calendar day, rendered `YYYY-MM-DD`
    pub date: NaiveDate,
    /// Day totals
    pub totals: DailyTotals,
    /// Figures per (type, language), in order of first occurrence
    pub type_breakdown: Vec<DailyGroup>,
    /// At most three users with the most hand-outs
    pub top_devotees: Vec<Devotee>,
}

/// Computes the day's figures from the center's users.
///
/// Only events inside `window` whose book still resolves are counted.
#[must_use]
pub fn daily_analytics(
    center: &Center,
    users: &[User],
    books: &BookIndex,
    window: &DayWindow,
) -> DailyAnalytics {
    let mut totals = Totals::default();
    let mut count = 0u64;
    let mut groups: IndexMap<TypeLanguage, DailyGroup> = IndexMap::new();
    let mut tallies = Vec::with_capacity(users.len());

    for user in users {
        let mut tally = Devotee {
            user: UserRef::from(user),
            count: 0,
            points: Points::ZERO,
        };
        let in_window = user.distributions.iter().filter(|e| window.contains(e.date));
        for (event, book) in books.resolve(in_window) {
            totals.apply(&Contribution::assess(book, event.price_paid));
            count += 1;

            let key = TypeLanguage {
                book_type: book.book_type,
                language: book.language,
            };
            let group = groups.entry(key).or_insert_with(|| DailyGroup {
                key,
                count: 0,
                total_points: Points::ZERO,
                total_price: Money::ZERO,
            });
            group.count += 1;
            group.total_points += book.point;
            group.total_price += event.price_paid;

            tally.count += 1;
            tally.points += book.point;
        }
        tallies.push(tally);
    }

    DailyAnalytics {
        center: CenterRef {
            id: center.id,
            name: center.name.clone(),
        },
        date: window.date(),
        totals: DailyTotals {
            total_distributions: count,
            total_points: totals.points,
            total_donation: totals.donation,
            total_loss: totals.loss,
        },
        type_breakdown: groups.into_values().collect(),
        top_devotees: top_devotees(tallies),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};
    use distribution_core::{Book, DistributionEvent};
    use distribution_testing::fixtures::book;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn hand_out(user: &mut User, book: &Book, paid: i64, at: DateTime<Utc>) {
        user.distributions
            .append(DistributionEvent::new(book.id, Money::from_rupees(paid), at).unwrap());
    }

    fn window() -> DayWindow {
        DayWindow::for_date(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(), utc()).unwrap()
    }

    #[test]
    fn boundaries_are_half_open() {
        let center = Center::new("IYMF Panathur").unwrap();
        let gita = book("Gita", BookType::Big, Language::English, 2, 100);
        let books: BookIndex = std::iter::once(gita.clone()).collect();
        let w = window();

        let mut user = User::new("Ravi", "1", center.id, Utc::now()).unwrap();
        hand_out(&mut user, &gita, 100, w.start());
        hand_out(&mut user, &gita, 100, w.end());
        hand_out(&mut user, &gita, 100, w.start() - chrono::Duration::seconds(1));

        let report = daily_analytics(&center, &[user], &books, &w);
        assert_eq!(report.totals.total_distributions, 1);
        assert_eq!(report.totals.total_points, Points::from_whole(2));
    }

    #[test]
    fn groups_by_type_and_language() {
        let center = Center::new("IYMF Panathur").unwrap();
        let english = book("Gita", BookType::Big, Language::English, 2, 100);
        let hindi = book("Gita", BookType::Big, Language::Hindi, 2, 100);
        let books: BookIndex = [english.clone(), hindi.clone()].into_iter().collect();
        let noon = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

        let mut user = User::new("Ravi", "1", center.id, Utc::now()).unwrap();
        hand_out(&mut user, &hindi, 150, noon);
        hand_out(&mut user, &english, 60, noon);
        hand_out(&mut user, &hindi, 100, noon);

        let report = daily_analytics(&center, &[user], &books, &window());
        let keys: Vec<_> = report.type_breakdown.iter().map(|g| g.key.language).collect();
        assert_eq!(keys, vec![Language::Hindi, Language::English]);
        assert_eq!(report.type_breakdown[0].count, 2);
        assert_eq!(report.totals.total_donation, Money::from_rupees(50));
        assert_eq!(report.totals.total_loss, Money::from_rupees(40));
    }

    #[test]
    fn leaderboard_only_counts_the_window() {
        let center = Center::new("IYMF Panathur").unwrap();
        let gita = book("Gita", BookType::Big, Language::English, 2, 100);
        let books: BookIndex = std::iter::once(gita.clone()).collect();
        let noon = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let yesterday = noon - chrono::Duration::days(1);

        let mut early = User::new("Early", "1", center.id, Utc::now()).unwrap();
        for _ in 0..5 {
            hand_out(&mut early, &gita, 100, yesterday);
        }
        let mut today = User::new("Today", "2", center.id, Utc::now()).unwrap();
        hand_out(&mut today, &gita, 100, noon);

        let report = daily_analytics(&center, &[early, today], &books, &window());
        assert_eq!(report.top_devotees.len(), 1);
        assert_eq!(report.top_devotees[0].user.name, "Today");
        assert_eq!(report.top_devotees[0].points, Points::from_whole(2));
    }

    #[test]
    fn serializes_date_and_flat_group_keys() {
        let center = Center::new("IYMF Panathur").unwrap();
        let gita = book("Gita", BookType::ChaitanyaCharitamrita, Language::Bengali, 2, 100);
        let books: BookIndex = std::iter::once(gita.clone()).collect();
        let mut user = User::new("Ravi", "1", center.id, Utc::now()).unwrap();
        hand_out(&mut user, &gita, 100, Utc.with_ymd_and_hms(2024, 3, 10, 1, 0, 0).unwrap());

        let json = serde_json::to_value(daily_analytics(&center, &[user], &books, &window())).unwrap();
        assert_eq!(json["date"], "2024-03-10");
        assert_eq!(json["typeBreakdown"][0]["type"], "CC");
        assert_eq!(json["typeBreakdown"][0]["language"], "Bengali");
        assert_eq!(json["topDevotees"][0]["count"], 1);
    }
}
