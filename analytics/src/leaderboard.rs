//! Top devotees for a window.

use distribution_core::{Points, User, UserId};
use serde::{Deserialize, Serialize};

/// Leaderboard size.
pub const TOP_N: usize = 3;

/// The public face of a user on the leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// User id
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Phone number
    pub number: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            number: user.number.clone(),
        }
    }
}

/// One user's in-window tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Devotee {
    /// Who
    pub user: UserRef,
    /// Hand-outs in the window
    pub count: u64,
    /// Points earned in the window
    pub points: Points,
}

/// The first [`TOP_N`] tallies by count, descending.
///
/// Tallies with a zero count are dropped. Ties keep the order they arrived in.
#[must_use]
pub fn top_devotees(tallies: impl IntoIterator<Item = Devotee>) -> Vec<Devotee> {
    let mut ranked: Vec<Devotee> = tallies.into_iter().filter(|d| d.count > 0).collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_N);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn devotee(name: &str, count: u64) -> Devotee {
        Devotee {
            user: UserRef {
                id: UserId::new(),
                name: name.to_string(),
                number: String::new(),
            },
            count,
            points: Points::from_whole(i64::try_from(count).unwrap()),
        }
    }

    fn names(ranked: &[Devotee]) -> Vec<&str> {
        ranked.iter().map(|d| d.user.name.as_str()).collect()
    }

    #[test]
    fn ranks_by_count_and_keeps_three() {
        let ranked = top_devotees(vec![
            devotee("a", 1),
            devotee("b", 5),
            devotee("c", 3),
            devotee("d", 4),
        ]);
        assert_eq!(names(&ranked), vec!["b", "d", "c"]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let ranked = top_devotees(vec![
            devotee("a", 2),
            devotee("b", 2),
            devotee("c", 2),
            devotee("d", 2),
        ]);
        assert_eq!(names(&ranked), vec!["a", "b", "c"]);
    }

    #[test]
    fn zero_counts_never_rank() {
        let ranked = top_devotees(vec![devotee("idle", 0), devotee("busy", 1)]);
        assert_eq!(names(&ranked), vec!["busy"]);
    }

    proptest! {
        #[test]
        fn never_more_than_three_and_never_zero(counts in proptest::collection::vec(0u64..5, 0..12)) {
            let ranked = top_devotees(counts.iter().map(|c| devotee("u", *c)));
            prop_assert!(ranked.len() <= TOP_N);
            prop_assert!(ranked.iter().all(|d| d.count > 0));
            prop_assert!(ranked.windows(2).all(|w| w[0].count >= w[1].count));
        }
    }
}
