//! All centers at a glance.

use distribution_core::{Center, CenterId, Money, Points};
use serde::{Deserialize, Serialize};

/// One row of `centerOverviews`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterOverview {
    /// Center id
    pub id: CenterId,
    /// Center name
    pub name: String,
    /// Stored cumulative points
    pub points: Points,
    /// Stored cumulative donation
    pub donation: Money,
    /// Stored cumulative loss
    pub loss: Money,
    /// Registered users
    pub total_users: usize,
}

/// Rows for each center and its user count, sorted by name.
#[must_use]
pub fn center_overviews(centers: impl IntoIterator<Item = (Center, usize)>) -> Vec<CenterOverview> {
    let mut rows: Vec<CenterOverview> = centers
        .into_iter()
        .map(|(center, total_users)| CenterOverview {
            id: center.id,
            name: center.name,
            points: center.totals.points,
            donation: center.totals.donation,
            loss: center.totals.loss,
            total_users,
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}
