//! Cross-checks a center's stored totals against its users'.
//!
//! A distribution whose center-side increment failed leaves the user's totals
//! ahead of the center's. The audit makes that drift visible.

use distribution_core::{Center, CenterId, Drift, Totals, User};
use serde::{Deserialize, Serialize};

/// `auditCenter` output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    /// Audited center
    pub center_id: CenterId,
    /// Totals stored on the center
    pub center_totals: Totals,
    /// Σ of the totals stored on its users
    pub user_totals: Totals,
    /// `center_totals - user_totals`
    pub drift: Drift,
    /// Users summed
    pub users_checked: usize,
}

impl ConsistencyReport {
    /// True when the center matches the sum of its users exactly.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }
}

/// Compares `center` with the sum over `users`.
#[must_use]
pub fn audit_center(center: &Center, users: &[User]) -> ConsistencyReport {
    let user_totals: Totals = users.iter().map(|u| u.totals).sum();
    ConsistencyReport {
        center_id: center.id,
        center_totals: center.totals,
        user_totals,
        drift: center.totals.drift_from(&user_totals),
        users_checked: users.len(),
    }
}
