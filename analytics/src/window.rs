//! Civil-day windows for daily analytics.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, Utc};
use distribution_core::{LedgerError, Result};

/// Parses a strict `YYYY-MM-DD` calendar date.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidArgument`] for anything else, including
/// impossible dates such as `2024-02-30`.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    let well_formed = trimmed.len() == 10
        && trimmed
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(LedgerError::invalid(format!(
            "date must be YYYY-MM-DD, got {input:?}"
        )));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|e| LedgerError::invalid(format!("invalid date {input:?}: {e}")))
}

/// The half-open interval `[local midnight of date, local midnight of date + 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayWindow {
    date: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DayWindow {
    /// The window for `date` in the civil calendar at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] if the date has no successor
    /// (the end of chrono's range).
    pub fn for_date(date: NaiveDate, offset: FixedOffset) -> Result<Self> {
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| LedgerError::invalid(format!("date {date} is out of range")))?;
        Ok(Self {
            date,
            start: local_midnight(date, offset),
            end: local_midnight(next, offset),
        })
    }

    /// The window of the local day that contains `instant`.
    ///
    /// # Errors
    ///
    /// See [`DayWindow::for_date`].
    pub fn containing(instant: DateTime<Utc>, offset: FixedOffset) -> Result<Self> {
        Self::for_date(instant.with_timezone(&offset).date_naive(), offset)
    }

    /// The local calendar date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// First instant inside the window.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// First instant after the window.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `instant` falls in `[start, end)`.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    (local - chrono::Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
    }

    #[test]
    fn parses_only_strict_dates() {
        assert_eq!(
            parse_date("2024-03-10").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
        assert!(parse_date("2024-3-10").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("10/03/2024").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn window_starts_at_local_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let window = DayWindow::for_date(date, ist()).unwrap();
        assert_eq!(
            window.start(),
            Utc.with_ymd_and_hms(2024, 3, 9, 18, 30, 0).unwrap()
        );
        assert_eq!(
            window.end(),
            Utc.with_ymd_and_hms(2024, 3, 10, 18, 30, 0).unwrap()
        );
    }

    #[test]
    fn window_is_half_open() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let window = DayWindow::for_date(date, FixedOffset::east_opt(0).unwrap()).unwrap();
        assert!(window.contains(window.start()));
        assert!(!window.contains(window.end()));
        assert!(window.contains(window.end() - chrono::Duration::nanoseconds(1)));
        assert!(!window.contains(window.start() - chrono::Duration::nanoseconds(1)));
    }

    #[test]
    fn containing_uses_the_local_date() {
        // 20:00 UTC on the 9th is already the 10th in India.
        let instant = Utc.with_ymd_and_hms(2024, 3, 9, 20, 0, 0).unwrap();
        let window = DayWindow::containing(instant, ist()).unwrap();
        assert_eq!(window.date(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }
}
