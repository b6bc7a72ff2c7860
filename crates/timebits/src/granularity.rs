//! Time granularities and bucket arithmetic.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::error::KeyError;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// Days between the Unix epoch (a Thursday) and the first Monday, 1970-01-05.
const FIRST_MONDAY_OFFSET: i64 = 4;

/// A time granularity that events are bucketed into.
///
/// Variants are ordered from coarsest to finest, which is also the order in
/// which bucket keys are written on every track call.
///
/// All buckets are computed in UTC. Weeks start on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Granularity {
    /// Calendar year.
    Year,
    /// Calendar month.
    Month,
    /// ISO week, Monday to Sunday.
    Week,
    /// Calendar day.
    Day,
    /// Clock hour.
    Hour,
    /// Clock minute.
    Minute,
}

impl Granularity {
    /// Every granularity, coarsest first.
    pub const ALL: [Granularity; 6] = [
        Granularity::Year,
        Granularity::Month,
        Granularity::Week,
        Granularity::Day,
        Granularity::Hour,
        Granularity::Minute,
    ];

    /// Returns the tag used inside storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Year => "year",
            Granularity::Month => "month",
            Granularity::Week => "week",
            Granularity::Day => "day",
            Granularity::Hour => "hour",
            Granularity::Minute => "minute",
        }
    }

    /// Returns the integer index of the bucket containing `time`.
    ///
    /// Two timestamps share a bucket exactly when their indices are equal.
    /// Indices are floor-divided, so instants before the epoch land in the
    /// correct (negative) bucket.
    pub fn bucket_index(&self, time: DateTime<Utc>) -> i64 {
        let secs = time.timestamp();
        match self {
            Granularity::Year => i64::from(time.year()),
            Granularity::Month => i64::from(time.year()) * 12 + i64::from(time.month0()),
            Granularity::Week => {
                (secs.div_euclid(SECONDS_PER_DAY) - FIRST_MONDAY_OFFSET).div_euclid(7)
            }
            Granularity::Day => secs.div_euclid(SECONDS_PER_DAY),
            Granularity::Hour => secs.div_euclid(SECONDS_PER_HOUR),
            Granularity::Minute => secs.div_euclid(SECONDS_PER_MINUTE),
        }
    }

    /// Returns the first instant of the bucket with the given index.
    ///
    /// Returns `None` when the index lies outside chrono's representable range.
    pub fn bucket_start(&self, index: i64) -> Option<DateTime<Utc>> {
        let secs = match self {
            Granularity::Year => {
                let year = i32::try_from(index).ok()?;
                return start_of_month(year, 1);
            }
            Granularity::Month => {
                let year = i32::try_from(index.div_euclid(12)).ok()?;
                let month = u32::try_from(index.rem_euclid(12) + 1).ok()?;
                return start_of_month(year, month);
            }
            Granularity::Week => index
                .checked_mul(7)?
                .checked_add(FIRST_MONDAY_OFFSET)?
                .checked_mul(SECONDS_PER_DAY)?,
            Granularity::Day => index.checked_mul(SECONDS_PER_DAY)?,
            Granularity::Hour => index.checked_mul(SECONDS_PER_HOUR)?,
            Granularity::Minute => index.checked_mul(SECONDS_PER_MINUTE)?,
        };
        DateTime::from_timestamp(secs, 0)
    }

    /// Truncates `time` to the start of its bucket.
    pub fn truncate(&self, time: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.bucket_start(self.bucket_index(time))
    }
}

fn start_of_month(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KeyError::UnknownGranularity(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_ordering_is_coarsest_first() {
        let mut sorted = Granularity::ALL;
        sorted.sort();
        assert_eq!(sorted, Granularity::ALL);
        assert!(Granularity::Year < Granularity::Minute);
    }

    #[test]
    fn test_year_and_month_index() {
        let t = at(2026, 10, 19, 13, 45, 12);
        assert_eq!(Granularity::Year.bucket_index(t), 2026);
        assert_eq!(Granularity::Month.bucket_index(t), 2026 * 12 + 9);
    }

    #[test]
    fn test_week_starts_on_monday() {
        // 2026-10-19 is a Monday, 2026-10-25 the following Sunday.
        let monday = at(2026, 10, 19, 0, 0, 0);
        let sunday = at(2026, 10, 25, 23, 59, 59);
        let next_monday = at(2026, 10, 26, 0, 0, 0);

        let week = Granularity::Week;
        assert_eq!(week.bucket_index(monday), week.bucket_index(sunday));
        assert_eq!(week.bucket_index(next_monday), week.bucket_index(monday) + 1);
        assert_eq!(week.truncate(sunday), Some(monday));
    }

    #[test]
    fn test_week_before_first_monday() {
        // Sunday 1970-01-04 belongs to the week starting Monday 1969-12-29.
        let sunday = at(1970, 1, 4, 12, 0, 0);
        assert_eq!(Granularity::Week.bucket_index(sunday), -1);
        assert_eq!(
            Granularity::Week.truncate(sunday),
            Some(at(1969, 12, 29, 0, 0, 0))
        );
    }

    #[test]
    fn test_pre_epoch_day_floors() {
        let t = at(1969, 12, 31, 23, 0, 0);
        assert_eq!(Granularity::Day.bucket_index(t), -1);
        assert_eq!(Granularity::Day.truncate(t), Some(at(1969, 12, 31, 0, 0, 0)));
    }

    #[test]
    fn test_truncate_each_granularity() {
        let t = at(2026, 10, 21, 13, 45, 12);
        assert_eq!(Granularity::Year.truncate(t), Some(at(2026, 1, 1, 0, 0, 0)));
        assert_eq!(Granularity::Month.truncate(t), Some(at(2026, 10, 1, 0, 0, 0)));
        assert_eq!(Granularity::Week.truncate(t), Some(at(2026, 10, 19, 0, 0, 0)));
        assert_eq!(Granularity::Day.truncate(t), Some(at(2026, 10, 21, 0, 0, 0)));
        assert_eq!(Granularity::Hour.truncate(t), Some(at(2026, 10, 21, 13, 0, 0)));
        assert_eq!(
            Granularity::Minute.truncate(t),
            Some(at(2026, 10, 21, 13, 45, 0))
        );
    }

    #[test]
    fn test_bucket_start_out_of_range() {
        assert!(Granularity::Year.bucket_start(i64::MAX).is_none());
        assert!(Granularity::Minute.bucket_start(i64::MAX).is_none());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("week".parse::<Granularity>(), Ok(Granularity::Week));
        assert_eq!(" Hour ".parse::<Granularity>(), Ok(Granularity::Hour));
        assert!("fortnight".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_display_matches_tag() {
        for g in Granularity::ALL {
            assert_eq!(g.to_string(), g.as_str());
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Granularity::Minute).unwrap();
        assert_eq!(json, "\"minute\"");
        let back: Granularity = serde_json::from_str("\"day\"").unwrap();
        assert_eq!(back, Granularity::Day);
    }
}
