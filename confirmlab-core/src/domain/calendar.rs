//! Day offsets that saturate at the ends of the calendar instead of panicking.

use chrono::{Duration, NaiveDate};

/// `date + days`, clamped to `NaiveDate::MIN..=NaiveDate::MAX`.
pub fn offset_days(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|d| date.checked_add_signed(d))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_offsets() {
        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(offset_days(d, 31), NaiveDate::from_ymd_opt(2020, 2, 1).unwrap());
        assert_eq!(offset_days(d, -1), NaiveDate::from_ymd_opt(2019, 12, 31).unwrap());
        assert_eq!(offset_days(d, 0), d);
    }

    #[test]
    fn huge_offsets_saturate() {
        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(offset_days(d, 1_000_000_000), NaiveDate::MAX);
        assert_eq!(offset_days(d, -1_000_000_000), NaiveDate::MIN);
        assert_eq!(offset_days(d, i64::MAX), NaiveDate::MAX);
        assert_eq!(offset_days(d, i64::MIN), NaiveDate::MIN);
    }
}
