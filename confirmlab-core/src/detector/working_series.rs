//! Mutable per-attempt overlay over a subject's raw series.
//!
//! **Core rule:** effective values may be lowered, never raised.
//!
//! The overlay is created fresh for every detection attempt and dropped when
//! the attempt terminates. Raw values are kept alongside so a reader can see
//! which points the rejection loop disputed.

use chrono::NaiveDate;

use crate::domain::Measurement;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkingSeries {
    dates: Vec<NaiveDate>,
    raw: Vec<f64>,
    effective: Vec<f64>,
}

impl WorkingSeries {
    /// Seed the overlay from measurements already ordered by `(date, value)`.
    pub fn from_measurements(measurements: &[Measurement]) -> Self {
        let dates = measurements.iter().map(|m| m.date).collect();
        let raw: Vec<f64> = measurements.iter().map(|m| m.value).collect();
        Self {
            dates,
            effective: raw.clone(),
            raw,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn date(&self, idx: usize) -> NaiveDate {
        self.dates[idx]
    }

    pub fn effective(&self, idx: usize) -> f64 {
        self.effective[idx]
    }

    pub fn raw(&self, idx: usize) -> f64 {
        self.raw[idx]
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn effective_values(&self) -> &[f64] {
        &self.effective
    }

    /// Index of the first point strictly after `date`.
    pub fn first_index_after(&self, date: NaiveDate) -> usize {
        self.dates.partition_point(|d| *d <= date)
    }

    /// Number of points strictly after `date`.
    pub fn count_after(&self, date: NaiveDate) -> usize {
        self.len() - self.first_index_after(date)
    }

    /// Lower the effective value at `idx` to `value`.
    ///
    /// A proposal above the current effective value is ignored. Returns the
    /// effective value after the call.
    pub fn lower_to(&mut self, idx: usize, value: f64) -> f64 {
        let slot = &mut self.effective[idx];
        if value < *slot {
            *slot = value;
        }
        *slot
    }

    /// Points whose effective value differs from the raw observation.
    pub fn lowered_count(&self) -> usize {
        self.raw
            .iter()
            .zip(&self.effective)
            .filter(|(r, e)| r != e)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws() -> WorkingSeries {
        let base = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        WorkingSeries::from_measurements(&[
            Measurement::new(base, 2.0),
            Measurement::new(base + chrono::Duration::days(10), 4.0),
            Measurement::new(base + chrono::Duration::days(10), 4.5),
            Measurement::new(base + chrono::Duration::days(20), 3.0),
        ])
    }

    #[test]
    fn lowering_is_applied() {
        let mut s = ws();
        assert_eq!(s.lower_to(1, 2.5), 2.5);
        assert_eq!(s.effective(1), 2.5);
        assert_eq!(s.raw(1), 4.0);
        assert_eq!(s.lowered_count(), 1);
    }

    #[test]
    fn raising_is_ignored() {
        let mut s = ws();
        assert_eq!(s.lower_to(0, 9.0), 2.0);
        assert_eq!(s.lowered_count(), 0);
    }

    #[test]
    fn index_after_skips_same_date_points() {
        let s = ws();
        assert_eq!(s.first_index_after(s.date(1)), 3);
        assert_eq!(s.count_after(s.date(0)), 3);
        assert_eq!(s.count_after(s.date(3)), 0);
    }
}
