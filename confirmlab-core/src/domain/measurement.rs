//! Measurement — the fundamental observed unit, and the per-subject raw series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::ids::SubjectId;

/// One rating-scale observation for one subject on one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub date: NaiveDate,
    pub value: f64,
}

impl Measurement {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// The reference point against which later increases are measured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub value: f64,
    pub date: NaiveDate,
}

impl Baseline {
    pub fn new(value: f64, date: NaiveDate) -> Self {
        Self { value, date }
    }
}

impl From<Measurement> for Baseline {
    fn from(m: Measurement) -> Self {
        Self {
            value: m.value,
            date: m.date,
        }
    }
}

/// A subject's raw series, ordered by `(date, value)`.
///
/// Same-date measurements sort lowest value first, so every "earliest
/// measurement" lookup resolves date ties to the lowest value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSeries {
    pub subject: SubjectId,
    measurements: Vec<Measurement>,
}

impl SubjectSeries {
    /// Build a series from measurements in any order. Non-finite values are dropped.
    pub fn new(subject: SubjectId, mut measurements: Vec<Measurement>) -> Self {
        measurements.retain(|m| m.value.is_finite());
        measurements.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal))
        });
        Self {
            subject,
            measurements,
        }
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn first(&self) -> Option<&Measurement> {
        self.measurements.first()
    }

    /// Earliest measurement with `from <= date <= to`.
    pub fn first_within(&self, from: NaiveDate, to: NaiveDate) -> Option<&Measurement> {
        self.measurements
            .iter()
            .find(|m| m.date >= from && m.date <= to)
    }

    /// Earliest measurement on or after `date`.
    pub fn first_on_or_after(&self, date: NaiveDate) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.date >= date)
    }

    /// Earliest measurement strictly after `date`.
    pub fn first_after(&self, date: NaiveDate) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.date > date)
    }

    /// All measurements strictly after `date`, in series order.
    pub fn after(&self, date: NaiveDate) -> &[Measurement] {
        let start = self.measurements.partition_point(|m| m.date <= date);
        &self.measurements[start..]
    }
}
