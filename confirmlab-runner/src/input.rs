//! In-memory input contracts for a batch.
//!
//! Upstream loaders hand over three row sets: measurements, index dates, and
//! (optionally) relapses. File parsing happens elsewhere; this module only
//! enforces the row contracts and groups rows per subject:
//! 1. Measurement rows with a missing or non-finite value, or a missing date,
//!    are dropped and counted
//! 2. Any row without a subject id is an error
//! 3. Every subject needs exactly one dated index row
//! 4. Measurements or relapses for a subject without an index row are an error
//! 5. Relapse rows must carry a date

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use confirmlab_core::{Measurement, SubjectId, SubjectSeries};

/// Input contract violations. Always fatal at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("{table} row {row} has no subject id")]
    MissingSubjectId { table: &'static str, row: usize },

    #[error("index row for subject '{subject}' has no date")]
    MissingIndexDate { subject: SubjectId },

    #[error("subject '{subject}' has more than one index row")]
    DuplicateIndex { subject: SubjectId },

    #[error("{table} rows reference subject '{subject}' which has no index row")]
    UnknownSubject {
        table: &'static str,
        subject: SubjectId,
    },

    #[error("relapse row {row} for subject '{subject}' has no date")]
    MissingRelapseDate { subject: SubjectId, row: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    pub subject: Option<String>,
    pub date: Option<NaiveDate>,
    pub value: Option<f64>,
}

impl MeasurementRow {
    pub fn new(subject: &str, date: NaiveDate, value: f64) -> Self {
        Self {
            subject: Some(subject.to_string()),
            date: Some(date),
            value: Some(value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedRow {
    pub subject: Option<String>,
    pub date: Option<NaiveDate>,
}

impl DatedRow {
    pub fn new(subject: &str, date: NaiveDate) -> Self {
        Self {
            subject: Some(subject.to_string()),
            date: Some(date),
        }
    }
}

pub type IndexRow = DatedRow;
pub type RelapseRow = DatedRow;

/// Everything the pipeline needs for one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    pub series: SubjectSeries,
    pub index_date: NaiveDate,
    /// Ascending.
    pub relapses: Vec<NaiveDate>,
}

impl SubjectRecord {
    pub fn subject(&self) -> &SubjectId {
        &self.series.subject
    }
}

/// A validated batch of subjects, ordered by subject id.
#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    subjects: Vec<SubjectRecord>,
    has_relapse_stream: bool,
    dropped_measurements: usize,
}

impl Cohort {
    /// Validate and group raw rows. `relapses = None` means the batch has no
    /// relapse stream at all (events stay unclassified).
    pub fn from_rows(
        measurements: Vec<MeasurementRow>,
        index: Vec<IndexRow>,
        relapses: Option<Vec<RelapseRow>>,
    ) -> Result<Self, InputError> {
        let mut index_dates: BTreeMap<SubjectId, NaiveDate> = BTreeMap::new();
        for (row, r) in index.into_iter().enumerate() {
            let subject = subject_id("index", row, r.subject)?;
            let date = r.date.ok_or_else(|| InputError::MissingIndexDate {
                subject: subject.clone(),
            })?;
            if index_dates.insert(subject.clone(), date).is_some() {
                return Err(InputError::DuplicateIndex { subject });
            }
        }

        let mut per_subject: HashMap<SubjectId, Vec<Measurement>> = HashMap::new();
        let mut dropped = 0usize;
        for (row, m) in measurements.into_iter().enumerate() {
            let subject = subject_id("measurement", row, m.subject)?;
            if !index_dates.contains_key(&subject) {
                return Err(InputError::UnknownSubject {
                    table: "measurement",
                    subject,
                });
            }
            match (m.date, m.value) {
                (Some(date), Some(value)) if value.is_finite() => {
                    per_subject
                        .entry(subject)
                        .or_default()
                        .push(Measurement::new(date, value));
                }
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!("dropped {dropped} measurement row(s) with a missing date or value");
        }

        let has_relapse_stream = relapses.is_some();
        let mut relapse_dates: HashMap<SubjectId, Vec<NaiveDate>> = HashMap::new();
        for (row, r) in relapses.unwrap_or_default().into_iter().enumerate() {
            let subject = subject_id("relapse", row, r.subject)?;
            if !index_dates.contains_key(&subject) {
                return Err(InputError::UnknownSubject {
                    table: "relapse",
                    subject,
                });
            }
            let date = r
                .date
                .ok_or_else(|| InputError::MissingRelapseDate {
                    subject: subject.clone(),
                    row,
                })?;
            relapse_dates.entry(subject).or_default().push(date);
        }

        let subjects = index_dates
            .into_iter()
            .map(|(subject, index_date)| {
                let measurements = per_subject.remove(&subject).unwrap_or_default();
                let mut relapses = relapse_dates.remove(&subject).unwrap_or_default();
                relapses.sort();
                relapses.dedup();
                SubjectRecord {
                    series: SubjectSeries::new(subject, measurements),
                    index_date,
                    relapses,
                }
            })
            .collect();

        Ok(Self {
            subjects,
            has_relapse_stream,
            dropped_measurements: dropped,
        })
    }

    pub fn builder() -> CohortBuilder {
        CohortBuilder::default()
    }

    pub fn subjects(&self) -> &[SubjectRecord] {
        &self.subjects
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn has_relapse_stream(&self) -> bool {
        self.has_relapse_stream
    }

    pub fn dropped_measurements(&self) -> usize {
        self.dropped_measurements
    }

    pub fn measurement_count(&self) -> usize {
        self.subjects.iter().map(|s| s.series.len()).sum()
    }
}

fn subject_id(table: &'static str, row: usize, raw: Option<String>) -> Result<SubjectId, InputError> {
    match raw {
        Some(s) if !s.trim().is_empty() => Ok(SubjectId::new(s)),
        _ => Err(InputError::MissingSubjectId { table, row }),
    }
}

/// Row accumulator for callers that already hold typed values.
#[derive(Debug, Clone, Default)]
pub struct CohortBuilder {
    measurements: Vec<MeasurementRow>,
    index: Vec<IndexRow>,
    relapses: Option<Vec<RelapseRow>>,
}

impl CohortBuilder {
    pub fn subject(mut self, subject: &str, index_date: NaiveDate) -> Self {
        self.index.push(DatedRow::new(subject, index_date));
        self
    }

    pub fn measurement(mut self, subject: &str, date: NaiveDate, value: f64) -> Self {
        self.measurements
            .push(MeasurementRow::new(subject, date, value));
        self
    }

    pub fn measurements(mut self, subject: &str, points: &[(NaiveDate, f64)]) -> Self {
        self.measurements.extend(
            points
                .iter()
                .map(|&(date, value)| MeasurementRow::new(subject, date, value)),
        );
        self
    }

    /// Marks the batch as carrying a relapse stream, even if empty.
    pub fn with_relapse_stream(mut self) -> Self {
        self.relapses.get_or_insert_with(Vec::new);
        self
    }

    pub fn relapse(mut self, subject: &str, date: NaiveDate) -> Self {
        self.relapses
            .get_or_insert_with(Vec::new)
            .push(DatedRow::new(subject, date));
        self
    }

    pub fn build(self) -> Result<Cohort, InputError> {
        Cohort::from_rows(self.measurements, self.index, self.relapses)
    }
}
