//! Result aggregation — single-writer reduce of per-subject results into the
//! output record set, the diagnostics list, and a batch summary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use confirmlab_core::{Classification, DataQualityError, SubjectId};

use crate::pipeline::SubjectResult;

/// Current schema version for batch output.
pub const SCHEMA_VERSION: u32 = 1;

/// Which events per subject make it into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    FirstEvent,
    AllEvents,
}

/// One output row: a (subject, event) pair, or a subject without an event
/// when keep-all is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionRecord {
    pub subject: SubjectId,
    pub event_date: Option<NaiveDate>,
    pub baseline_value: f64,
    pub baseline_date: NaiveDate,
    pub classification: Option<Classification>,
    /// 1-based position of the event within the subject; 0 for rows without an event.
    pub event_index: u32,
    pub days_from_baseline: Option<i64>,
    /// Confirmation window held no measurements.
    pub vacuous: bool,
    pub associated_relapse: Option<NaiveDate>,
}

/// A subject excluded from normal output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub subject: SubjectId,
    pub code: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(subject: SubjectId, error: &DataQualityError) -> Self {
        Self {
            subject,
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub subjects_total: usize,
    pub subjects_with_events: usize,
    pub subjects_excluded: usize,
    pub events_total: usize,
    pub independent: usize,
    pub episode_associated: usize,
    pub unclassified: usize,
    pub rejections_total: usize,
    pub dropped_measurements: usize,
    pub config_fingerprint: String,
}

impl BatchSummary {
    pub fn valid_subjects(&self) -> usize {
        self.subjects_total - self.subjects_excluded
    }
}

/// Everything a batch produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub records: Vec<ProgressionRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: BatchSummary,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Default)]
pub struct ResultAggregator {
    mode: OutputMode,
    keep_subjects_without_event: bool,
    records: Vec<ProgressionRecord>,
    diagnostics: Vec<Diagnostic>,
    summary: BatchSummary,
}

impl ResultAggregator {
    pub fn new(mode: OutputMode, keep_subjects_without_event: bool) -> Self {
        Self {
            mode,
            keep_subjects_without_event,
            ..Self::default()
        }
    }

    pub fn push(&mut self, result: SubjectResult) {
        self.summary.subjects_total += 1;
        let report = match result.outcome {
            Ok(report) => report,
            Err(e) => {
                self.summary.subjects_excluded += 1;
                self.diagnostics.push(Diagnostic::new(result.subject, &e));
                return;
            }
        };
        self.summary.rejections_total += report.rejections;

        let take = match self.mode {
            OutputMode::FirstEvent => report.events.len().min(1),
            OutputMode::AllEvents => report.events.len(),
        };

        if take == 0 {
            if self.keep_subjects_without_event {
                self.records.push(ProgressionRecord {
                    subject: result.subject,
                    event_date: None,
                    baseline_value: report.baseline.value,
                    baseline_date: report.baseline.date,
                    classification: None,
                    event_index: 0,
                    days_from_baseline: None,
                    vacuous: false,
                    associated_relapse: None,
                });
            }
            return;
        }

        self.summary.subjects_with_events += 1;
        for (i, reported) in report.events.iter().take(take).enumerate() {
            let event = &reported.event;
            self.summary.events_total += 1;
            match event.classification {
                Classification::Independent => self.summary.independent += 1,
                Classification::EpisodeAssociated => self.summary.episode_associated += 1,
                Classification::Unclassified => self.summary.unclassified += 1,
            }
            self.records.push(ProgressionRecord {
                subject: event.subject.clone(),
                event_date: Some(event.event_date),
                baseline_value: event.baseline.value,
                baseline_date: event.baseline.date,
                classification: Some(event.classification),
                event_index: u32::try_from(i + 1).unwrap_or(u32::MAX),
                days_from_baseline: Some(event.days_from_baseline()),
                vacuous: reported.vacuous,
                associated_relapse: reported.associated_relapse,
            });
        }
    }

    /// Sort output by subject then event index and hand it over.
    pub fn finish(mut self, dropped_measurements: usize, config_fingerprint: String) -> BatchOutput {
        self.records
            .sort_by(|a, b| a.subject.cmp(&b.subject).then(a.event_index.cmp(&b.event_index)));
        self.diagnostics.sort_by(|a, b| a.subject.cmp(&b.subject));
        self.summary.dropped_measurements = dropped_measurements;
        self.summary.config_fingerprint = config_fingerprint;
        BatchOutput {
            schema_version: SCHEMA_VERSION,
            records: self.records,
            diagnostics: self.diagnostics,
            summary: self.summary,
        }
    }

    pub fn summary(&self) -> &BatchSummary {
        &self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ReportedEvent, SubjectReport};
    use confirmlab_core::{Baseline, ProgressionEvent};

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, 1, 1).unwrap() + chrono::Duration::days(n)
    }

    fn report(subject: &str, event_days: &[i64]) -> SubjectResult {
        let baseline = Baseline::new(2.0, day(0));
        let events: Vec<ReportedEvent> = event_days
            .iter()
            .map(|&d| ReportedEvent {
                event: ProgressionEvent::new(SubjectId::from(subject), day(d), baseline)
                    .classified(Classification::Independent),
                vacuous: false,
                associated_relapse: None,
            })
            .collect();
        SubjectResult {
            subject: SubjectId::from(subject),
            outcome: Ok(SubjectReport {
                baseline,
                events,
                attempts: event_days.len() + 1,
                rejections: 0,
            }),
        }
    }

    #[test]
    fn first_event_mode_keeps_one_row_per_subject() {
        let mut agg = ResultAggregator::new(OutputMode::FirstEvent, false);
        agg.push(report("A", &[100, 400]));
        let out = agg.finish(0, String::new());
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].event_index, 1);
        assert_eq!(out.records[0].event_date, Some(day(100)));
        assert_eq!(out.records[0].days_from_baseline, Some(100));
    }

    #[test]
    fn all_events_mode_numbers_events() {
        let mut agg = ResultAggregator::new(OutputMode::AllEvents, false);
        agg.push(report("A", &[100, 400, 900]));
        let out = agg.finish(0, String::new());
        let idx: Vec<u32> = out.records.iter().map(|r| r.event_index).collect();
        assert_eq!(idx, vec![1, 2, 3]);
        assert_eq!(out.summary.events_total, 3);
        assert_eq!(out.summary.independent, 3);
    }

    #[test]
    fn keep_all_retains_subjects_without_events() {
        let mut agg = ResultAggregator::new(OutputMode::FirstEvent, true);
        agg.push(report("B", &[]));
        agg.push(report("A", &[50]));
        let out = agg.finish(0, String::new());
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].subject.as_str(), "A");
        let b = &out.records[1];
        assert_eq!(b.event_date, None);
        assert_eq!(b.classification, None);
        assert_eq!(b.event_index, 0);
        assert_eq!(b.baseline_value, 2.0);
        assert_eq!(out.summary.subjects_with_events, 1);
    }

    #[test]
    fn subjects_without_events_are_dropped_by_default() {
        let mut agg = ResultAggregator::new(OutputMode::FirstEvent, false);
        agg.push(report("B", &[]));
        let out = agg.finish(0, String::new());
        assert!(out.records.is_empty());
        assert_eq!(out.summary.valid_subjects(), 1);
    }

    #[test]
    fn excluded_subjects_go_to_diagnostics() {
        let mut agg = ResultAggregator::new(OutputMode::FirstEvent, true);
        agg.push(SubjectResult {
            subject: SubjectId::from("Z"),
            outcome: Err(DataQualityError::NoMeasurements),
        });
        let out = agg.finish(2, "abc".into());
        assert!(out.records.is_empty());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].code, "NoMeasurements");
        assert_eq!(out.summary.subjects_excluded, 1);
        assert_eq!(out.summary.valid_subjects(), 0);
        assert_eq!(out.summary.dropped_measurements, 2);
        assert_eq!(out.summary.config_fingerprint, "abc");
    }

    #[test]
    fn iteration_cap_failures_go_to_diagnostics() {
        let mut agg = ResultAggregator::new(OutputMode::AllEvents, false);
        agg.push(report("A", &[100]));
        agg.push(SubjectResult {
            subject: SubjectId::from("C"),
            outcome: Err(DataQualityError::IterationCapExceeded { cap: 7 }),
        });
        let out = agg.finish(0, String::new());
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.diagnostics.len(), 1);
        let d = &out.diagnostics[0];
        assert_eq!(d.subject.as_str(), "C");
        assert_eq!(d.code, "IterationCapExceeded");
        assert_eq!(d.message, "confirmation loop exceeded its iteration cap of 7");
        assert_eq!(out.summary.subjects_excluded, 1);
        assert_eq!(out.summary.valid_subjects(), 1);
    }

    #[test]
    fn event_detail_travels_with_each_event() {
        let baseline = Baseline::new(2.0, day(0));
        let event = |d: i64, vacuous: bool, relapse: Option<NaiveDate>| ReportedEvent {
            event: ProgressionEvent::new(SubjectId::from("A"), day(d), baseline).classified(
                if relapse.is_some() {
                    Classification::EpisodeAssociated
                } else {
                    Classification::Independent
                },
            ),
            vacuous,
            associated_relapse: relapse,
        };
        let mut agg = ResultAggregator::new(OutputMode::AllEvents, false);
        agg.push(SubjectResult {
            subject: SubjectId::from("A"),
            outcome: Ok(SubjectReport {
                baseline,
                events: vec![event(100, false, Some(day(90))), event(400, true, None)],
                attempts: 3,
                rejections: 0,
            }),
        });
        let out = agg.finish(0, String::new());
        assert_eq!(out.records[0].associated_relapse, Some(day(90)));
        assert!(!out.records[0].vacuous);
        assert_eq!(out.records[1].associated_relapse, None);
        assert!(out.records[1].vacuous);
        assert_eq!(out.summary.episode_associated, 1);
    }
}
