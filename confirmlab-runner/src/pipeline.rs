//! Per-subject pipeline — wires baseline selection, the roving controller,
//! and relapse classification for one subject.
//!
//! Pure and synchronous: no I/O, no shared state, so the batch runner can
//! hand subjects to any worker thread.

use chrono::NaiveDate;
use log::{debug, warn};

use confirmlab_core::{
    Baseline, BaselineSelector, Classification, DataQualityError, ProgressionEvent,
    RelapseWindowClassifier, RovingBaselineController, RovingPolicy, SubjectId,
};

use crate::input::SubjectRecord;

/// A classified event plus the detail the output records carry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedEvent {
    pub event: ProgressionEvent,
    /// The confirmation window was empty.
    pub vacuous: bool,
    /// The relapse that made the event episode-associated.
    pub associated_relapse: Option<NaiveDate>,
}

/// What the pipeline produced for a subject that passed data quality checks.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectReport {
    pub baseline: Baseline,
    /// Ascending by event date.
    pub events: Vec<ReportedEvent>,
    pub attempts: usize,
    pub rejections: usize,
}

/// One subject's result, or the reason it was excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectResult {
    pub subject: SubjectId,
    pub outcome: Result<SubjectReport, DataQualityError>,
}

#[derive(Debug, Clone)]
pub struct SubjectPipeline {
    baseline: BaselineSelector,
    controller: RovingBaselineController,
    classifier: RelapseWindowClassifier,
}

impl SubjectPipeline {
    pub fn new(
        baseline: BaselineSelector,
        controller: RovingBaselineController,
        classifier: RelapseWindowClassifier,
    ) -> Self {
        Self {
            baseline,
            controller,
            classifier,
        }
    }

    pub fn roving_policy(&self) -> RovingPolicy {
        self.controller.policy()
    }

    /// Run baseline → detection → classification for one subject.
    ///
    /// `classify` is false when the batch has no relapse stream; events are
    /// then left `Unclassified`.
    pub fn analyze(&self, record: &SubjectRecord, classify: bool) -> SubjectResult {
        let subject = record.subject().clone();
        let outcome = self.analyze_inner(record, classify);
        match &outcome {
            Ok(report) => debug!(
                "{subject}: {} event(s), {} attempt(s), {} rejection(s)",
                report.events.len(),
                report.attempts,
                report.rejections
            ),
            Err(e) => warn!("{subject}: excluded ({e})"),
        }
        SubjectResult { subject, outcome }
    }

    fn analyze_inner(
        &self,
        record: &SubjectRecord,
        classify: bool,
    ) -> Result<SubjectReport, DataQualityError> {
        let baseline = self
            .baseline
            .select(&record.series, record.index_date, &record.relapses)?;
        let found = self.controller.run(&record.series, baseline)?;

        let events = found
            .events
            .into_iter()
            .map(|confirmed| {
                let (classification, associated_relapse) = if classify {
                    self.classifier.assess(confirmed.date, &record.relapses)
                } else {
                    (Classification::Unclassified, None)
                };
                ReportedEvent {
                    event: ProgressionEvent::new(
                        record.subject().clone(),
                        confirmed.date,
                        confirmed.baseline,
                    )
                    .classified(classification),
                    vacuous: confirmed.vacuous,
                    associated_relapse,
                }
            })
            .collect();

        Ok(SubjectReport {
            baseline,
            events,
            attempts: found.attempts,
            rejections: found.rejections,
        })
    }
}
