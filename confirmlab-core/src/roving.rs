//! Roving baseline — re-anchor after each confirmed event and search again.
//!
//! Every attempt gets a fresh [`WorkingSeries`] seeded from the raw values, so
//! lowering done by one attempt never leaks into the next.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::detector::{ProgressionDetector, Rejection, WorkingSeries};
use crate::domain::{Baseline, SubjectSeries};
use crate::error::DataQualityError;

/// How many confirmed events one subject may yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RovingPolicy {
    /// Single attempt from the selected baseline.
    #[default]
    FirstEventOnly,
    /// Re-anchor on the successor of each confirmed event.
    Roving { track_all: bool },
}

impl RovingPolicy {
    /// `None` means unbounded.
    pub fn max_events(&self) -> Option<usize> {
        match self {
            Self::FirstEventOnly | Self::Roving { track_all: false } => Some(1),
            Self::Roving { track_all: true } => None,
        }
    }

    pub fn is_roving(&self) -> bool {
        matches!(self, Self::Roving { .. })
    }
}

/// A confirmed event before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedEvent {
    pub date: NaiveDate,
    pub baseline: Baseline,
    pub vacuous: bool,
    /// Rejections made by the attempt that confirmed this event.
    pub rejections: Vec<Rejection>,
}

/// Everything the controller found for one subject.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubjectDetection {
    /// Ascending by date.
    pub events: Vec<ConfirmedEvent>,
    pub attempts: usize,
    pub rejections: usize,
}

#[derive(Debug, Clone)]
pub struct RovingBaselineController {
    detector: ProgressionDetector,
    policy: RovingPolicy,
}

impl RovingBaselineController {
    pub fn new(detector: ProgressionDetector, policy: RovingPolicy) -> Self {
        Self { detector, policy }
    }

    pub fn policy(&self) -> RovingPolicy {
        self.policy
    }

    pub fn detector(&self) -> &ProgressionDetector {
        &self.detector
    }

    pub fn run(
        &self,
        series: &SubjectSeries,
        initial: Baseline,
    ) -> Result<SubjectDetection, DataQualityError> {
        let mut found = SubjectDetection::default();
        let mut baseline = initial;
        let mut scope = series.measurements();

        loop {
            let mut working = WorkingSeries::from_measurements(scope);
            let detection = self.detector.detect(&mut working, baseline)?;
            found.attempts += 1;
            found.rejections += detection.rejections.len();

            let Some(date) = detection.outcome.confirmed_date() else {
                break;
            };
            debug!(
                "{}: confirmed at {date} from baseline {} on {} after {} rejection(s)",
                series.subject,
                baseline.value,
                baseline.date,
                detection.rejections.len()
            );
            found.events.push(ConfirmedEvent {
                date,
                baseline,
                vacuous: matches!(
                    detection.outcome,
                    crate::detector::DetectionOutcome::Confirmed { vacuous: true, .. }
                ),
                rejections: detection.rejections,
            });

            if self
                .policy
                .max_events()
                .is_some_and(|max| found.events.len() >= max)
            {
                break;
            }
            let Some(next) = series.first_after(date) else {
                break;
            };
            baseline = Baseline::from(*next);
            scope = series.after(date);
        }

        Ok(found)
    }
}
