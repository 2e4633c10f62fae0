//! Progression detector — the confirm-or-reject fixpoint for one subject.
//!
//! Each Searching pass picks the earliest point at or above the required level.
//! Its confirmation window `(candidate, candidate + C]` decides the fate:
//!
//! - empty window: confirmed (nothing can disprove it)
//! - window minimum below the rejection threshold *and* last window value below
//!   the required level: rejected, the candidate is lowered to that last value
//!   and the search restarts
//! - otherwise: confirmed
//!
//! A rejected candidate ends below the required level, so it can never be picked
//! again. The loop is still capped at `N + 1` passes (`N` = points after the
//! baseline).

pub mod state;
pub mod working_series;

use log::trace;

use crate::domain::{offset_days, Baseline};
use crate::error::DataQualityError;
use crate::threshold::ProgressionTarget;

pub use state::{Detection, DetectionOutcome, DetectorState, Rejection};
pub use working_series::WorkingSeries;

pub const DEFAULT_CONFIRM_WINDOW_DAYS: i64 = 182;
pub const DEFAULT_BASELINE_THRESHOLD: f64 = 4.0;

/// Parameters of the confirmation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfirmationRule {
    pub window_days: i64,
    /// Absolute level the window minimum must stay at or above; distinct from the
    /// progression delta.
    pub baseline_threshold: f64,
}

impl Default for ConfirmationRule {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_CONFIRM_WINDOW_DAYS,
            baseline_threshold: DEFAULT_BASELINE_THRESHOLD,
        }
    }
}

/// Summary of the values inside one confirmation window.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WindowStats {
    min_value: f64,
    last_value: f64,
}

#[derive(Debug, Clone)]
pub struct ProgressionDetector {
    target: ProgressionTarget,
    rule: ConfirmationRule,
}

impl ProgressionDetector {
    pub fn new(target: ProgressionTarget, rule: ConfirmationRule) -> Self {
        Self { target, rule }
    }

    pub fn target(&self) -> &ProgressionTarget {
        &self.target
    }

    pub fn rule(&self) -> &ConfirmationRule {
        &self.rule
    }

    /// Run the state machine to a terminal state, mutating `series` in place.
    pub fn detect(
        &self,
        series: &mut WorkingSeries,
        baseline: Baseline,
    ) -> Result<Detection, DataQualityError> {
        let required = self.target.required_level(baseline.value);
        let start = series.first_index_after(baseline.date);
        let cap = series.len() - start + 1;

        let mut state = DetectorState::Searching;
        let mut rejections = Vec::new();
        let mut iterations = 0usize;

        while !state.is_terminal() {
            let next = match state {
                DetectorState::Searching => {
                    iterations += 1;
                    if iterations > cap {
                        return Err(DataQualityError::IterationCapExceeded { cap });
                    }
                    match (start..series.len()).find(|&i| series.effective(i) >= required) {
                        Some(candidate) => DetectorState::ConfirmationPending { candidate },
                        None => DetectorState::NoProgressionFound,
                    }
                }
                DetectorState::ConfirmationPending { candidate } => {
                    match self.window_stats(series, candidate) {
                        None => DetectorState::Confirmed {
                            candidate,
                            vacuous: true,
                        },
                        Some(w)
                            if w.min_value < self.rule.baseline_threshold
                                && w.last_value < required =>
                        {
                            rejections.push(Rejection {
                                candidate: series.date(candidate),
                                min_value: w.min_value,
                                last_value: w.last_value,
                            });
                            DetectorState::Rejected {
                                candidate,
                                last_value: w.last_value,
                            }
                        }
                        Some(_) => DetectorState::Confirmed {
                            candidate,
                            vacuous: false,
                        },
                    }
                }
                DetectorState::Rejected {
                    candidate,
                    last_value,
                } => {
                    series.lower_to(candidate, last_value);
                    DetectorState::Searching
                }
                DetectorState::Confirmed { .. } | DetectorState::NoProgressionFound => state,
            };
            trace!("detector: {} -> {}", state.name(), next.name());
            state = next;
        }

        let outcome = match state {
            DetectorState::Confirmed { candidate, vacuous } => DetectionOutcome::Confirmed {
                date: series.date(candidate),
                vacuous,
            },
            _ => DetectionOutcome::NoProgressionFound,
        };

        Ok(Detection {
            outcome,
            rejections,
            iterations,
        })
    }

    /// Min and last effective value over `(candidate, candidate + C]`, or `None`
    /// when the window is empty. Several points on the last date resolve to the
    /// lowest of them.
    fn window_stats(&self, series: &WorkingSeries, candidate: usize) -> Option<WindowStats> {
        let anchor = series.date(candidate);
        let window_end = offset_days(anchor, self.rule.window_days);
        let from = series.first_index_after(anchor);

        let mut stats: Option<(WindowStats, chrono::NaiveDate)> = None;
        for i in from..series.len() {
            let date = series.date(i);
            if date > window_end {
                break;
            }
            let value = series.effective(i);
            stats = Some(match stats {
                None => (
                    WindowStats {
                        min_value: value,
                        last_value: value,
                    },
                    date,
                ),
                Some((w, last_date)) => {
                    let last_value = if date > last_date {
                        value
                    } else {
                        w.last_value.min(value)
                    };
                    (
                        WindowStats {
                            min_value: w.min_value.min(value),
                            last_value,
                        },
                        date,
                    )
                }
            });
        }
        stats.map(|(w, _)| w)
    }
}

impl Default for ProgressionDetector {
    fn default() -> Self {
        Self::new(ProgressionTarget::default(), ConfirmationRule::default())
    }
}
