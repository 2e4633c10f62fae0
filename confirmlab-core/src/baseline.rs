//! Baseline selection.
//!
//! A [`BaselineSelector`] is a window rule plus an optional relapse-aware
//! refinement. The refinement only ever replaces a baseline that the window
//! rule already produced; it never invents one for an empty series.

use chrono::NaiveDate;
use log::debug;

use crate::domain::{offset_days, Baseline, SubjectSeries};
use crate::error::DataQualityError;

pub const DEFAULT_BASELINE_WINDOW_DAYS: i64 = 730;
pub const DEFAULT_RECOVERY_GAP_DAYS: i64 = 30;

/// Earliest measurement in `[index, index + window_days]`, falling back to the
/// earliest measurement overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBaseline {
    pub window_days: i64,
}

impl WindowBaseline {
    pub fn new(window_days: i64) -> Self {
        Self { window_days }
    }

    pub fn select(
        &self,
        series: &SubjectSeries,
        index_date: NaiveDate,
    ) -> Result<Baseline, DataQualityError> {
        let window_end = offset_days(index_date, self.window_days);
        series
            .first_within(index_date, window_end)
            .or_else(|| series.first())
            .map(|m| Baseline::from(*m))
            .ok_or(DataQualityError::NoMeasurements)
    }
}

impl Default for WindowBaseline {
    fn default() -> Self {
        Self::new(DEFAULT_BASELINE_WINDOW_DAYS)
    }
}

/// Moves the baseline past the latest relapse that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelapseRebaseline {
    pub recovery_gap_days: i64,
}

impl RelapseRebaseline {
    pub fn new(recovery_gap_days: i64) -> Self {
        Self { recovery_gap_days }
    }

    /// Returns the refined baseline, or `current` when no relapse follows it or
    /// no measurement exists after the recovery gap.
    pub fn refine(
        &self,
        series: &SubjectSeries,
        current: Baseline,
        relapses: &[NaiveDate],
    ) -> Baseline {
        let Some(latest) = relapses.iter().copied().filter(|r| *r > current.date).max() else {
            return current;
        };
        let earliest_allowed = offset_days(latest, self.recovery_gap_days);
        match series.first_on_or_after(earliest_allowed) {
            Some(m) => {
                debug!(
                    "{}: rebaselined after relapse {latest} ({} -> {})",
                    series.subject, current.date, m.date
                );
                Baseline::from(*m)
            }
            None => current,
        }
    }
}

impl Default for RelapseRebaseline {
    fn default() -> Self {
        Self::new(DEFAULT_RECOVERY_GAP_DAYS)
    }
}

/// Window rule composed with an optional relapse refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BaselineSelector {
    pub window: WindowBaseline,
    pub relapse_aware: Option<RelapseRebaseline>,
}

impl BaselineSelector {
    pub fn new(window: WindowBaseline) -> Self {
        Self {
            window,
            relapse_aware: None,
        }
    }

    pub fn with_relapse_rebaseline(mut self, rule: RelapseRebaseline) -> Self {
        self.relapse_aware = Some(rule);
        self
    }

    pub fn select(
        &self,
        series: &SubjectSeries,
        index_date: NaiveDate,
        relapses: &[NaiveDate],
    ) -> Result<Baseline, DataQualityError> {
        let baseline = self.window.select(series, index_date)?;
        Ok(match &self.relapse_aware {
            Some(rule) => rule.refine(series, baseline, relapses),
            None => baseline,
        })
    }
}
