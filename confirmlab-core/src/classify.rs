//! Relapse window classification of confirmed events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{offset_days, Classification};

pub const DEFAULT_WINDOW_BEFORE_DAYS: i64 = 90;
pub const DEFAULT_WINDOW_AFTER_DAYS: i64 = 30;

/// An event is episode-associated when some relapse falls in
/// `[event - before, event + after]` (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelapseWindowClassifier {
    pub window_before_days: i64,
    pub window_after_days: i64,
}

impl RelapseWindowClassifier {
    pub fn new(window_before_days: i64, window_after_days: i64) -> Self {
        Self {
            window_before_days,
            window_after_days,
        }
    }

    pub fn window(&self, event_date: NaiveDate) -> (NaiveDate, NaiveDate) {
        (
            offset_days(event_date, self.window_before_days.saturating_neg()),
            offset_days(event_date, self.window_after_days),
        )
    }

    /// The relapse closest to `event_date` inside the window, earlier date first on ties.
    pub fn associated_relapse(
        &self,
        event_date: NaiveDate,
        relapses: &[NaiveDate],
    ) -> Option<NaiveDate> {
        let (from, to) = self.window(event_date);
        relapses
            .iter()
            .copied()
            .filter(|r| *r >= from && *r <= to)
            .min_by_key(|r| ((*r - event_date).num_days().abs(), *r))
    }

    /// Classification together with the relapse that decided it.
    pub fn assess(
        &self,
        event_date: NaiveDate,
        relapses: &[NaiveDate],
    ) -> (Classification, Option<NaiveDate>) {
        match self.associated_relapse(event_date, relapses) {
            Some(relapse) => (Classification::EpisodeAssociated, Some(relapse)),
            None => (Classification::Independent, None),
        }
    }

    pub fn classify(&self, event_date: NaiveDate, relapses: &[NaiveDate]) -> Classification {
        self.assess(event_date, relapses).0
    }
}

impl Default for RelapseWindowClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_BEFORE_DAYS, DEFAULT_WINDOW_AFTER_DAYS)
    }
}
