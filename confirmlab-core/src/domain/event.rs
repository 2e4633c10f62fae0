//! Event types: index dates, relapses, and confirmed progression events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::SubjectId;
use super::measurement::Baseline;

/// Anchor date for a subject's baseline window (e.g. diagnosis date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEvent {
    pub subject: SubjectId,
    pub date: NaiveDate,
}

/// One acute episode in the second event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelapseEvent {
    pub subject: SubjectId,
    pub date: NaiveDate,
}

/// Whether a confirmed event is temporally linked to a relapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// No relapse within the classification window.
    Independent,
    /// At least one relapse within the classification window.
    EpisodeAssociated,
    /// No relapse stream was supplied for the batch.
    Unclassified,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Independent => "independent",
            Self::EpisodeAssociated => "episode_associated",
            Self::Unclassified => "unclassified",
        }
    }
}

/// A confirmed progression event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionEvent {
    pub subject: SubjectId,
    pub event_date: NaiveDate,
    pub baseline: Baseline,
    pub classification: Classification,
}

impl ProgressionEvent {
    pub fn new(subject: SubjectId, event_date: NaiveDate, baseline: Baseline) -> Self {
        Self {
            subject,
            event_date,
            baseline,
            classification: Classification::Unclassified,
        }
    }

    /// Return a copy carrying the given classification.
    pub fn classified(self, classification: Classification) -> Self {
        Self {
            classification,
            ..self
        }
    }

    /// Days between the baseline measurement and the event.
    pub fn days_from_baseline(&self) -> i64 {
        (self.event_date - self.baseline.date).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_serializes_snake_case() {
        let json = serde_json::to_string(&Classification::EpisodeAssociated).unwrap();
        assert_eq!(json, "\"episode_associated\"");
    }

    #[test]
    fn days_from_baseline() {
        let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let event = ProgressionEvent::new(
            SubjectId::from("S1"),
            base + chrono::Duration::days(300),
            Baseline::new(3.0, base),
        );
        assert_eq!(event.days_from_baseline(), 300);
        assert_eq!(event.classification, Classification::Unclassified);
    }
}
