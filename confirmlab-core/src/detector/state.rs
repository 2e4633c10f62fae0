//! Confirmation state machine states and the per-attempt audit trail.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Detector lifecycle. `Confirmed` and `NoProgressionFound` are terminal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorState {
    Searching,
    /// `candidate` indexes into the working series.
    ConfirmationPending { candidate: usize },
    Rejected { candidate: usize, last_value: f64 },
    Confirmed { candidate: usize, vacuous: bool },
    NoProgressionFound,
}

impl DetectorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed { .. } | Self::NoProgressionFound)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Searching => "searching",
            Self::ConfirmationPending { .. } => "confirmation_pending",
            Self::Rejected { .. } => "rejected",
            Self::Confirmed { .. } => "confirmed",
            Self::NoProgressionFound => "no_progression_found",
        }
    }
}

/// Terminal outcome of one detection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionOutcome {
    Confirmed {
        date: NaiveDate,
        /// True when the confirmation window held no measurements.
        vacuous: bool,
    },
    NoProgressionFound,
}

impl DetectionOutcome {
    pub fn confirmed_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Confirmed { date, .. } => Some(*date),
            Self::NoProgressionFound => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

/// One rejected candidate, in the order rejections happened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub candidate: NaiveDate,
    pub min_value: f64,
    pub last_value: f64,
}

/// Outcome plus the trail of rejections that led to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub outcome: DetectionOutcome,
    pub rejections: Vec<Rejection>,
    /// Number of Searching passes.
    pub iterations: usize,
}
