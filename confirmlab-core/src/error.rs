//! Per-subject data quality failures.
//!
//! These never abort a batch: the runner records them as diagnostics and
//! excludes the subject from normal output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityError {
    #[error("subject has no measurements")]
    NoMeasurements,

    #[error("confirmation loop exceeded its iteration cap of {cap}")]
    IterationCapExceeded { cap: usize },
}

impl DataQualityError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoMeasurements => "NoMeasurements",
            Self::IterationCapExceeded { .. } => "IterationCapExceeded",
        }
    }
}
