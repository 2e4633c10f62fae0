//! ConfirmLab Core — confirmed progression detection for longitudinal scores.
//!
//! This crate contains the per-subject algorithm:
//! - Domain types (measurements, series, index/relapse/progression events)
//! - Baseline selection with optional relapse-aware rebaselining
//! - Threshold policy as a configurable step function, plus sustained-level targets
//! - Confirmation state machine with reject-and-retry over a lowering-only overlay
//! - Roving baseline controller for subsequent events
//! - Relapse window classification

pub mod baseline;
pub mod classify;
pub mod detector;
pub mod domain;
pub mod error;
pub mod roving;
pub mod threshold;

pub use baseline::{BaselineSelector, RelapseRebaseline, WindowBaseline};
pub use classify::RelapseWindowClassifier;
pub use detector::{
    ConfirmationRule, Detection, DetectionOutcome, DetectorState, ProgressionDetector, Rejection,
    WorkingSeries,
};
pub use domain::{
    Baseline, Classification, IndexEvent, Measurement, ProgressionEvent, RelapseEvent,
    SubjectId, SubjectSeries,
};
pub use error::DataQualityError;
pub use roving::{ConfirmedEvent, RovingBaselineController, RovingPolicy, SubjectDetection};
pub use threshold::{ProgressionTarget, StepThreshold, ThresholdError, ThresholdPolicy, Tier};
