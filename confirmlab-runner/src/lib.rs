//! ConfirmLab Runner — batch orchestration on top of `confirmlab-core`.
//!
//! This crate provides:
//! - TOML configuration with validation and a deterministic fingerprint
//! - In-memory input contracts (measurement, index, relapse rows)
//! - Per-subject pipeline: baseline → detection → roving → classification
//! - Parallel batch runner with subject-level cancellation
//! - Result aggregation into records, diagnostics and a summary
//! - Seeded synthetic cohorts

pub mod aggregate;
pub mod config;
pub mod input;
pub mod pipeline;
pub mod runner;
pub mod synthetic;

pub use aggregate::{
    BatchOutput, BatchSummary, Diagnostic, OutputMode, ProgressionRecord, ResultAggregator,
};
pub use config::{ConfigError, DetectionConfig, TargetSection};
pub use input::{Cohort, CohortBuilder, DatedRow, InputError, MeasurementRow, SubjectRecord};
pub use pipeline::{ReportedEvent, SubjectPipeline, SubjectReport, SubjectResult};
pub use runner::{run_batch, BatchError, BatchRunner};
pub use synthetic::SyntheticCohort;
