//! Batch runner — fans subjects out over a worker pool and reduces the results.
//!
//! Two entry points:
//! - `BatchRunner::run()`: plain batch run.
//! - `BatchRunner::run_with_progress()`: same, invoking a callback after every
//!   finished subject.
//!
//! Each subject is one task on a private rayon pool (not the global one). The
//! cancel flag is polled before a subject starts, never inside the
//! confirmation loop.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::info;
use rayon::prelude::*;
use thiserror::Error;

use crate::aggregate::{BatchOutput, OutputMode, ResultAggregator};
use crate::config::{ConfigError, DetectionConfig};
use crate::input::{Cohort, InputError};
use crate::pipeline::{SubjectPipeline, SubjectResult};

/// Batch-level failures.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("input error: {0}")]
    Input(#[from] InputError),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("no valid subjects in batch ({excluded} excluded of {total})")]
    NoValidSubjects { excluded: usize, total: usize },
    #[error("batch cancelled after {completed} of {total} subjects")]
    Cancelled { completed: usize, total: usize },
}

pub struct BatchRunner {
    config: DetectionConfig,
    pipeline: SubjectPipeline,
    threads: usize,
    cancel: Arc<AtomicBool>,
}

impl BatchRunner {
    /// Validates the configuration; fails before any subject is touched.
    pub fn new(config: DetectionConfig) -> Result<Self, BatchError> {
        let pipeline = config.build_pipeline()?;
        Ok(Self {
            config,
            pipeline,
            threads: 0,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Worker count; 0 (the default) sizes the pool to the available cores.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Share a cancel flag with the caller.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn run(&self, cohort: &Cohort) -> Result<BatchOutput, BatchError> {
        self.run_with_progress(cohort, |_, _| {})
    }

    pub fn run_with_progress<F>(&self, cohort: &Cohort, progress: F) -> Result<BatchOutput, BatchError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let total = cohort.len();
        let fingerprint = self.config.fingerprint();
        info!(
            "batch start: {total} subject(s), {} measurement(s), config {}",
            cohort.measurement_count(),
            &fingerprint[..12]
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("confirmlab-worker-{i}"))
            .build()?;

        let classify = cohort.has_relapse_stream();
        let done = AtomicUsize::new(0);
        let results: Vec<Option<SubjectResult>> = pool.install(|| {
            cohort
                .subjects()
                .par_iter()
                .map(|record| {
                    if self.cancel.load(Ordering::Relaxed) {
                        return None;
                    }
                    let result = self.pipeline.analyze(record, classify);
                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    progress(finished, total);
                    Some(result)
                })
                .collect()
        });

        let completed = done.load(Ordering::Relaxed);
        if self.cancel.load(Ordering::Relaxed) && completed < total {
            info!("batch cancelled after {completed}/{total} subject(s)");
            return Err(BatchError::Cancelled { completed, total });
        }

        let mode = if self.config.output.track_all_events {
            OutputMode::AllEvents
        } else {
            OutputMode::FirstEvent
        };
        let mut aggregator =
            ResultAggregator::new(mode, self.config.output.keep_subjects_without_event);
        for result in results.into_iter().flatten() {
            aggregator.push(result);
        }
        let output = aggregator.finish(cohort.dropped_measurements(), fingerprint);

        let summary = &output.summary;
        if summary.valid_subjects() == 0 {
            return Err(BatchError::NoValidSubjects {
                excluded: summary.subjects_excluded,
                total: summary.subjects_total,
            });
        }
        info!(
            "batch done: {} event(s) in {} subject(s), {} excluded",
            summary.events_total, summary.subjects_with_events, summary.subjects_excluded
        );
        Ok(output)
    }
}

/// Convenience wrapper: validate, build, and run in one call.
pub fn run_batch(config: DetectionConfig, cohort: &Cohort) -> Result<BatchOutput, BatchError> {
    BatchRunner::new(config)?.run(cohort)
}
