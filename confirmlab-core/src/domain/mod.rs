//! Domain types for ConfirmLab

pub mod calendar;
pub mod event;
pub mod ids;
pub mod measurement;

pub use calendar::offset_days;
pub use event::{Classification, IndexEvent, ProgressionEvent, RelapseEvent};
pub use ids::SubjectId;
pub use measurement::{Baseline, Measurement, SubjectSeries};
