//! Serializable batch configuration.
//!
//! Every field has a clinical default, so an empty TOML file is a valid
//! configuration. `validate()` runs before any subject is processed; a
//! failure there fails the whole batch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use confirmlab_core::baseline::{DEFAULT_BASELINE_WINDOW_DAYS, DEFAULT_RECOVERY_GAP_DAYS};
use confirmlab_core::classify::{DEFAULT_WINDOW_AFTER_DAYS, DEFAULT_WINDOW_BEFORE_DAYS};
use confirmlab_core::detector::{DEFAULT_BASELINE_THRESHOLD, DEFAULT_CONFIRM_WINDOW_DAYS};
use confirmlab_core::{
    BaselineSelector, ConfirmationRule, ProgressionDetector, ProgressionTarget,
    RelapseRebaseline, RelapseWindowClassifier, RovingBaselineController, RovingPolicy,
    StepThreshold, ThresholdError, WindowBaseline,
};

use crate::pipeline::SubjectPipeline;

/// Upper bound for every configured day count (100 years).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Configuration problems. Always fatal for the batch.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} must be > 0 days (got {value})")]
    NonPositiveWindow { field: &'static str, value: i64 },

    #[error("{field} must be >= 0 days (got {value})")]
    NegativeWindow { field: &'static str, value: i64 },

    #[error("{field} must be at most {max} days (got {value})")]
    WindowTooLong {
        field: &'static str,
        value: i64,
        max: i64,
    },

    #[error("{field} must be finite (got {value})")]
    NonFinite { field: &'static str, value: f64 },

    #[error("threshold policy: {0}")]
    Threshold(#[from] ThresholdError),

    #[error("output.track_all_events requires roving.enabled")]
    AllEventsWithoutRoving,
}

/// Step-function threshold parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdSection {
    pub breakpoint: f64,
    pub delta_low: f64,
    pub delta_high: f64,
}

impl Default for ThresholdSection {
    fn default() -> Self {
        Self {
            breakpoint: StepThreshold::DEFAULT_BREAKPOINT,
            delta_low: StepThreshold::DEFAULT_DELTA_LOW,
            delta_high: StepThreshold::DEFAULT_DELTA_HIGH,
        }
    }
}

/// What a measurement must reach to become a candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetSection {
    /// Baseline plus the threshold-policy delta.
    #[default]
    Increase,
    /// Fixed score, e.g. sustained reaching of 4.0 or 6.0.
    SustainedLevel { level: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BaselineSection {
    pub window_days: i64,
}

impl Default for BaselineSection {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_BASELINE_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfirmationSection {
    pub window_days: i64,
    pub baseline_threshold: f64,
}

impl Default for ConfirmationSection {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_CONFIRM_WINDOW_DAYS,
            baseline_threshold: DEFAULT_BASELINE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RovingSection {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelapseSection {
    /// Move the baseline past the latest relapse that follows it.
    pub aware: bool,
    pub recovery_gap_days: i64,
    pub window_before_days: i64,
    pub window_after_days: i64,
}

impl Default for RelapseSection {
    fn default() -> Self {
        Self {
            aware: false,
            recovery_gap_days: DEFAULT_RECOVERY_GAP_DAYS,
            window_before_days: DEFAULT_WINDOW_BEFORE_DAYS,
            window_after_days: DEFAULT_WINDOW_AFTER_DAYS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSection {
    pub track_all_events: bool,
    pub keep_subjects_without_event: bool,
}

/// Full configuration for one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    pub threshold: ThresholdSection,
    pub target: TargetSection,
    pub baseline: BaselineSection,
    pub confirmation: ConfirmationSection,
    pub roving: RovingSection,
    pub relapse: RelapseSection,
    pub output: OutputSection,
}

impl DetectionConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("baseline.window_days", self.baseline.window_days)?;
        positive("confirmation.window_days", self.confirmation.window_days)?;
        non_negative("relapse.recovery_gap_days", self.relapse.recovery_gap_days)?;
        non_negative("relapse.window_before_days", self.relapse.window_before_days)?;
        non_negative("relapse.window_after_days", self.relapse.window_after_days)?;
        finite(
            "confirmation.baseline_threshold",
            self.confirmation.baseline_threshold,
        )?;
        self.progression_target()?;
        if self.output.track_all_events && !self.roving.enabled {
            return Err(ConfigError::AllEventsWithoutRoving);
        }
        Ok(())
    }

    pub fn step_threshold(&self) -> Result<StepThreshold, ConfigError> {
        Ok(StepThreshold::two_tier(
            self.threshold.breakpoint,
            self.threshold.delta_low,
            self.threshold.delta_high,
        )?)
    }

    pub fn progression_target(&self) -> Result<ProgressionTarget, ConfigError> {
        match self.target {
            TargetSection::Increase => Ok(ProgressionTarget::Increase(self.step_threshold()?)),
            TargetSection::SustainedLevel { level } => {
                Ok(ProgressionTarget::sustained_level(level)?)
            }
        }
    }

    pub fn roving_policy(&self) -> RovingPolicy {
        if self.roving.enabled {
            RovingPolicy::Roving {
                track_all: self.output.track_all_events,
            }
        } else {
            RovingPolicy::FirstEventOnly
        }
    }

    /// Validate and assemble the per-subject pipeline.
    pub fn build_pipeline(&self) -> Result<SubjectPipeline, ConfigError> {
        self.validate()?;

        let mut baseline = BaselineSelector::new(WindowBaseline::new(self.baseline.window_days));
        if self.relapse.aware {
            baseline = baseline
                .with_relapse_rebaseline(RelapseRebaseline::new(self.relapse.recovery_gap_days));
        }

        let detector = ProgressionDetector::new(
            self.progression_target()?,
            ConfirmationRule {
                window_days: self.confirmation.window_days,
                baseline_threshold: self.confirmation.baseline_threshold,
            },
        );

        Ok(SubjectPipeline::new(
            baseline,
            RovingBaselineController::new(detector, self.roving_policy()),
            RelapseWindowClassifier::new(
                self.relapse.window_before_days,
                self.relapse.window_after_days,
            ),
        ))
    }

    /// Deterministic BLAKE3 fingerprint of the configuration.
    ///
    /// Two batches with identical configs share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("DetectionConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

fn positive(field: &'static str, value: i64) -> Result<(), ConfigError> {
    if value <= 0 {
        return Err(ConfigError::NonPositiveWindow { field, value });
    }
    bounded(field, value)
}

fn non_negative(field: &'static str, value: i64) -> Result<(), ConfigError> {
    if value < 0 {
        return Err(ConfigError::NegativeWindow { field, value });
    }
    bounded(field, value)
}

fn bounded(field: &'static str, value: i64) -> Result<(), ConfigError> {
    if value > MAX_WINDOW_DAYS {
        return Err(ConfigError::WindowTooLong {
            field,
            value,
            max: MAX_WINDOW_DAYS,
        });
    }
    Ok(())
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_gives_clinical_defaults() {
        let config = DetectionConfig::from_toml_str("").unwrap();
        assert_eq!(config, DetectionConfig::default());
        assert_eq!(config.threshold.breakpoint, 5.5);
        assert_eq!(config.baseline.window_days, 730);
        assert_eq!(config.confirmation.window_days, 182);
        assert_eq!(config.confirmation.baseline_threshold, 4.0);
        assert_eq!(config.relapse.recovery_gap_days, 30);
        assert_eq!(config.relapse.window_before_days, 90);
        assert_eq!(config.relapse.window_after_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = DetectionConfig::from_toml_str(
            r#"
[confirmation]
window_days = 84

[roving]
enabled = true

[output]
track_all_events = true
"#,
        )
        .unwrap();
        assert_eq!(config.confirmation.window_days, 84);
        assert_eq!(config.confirmation.baseline_threshold, 4.0);
        assert_eq!(
            config.roving_policy(),
            RovingPolicy::Roving { track_all: true }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sustained_level_target_parses() {
        let config = DetectionConfig::from_toml_str(
            r#"
[target]
kind = "sustained_level"
level = 6.0
"#,
        )
        .unwrap();
        assert_eq!(config.target, TargetSection::SustainedLevel { level: 6.0 });
        assert_eq!(config.progression_target().unwrap().required_level(2.0), 6.0);
    }

    #[test]
    fn non_positive_windows_are_rejected() {
        let mut config = DetectionConfig::default();
        config.confirmation.window_days = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveWindow {
                field: "confirmation.window_days",
                ..
            })
        ));

        let mut config = DetectionConfig::default();
        config.baseline.window_days = -5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveWindow { .. })
        ));

        let mut config = DetectionConfig::default();
        config.relapse.window_before_days = -1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeWindow { .. })
        ));
    }

    #[test]
    fn oversized_windows_are_rejected() {
        let fields: [(&str, fn(&mut DetectionConfig)); 5] = [
            ("baseline.window_days", |c| c.baseline.window_days = 1_000_000_000),
            ("confirmation.window_days", |c| c.confirmation.window_days = 1_000_000_000),
            ("relapse.recovery_gap_days", |c| c.relapse.recovery_gap_days = 1_000_000_000),
            ("relapse.window_before_days", |c| c.relapse.window_before_days = 1_000_000_000),
            ("relapse.window_after_days", |c| c.relapse.window_after_days = 1_000_000_000),
        ];
        for (name, set) in fields {
            let mut config = DetectionConfig::default();
            set(&mut config);
            match config.validate() {
                Err(ConfigError::WindowTooLong { field, max, .. }) => {
                    assert_eq!(field, name);
                    assert_eq!(max, MAX_WINDOW_DAYS);
                }
                other => panic!("{name}: expected WindowTooLong, got {other:?}"),
            }
            assert!(config.build_pipeline().is_err());
        }

        let mut config = DetectionConfig::default();
        config.confirmation.window_days = MAX_WINDOW_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let mut config = DetectionConfig::default();
        config.threshold.delta_high = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Threshold(_))));

        let mut config = DetectionConfig::default();
        config.confirmation.baseline_threshold = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::NonFinite { .. })));
    }

    #[test]
    fn all_events_requires_roving() {
        let mut config = DetectionConfig::default();
        config.output.track_all_events = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AllEventsWithoutRoving)
        ));
        assert!(config.build_pipeline().is_err());
    }

    #[test]
    fn unknown_target_kind_fails_to_parse() {
        let err = DetectionConfig::from_toml_str("[target]\nkind = \"decrease\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn fingerprint_is_deterministic_and_sensitive() {
        let a = DetectionConfig::default();
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.confirmation.window_days = 84;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[relapse]\naware = true\nrecovery_gap_days = 60").unwrap();
        let config = DetectionConfig::from_file(file.path()).unwrap();
        assert!(config.relapse.aware);
        assert_eq!(config.relapse.recovery_gap_days, 60);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = DetectionConfig::from_file(Path::new("/nonexistent/confirmlab.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
