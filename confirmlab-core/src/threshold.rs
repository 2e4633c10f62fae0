//! Threshold policy: how large an increase over baseline counts as progression.
//!
//! The detector never sees the policy directly. It asks a [`ProgressionTarget`]
//! for the level a measurement must reach, so step-function increases and
//! fixed sustained levels plug into the same confirmation loop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid threshold parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("threshold policy needs at least one tier")]
    NoTiers,
    #[error("breakpoint {0} is not finite")]
    NonFiniteBreakpoint(f64),
    #[error("breakpoints must be strictly increasing ({previous} then {next})")]
    BreakpointOrder { previous: f64, next: f64 },
    #[error("delta {0} must be finite and > 0")]
    InvalidDelta(f64),
    #[error("sustained level {0} must be finite")]
    InvalidLevel(f64),
}

/// Maps a baseline value to the minimum increase that qualifies as progression.
pub trait ThresholdPolicy: Send + Sync {
    fn delta(&self, baseline_value: f64) -> f64;
}

/// One tier of a step function: baselines `<= up_to` require `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub up_to: f64,
    pub delta: f64,
}

/// Monotonic step function over the baseline value.
///
/// Tiers are checked in ascending breakpoint order; a baseline above every
/// breakpoint falls through to `above`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepThreshold {
    tiers: Vec<Tier>,
    above: f64,
}

impl StepThreshold {
    pub const DEFAULT_BREAKPOINT: f64 = 5.5;
    pub const DEFAULT_DELTA_LOW: f64 = 1.0;
    pub const DEFAULT_DELTA_HIGH: f64 = 0.5;

    pub fn new(tiers: Vec<Tier>, above: f64) -> Result<Self, ThresholdError> {
        if tiers.is_empty() {
            return Err(ThresholdError::NoTiers);
        }
        let mut previous: Option<f64> = None;
        for tier in &tiers {
            if !tier.up_to.is_finite() {
                return Err(ThresholdError::NonFiniteBreakpoint(tier.up_to));
            }
            check_delta(tier.delta)?;
            if let Some(prev) = previous {
                if tier.up_to <= prev {
                    return Err(ThresholdError::BreakpointOrder {
                        previous: prev,
                        next: tier.up_to,
                    });
                }
            }
            previous = Some(tier.up_to);
        }
        check_delta(above)?;
        Ok(Self { tiers, above })
    }

    /// Single breakpoint: `delta_low` at or below it, `delta_high` above it.
    pub fn two_tier(breakpoint: f64, delta_low: f64, delta_high: f64) -> Result<Self, ThresholdError> {
        Self::new(
            vec![Tier {
                up_to: breakpoint,
                delta: delta_low,
            }],
            delta_high,
        )
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }
}

impl Default for StepThreshold {
    fn default() -> Self {
        Self {
            tiers: vec![Tier {
                up_to: Self::DEFAULT_BREAKPOINT,
                delta: Self::DEFAULT_DELTA_LOW,
            }],
            above: Self::DEFAULT_DELTA_HIGH,
        }
    }
}

impl ThresholdPolicy for StepThreshold {
    fn delta(&self, baseline_value: f64) -> f64 {
        self.tiers
            .iter()
            .find(|t| baseline_value <= t.up_to)
            .map(|t| t.delta)
            .unwrap_or(self.above)
    }
}

fn check_delta(delta: f64) -> Result<(), ThresholdError> {
    if delta.is_finite() && delta > 0.0 {
        Ok(())
    } else {
        Err(ThresholdError::InvalidDelta(delta))
    }
}

/// What a measurement has to reach to become a progression candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressionTarget {
    /// `baseline + policy.delta(baseline)`.
    Increase(StepThreshold),
    /// A fixed score, independent of the baseline.
    SustainedLevel { level: f64 },
}

impl ProgressionTarget {
    pub fn sustained_level(level: f64) -> Result<Self, ThresholdError> {
        if !level.is_finite() {
            return Err(ThresholdError::InvalidLevel(level));
        }
        Ok(Self::SustainedLevel { level })
    }

    pub fn required_level(&self, baseline_value: f64) -> f64 {
        match self {
            Self::Increase(policy) => baseline_value + policy.delta(baseline_value),
            Self::SustainedLevel { level } => *level,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Increase(_) => "increase",
            Self::SustainedLevel { .. } => "sustained_level",
        }
    }
}

impl Default for ProgressionTarget {
    fn default() -> Self {
        Self::Increase(StepThreshold::default())
    }
}
