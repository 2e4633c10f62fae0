//! Synthetic cohorts for demos and benchmarks.
//!
//! Scores follow a bounded random walk on the half-point grid with occasional
//! transient spikes, so batches exercise confirmations, rejections and roving
//! events. Output is fully determined by the seed. These cohorts are clearly
//! fake and must never be mixed with study data.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::input::{Cohort, DatedRow, InputError, MeasurementRow};

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticCohort {
    pub subjects: usize,
    pub seed: u64,
    /// Inclusive range of visits per subject.
    pub min_visits: usize,
    pub max_visits: usize,
    /// Chance that a subject has no measurements at all.
    pub missing_rate: f64,
    /// Expected relapses per subject.
    pub relapse_rate: f64,
}

impl Default for SyntheticCohort {
    fn default() -> Self {
        Self {
            subjects: 100,
            seed: 42,
            min_visits: 4,
            max_visits: 20,
            missing_rate: 0.02,
            relapse_rate: 1.5,
        }
    }
}

impl SyntheticCohort {
    pub fn generate(&self) -> Result<Cohort, InputError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let missing_rate = probability(self.missing_rate);
        let relapse_rate = if self.relapse_rate.is_finite() {
            self.relapse_rate.max(0.0)
        } else {
            0.0
        };
        let first_index = NaiveDate::from_ymd_opt(2005, 1, 1).unwrap_or_default();

        let mut measurements = Vec::new();
        let mut index = Vec::with_capacity(self.subjects);
        let mut relapses = Vec::new();

        for n in 0..self.subjects {
            let subject = format!("SYN{:05}", n + 1);
            let index_date = first_index + Duration::days(rng.gen_range(0..3650));
            index.push(DatedRow::new(&subject, index_date));

            if rng.gen_bool(missing_rate) {
                continue;
            }

            let visits = rng.gen_range(self.min_visits..=self.max_visits.max(self.min_visits));
            let mut date = index_date + Duration::days(rng.gen_range(0..60));
            let mut level: i32 = rng.gen_range(0..8);
            for _ in 0..visits {
                level = (level + rng.gen_range(-1..=1) + i32::from(rng.gen_bool(0.15))).clamp(0, 19);
                let spike = if rng.gen_bool(0.1) { rng.gen_range(2..=4) } else { 0 };
                let score = f64::from((level + spike).min(20)) * 0.5;
                measurements.push(MeasurementRow::new(&subject, date, score));
                date += Duration::days(rng.gen_range(60..240));
            }

            let span = (date - index_date).num_days().max(1);
            let count = (relapse_rate * 2.0 * rng.gen::<f64>()).round() as usize;
            for _ in 0..count {
                relapses.push(DatedRow::new(
                    &subject,
                    index_date + Duration::days(rng.gen_range(0..span)),
                ));
            }
        }

        Cohort::from_rows(measurements, index, Some(relapses))
    }
}

/// Clamp to `[0, 1]`; NaN counts as 0.
fn probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_cohort() {
        let generator = SyntheticCohort {
            subjects: 25,
            ..SyntheticCohort::default()
        };
        assert_eq!(generator.generate().unwrap(), generator.generate().unwrap());
    }

    #[test]
    fn different_seed_different_cohort() {
        let a = SyntheticCohort {
            subjects: 25,
            seed: 1,
            ..SyntheticCohort::default()
        };
        let b = SyntheticCohort { seed: 2, ..a.clone() };
        assert_ne!(a.generate().unwrap(), b.generate().unwrap());
    }

    #[test]
    fn visit_counts_respect_bounds() {
        let generator = SyntheticCohort {
            subjects: 50,
            missing_rate: 0.0,
            min_visits: 3,
            max_visits: 6,
            ..SyntheticCohort::default()
        };
        let cohort = generator.generate().unwrap();
        assert_eq!(cohort.len(), 50);
        assert!(cohort.has_relapse_stream());
        for s in cohort.subjects() {
            assert!((3..=6).contains(&s.series.len()));
            assert!(s
                .series
                .measurements()
                .iter()
                .all(|m| (0.0..=10.0).contains(&m.value)));
        }
    }

    #[test]
    fn nan_rates_are_treated_as_zero() {
        let generator = SyntheticCohort {
            subjects: 20,
            missing_rate: f64::NAN,
            relapse_rate: f64::NAN,
            ..SyntheticCohort::default()
        };
        let cohort = generator.generate().unwrap();
        assert_eq!(cohort.len(), 20);
        for s in cohort.subjects() {
            assert!(!s.series.is_empty());
            assert!(s.relapses.is_empty());
        }
    }
}
