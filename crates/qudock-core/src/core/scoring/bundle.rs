use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum WeightsError {
    #[error("scoring weights must be finite and non-negative")]
    NegativeOrNonFinite,
    #[error("scoring weights must sum to 1.0, got {0}")]
    BadSum(f64),
}

/// Weights of the clinical-potential combination. Always explicit
/// configuration, never an implicit formula: the composite score is
/// `binding * w_b + stability * w_s + resistance * w_r`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub binding: f64,
    pub stability: f64,
    pub resistance: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            binding: 0.5,
            stability: 0.3,
            resistance: 0.2,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<(), WeightsError> {
        let all = [self.binding, self.stability, self.resistance];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(WeightsError::NegativeOrNonFinite);
        }
        let sum: f64 = all.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(WeightsError::BadSum(sum));
        }
        Ok(())
    }

    /// The clinical-potential combination: pure and deterministic in the
    /// score triple.
    pub fn combine(&self, binding: f64, stability: f64, resistance: f64) -> f64 {
        binding * self.binding + stability * self.stability + resistance * self.resistance
    }
}

/// Diagnostic split of the binding distribution into its electrostatic and
/// van-der-Waals components. Not part of the clinical-potential combination.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BindingBreakdown {
    pub electrostatic: f64,
    pub van_der_waals: f64,
}

/// The four candidate metrics plus the diagnostic binding breakdown.
///
/// Invariant: `clinical_potential` always equals
/// `weights.combine(binding, stability, mutation_resistance)` for the weights
/// it was built with; recomputing from the stored triple reproduces it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBundle {
    pub binding: f64,
    pub stability: f64,
    pub mutation_resistance: f64,
    pub clinical_potential: f64,
    pub breakdown: BindingBreakdown,
}

impl ScoreBundle {
    pub fn new(
        binding: f64,
        stability: f64,
        mutation_resistance: f64,
        breakdown: BindingBreakdown,
        weights: &ScoringWeights,
    ) -> Self {
        Self {
            binding,
            stability,
            mutation_resistance,
            clinical_potential: weights.combine(binding, stability, mutation_resistance),
            breakdown,
        }
    }

    /// Recomputes the composite from the stored triple; used to check the
    /// determinism invariant.
    pub fn recompute_clinical_potential(&self, weights: &ScoringWeights) -> f64 {
        weights.combine(self.binding, self.stability, self.mutation_resistance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_are_valid() {
        ScoringWeights::default().validate().unwrap();
    }

    #[test]
    fn validation_rejects_bad_weights() {
        let negative = ScoringWeights {
            binding: -0.1,
            stability: 0.6,
            resistance: 0.5,
        };
        assert_eq!(
            negative.validate().unwrap_err(),
            WeightsError::NegativeOrNonFinite
        );

        let off_sum = ScoringWeights {
            binding: 0.5,
            stability: 0.3,
            resistance: 0.3,
        };
        assert!(matches!(
            off_sum.validate().unwrap_err(),
            WeightsError::BadSum(_)
        ));
    }

    #[test]
    fn clinical_potential_round_trips_within_tolerance() {
        let weights = ScoringWeights {
            binding: 0.4,
            stability: 0.35,
            resistance: 0.25,
        };
        let bundle = ScoreBundle::new(
            0.731,
            0.912,
            -0.184,
            BindingBreakdown::default(),
            &weights,
        );
        let recomputed = bundle.recompute_clinical_potential(&weights);
        assert!((recomputed - bundle.clinical_potential).abs() < 1e-9);
    }

    #[test]
    fn combine_is_the_weighted_sum() {
        let weights = ScoringWeights::default();
        let value = weights.combine(1.0, 1.0, 1.0);
        assert!((value - 1.0).abs() < 1e-12);
        assert_eq!(weights.combine(0.0, 0.0, 0.0), 0.0);
    }
}
