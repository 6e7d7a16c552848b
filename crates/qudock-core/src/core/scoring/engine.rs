use super::bundle::{BindingBreakdown, ScoreBundle, ScoringWeights};
use crate::core::models::reference::ReferenceDistribution;
use crate::core::quantum::simulator::SimulationResult;

const AMPLITUDE_FLOOR: f64 = 1e-10;

/// Floor on the reference spread used to normalize mutation resistance, so a
/// degenerate reference distribution cannot blow the score up.
const MIN_REFERENCE_SPREAD: f64 = 0.1;

/// Raw binding observable of a measurement distribution: `-ln(p0 + eps)`
/// over the ground-state probability. Higher means stronger predicted
/// binding (more probability mass driven out of the ground state).
fn raw_binding(result: &SimulationResult) -> f64 {
    (-(result.ground_state_probability() + AMPLITUDE_FLOOR).ln()).max(0.0)
}

fn raw_binding_of_ground(ground_probability: f64) -> f64 {
    (-(ground_probability + AMPLITUDE_FLOOR).ln()).max(0.0)
}

/// Stateless mapping from simulation output to the four candidate metrics.
///
/// The scorer borrows the target's reference data and the configured weights;
/// it holds no state across calls, and scoring the same pair of results twice
/// produces identical bundles.
pub struct Scorer<'a> {
    weights: &'a ScoringWeights,
    reference: &'a ReferenceDistribution,
}

impl<'a> Scorer<'a> {
    pub fn new(weights: &'a ScoringWeights, reference: &'a ReferenceDistribution) -> Self {
        Self { weights, reference }
    }

    /// Scores one evaluation cycle.
    ///
    /// `mutant_context` is the candidate simulated against the mutated target
    /// site; `wild_type_context` is the same candidate simulated together
    /// with the wild-type site coordinates.
    ///
    /// - binding: the mutant-context raw binding scaled against the reference
    ///   distribution's own raw binding, into (0, 1).
    /// - stability: one minus the normalized excitation-count variance of the
    ///   mutant-context distribution (lower measurement variance reads as a
    ///   more stable binding mode).
    /// - mutation resistance: signed difference between mutant-context and
    ///   wild-type-context raw binding, normalized by the reference spread.
    pub fn score(
        &self,
        mutant_context: &SimulationResult,
        wild_type_context: &SimulationResult,
    ) -> ScoreBundle {
        let raw_mutant = raw_binding(mutant_context);
        let raw_wild_type = raw_binding(wild_type_context);
        let raw_reference = raw_binding_of_ground(self.reference.ground_probability());

        let denominator = raw_mutant + raw_reference;
        let binding = if denominator > 0.0 {
            raw_mutant / denominator
        } else {
            // Both distributions sit entirely in the ground state; neither
            // binds more than the other.
            0.5
        };

        let n = mutant_context.qubit_count() as f64;
        let (_, variance) = mutant_context.excitation_moments();
        let stability = if n > 0.0 {
            (1.0 - variance / (n * n / 4.0)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let spread = self.reference.excitation_std().max(MIN_REFERENCE_SPREAD);
        let mutation_resistance = (raw_mutant - raw_wild_type) / spread;

        let (electrostatic, van_der_waals) = mutant_context.parity_split();
        let breakdown = BindingBreakdown {
            electrostatic,
            van_der_waals,
        };

        ScoreBundle::new(binding, stability, mutation_resistance, breakdown, self.weights)
    }
}
