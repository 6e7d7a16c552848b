use super::molecule::Molecule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Target-mutation reference data supplied by an external mutation-database
/// collaborator.
///
/// The schema is fixed by the external interface: a mutation identifier, the
/// wild-type site coordinates as `(x, y, z, charge)` records, and a reference
/// binding distribution (bitstring to probability) measured for the
/// unmodified target. Loading this from disk or a database is the
/// collaborator's job; this crate only consumes the parsed structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationReference {
    pub mutation_id: String,
    pub wild_type_coordinates: Vec<(f64, f64, f64, f64)>,
    pub reference_binding_distribution: BTreeMap<String, f64>,
}

impl MutationReference {
    /// The wild-type site as a molecule, for use as simulation context.
    pub fn wild_type_molecule(&self) -> Molecule {
        Molecule::from_coordinates(&self.mutation_id, &self.wild_type_coordinates)
    }

    /// Summary statistics of the reference binding distribution used by the
    /// scoring engine.
    pub fn reference_distribution(&self) -> ReferenceDistribution {
        ReferenceDistribution::from_map(&self.reference_binding_distribution)
    }
}

/// Summary of a reference binding distribution: the ground-state probability
/// mass and the spread (standard deviation of the excitation count).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceDistribution {
    ground_probability: f64,
    excitation_std: f64,
}

impl ReferenceDistribution {
    pub fn from_map(distribution: &BTreeMap<String, f64>) -> Self {
        let total: f64 = distribution.values().copied().filter(|p| *p > 0.0).sum();
        if total <= 0.0 {
            return Self {
                ground_probability: 0.0,
                excitation_std: 0.0,
            };
        }

        let mut ground = 0.0;
        let mut mean = 0.0;
        let mut second_moment = 0.0;
        for (bitstring, &weight) in distribution {
            if weight <= 0.0 {
                continue;
            }
            let p = weight / total;
            let excitations = bitstring.chars().filter(|c| *c == '1').count() as f64;
            if excitations == 0.0 {
                ground += p;
            }
            mean += p * excitations;
            second_moment += p * excitations * excitations;
        }

        let variance = (second_moment - mean * mean).max(0.0);
        Self {
            ground_probability: ground,
            excitation_std: variance.sqrt(),
        }
    }

    pub fn ground_probability(&self) -> f64 {
        self.ground_probability
    }

    pub fn excitation_std(&self) -> f64 {
        self.excitation_std
    }
}
