use super::atom::Atom;
use crate::core::scoring::bundle::ScoreBundle;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// A drug candidate: an ordered sequence of atoms tagged with the target
/// mutation it is being optimized against.
///
/// Candidates are value types. The optimizer derives new candidates from a
/// parent via [`Molecule::with_positions`] rather than mutating atoms in
/// place, and attaches the score bundle once an evaluation has completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    atoms: Vec<Atom>,
    /// Target-mutation tag this candidate is optimized against (e.g. "T790M").
    pub target: String,
    /// Scores from the most recent evaluation, if any.
    pub scores: Option<ScoreBundle>,
}

impl Molecule {
    pub fn new(target: &str, atoms: Vec<Atom>) -> Self {
        Self {
            atoms,
            target: target.to_string(),
            scores: None,
        }
    }

    /// Builds a candidate from raw `(x, y, z, charge)` records, the schema
    /// external collaborators hand over. Elements default to carbon, the
    /// dominant scaffold atom in small-molecule leads.
    pub fn from_coordinates(target: &str, coordinates: &[(f64, f64, f64, f64)]) -> Self {
        let atoms = coordinates
            .iter()
            .map(|&(x, y, z, q)| Atom::new("C", Point3::new(x, y, z), q))
            .collect();
        Self::new(target, atoms)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Derives a child candidate with the same elements, charges, and target
    /// tag but new coordinates. Scores are cleared: they belong to the parent
    /// geometry.
    ///
    /// # Panics
    ///
    /// Panics if `positions` does not match the atom count; callers produce
    /// positions from this molecule's own atoms, so a mismatch is a logic bug.
    pub fn with_positions(&self, positions: &[Point3<f64>]) -> Self {
        assert_eq!(
            positions.len(),
            self.atoms.len(),
            "position count must match atom count"
        );
        let atoms = self
            .atoms
            .iter()
            .zip(positions)
            .map(|(atom, &position)| Atom {
                element: atom.element.clone(),
                position,
                partial_charge: atom.partial_charge,
            })
            .collect();
        Self {
            atoms,
            target: self.target.clone(),
            scores: None,
        }
    }

    /// Concatenates this candidate with another molecule (e.g. the wild-type
    /// site context), preserving this molecule's target tag. Atom order is
    /// `self` first, then `other`, which keeps register indices stable for
    /// the candidate's own atoms.
    pub fn joined(&self, other: &Molecule) -> Self {
        let mut atoms = self.atoms.clone();
        atoms.extend(other.atoms.iter().cloned());
        Self {
            atoms,
            target: self.target.clone(),
            scores: None,
        }
    }
}
