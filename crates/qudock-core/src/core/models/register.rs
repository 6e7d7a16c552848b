use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RegisterError {
    #[error("qubits_per_atom must be at least 1")]
    ZeroQubitsPerAtom,
    #[error("cannot build a qubit register for an empty molecule")]
    EmptyMolecule,
}

/// Deterministic mapping from atom index to the contiguous block of qubit
/// indices encoding that atom.
///
/// The register width is always `atom_count * qubits_per_atom`; violating
/// that is a construction error, never a tolerated runtime state. The map is
/// recomputed whenever a molecule's atom count changes, so it carries no
/// reference to the molecule itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    atom_count: usize,
    qubits_per_atom: usize,
}

impl RegisterMap {
    pub fn new(atom_count: usize, qubits_per_atom: usize) -> Result<Self, RegisterError> {
        if qubits_per_atom == 0 {
            return Err(RegisterError::ZeroQubitsPerAtom);
        }
        if atom_count == 0 {
            return Err(RegisterError::EmptyMolecule);
        }
        Ok(Self {
            atom_count,
            qubits_per_atom,
        })
    }

    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    pub fn qubits_per_atom(&self) -> usize {
        self.qubits_per_atom
    }

    /// Total width of the register in qubits.
    pub fn total_qubits(&self) -> usize {
        self.atom_count * self.qubits_per_atom
    }

    /// The qubit indices encoding atom `atom_index`.
    ///
    /// # Panics
    ///
    /// Panics if `atom_index` is out of range; register maps are derived from
    /// the molecule they describe, so an out-of-range index is a logic bug.
    pub fn register(&self, atom_index: usize) -> Range<usize> {
        assert!(atom_index < self.atom_count, "atom index out of range");
        let start = atom_index * self.qubits_per_atom;
        start..start + self.qubits_per_atom
    }

    /// The first qubit of an atom's register, used as the anchor for
    /// entangling operations.
    pub fn anchor_qubit(&self, atom_index: usize) -> usize {
        self.register(atom_index).start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_is_atom_count_times_qubits_per_atom() {
        for atoms in 1..=5 {
            for qpa in 1..=4 {
                let map = RegisterMap::new(atoms, qpa).unwrap();
                assert_eq!(map.total_qubits(), atoms * qpa);
            }
        }
    }

    #[test]
    fn registers_are_contiguous_and_disjoint() {
        let map = RegisterMap::new(3, 3).unwrap();
        assert_eq!(map.register(0), 0..3);
        assert_eq!(map.register(1), 3..6);
        assert_eq!(map.register(2), 6..9);
        assert_eq!(map.anchor_qubit(2), 6);
    }

    #[test]
    fn construction_errors_on_degenerate_shapes() {
        assert_eq!(
            RegisterMap::new(2, 0).unwrap_err(),
            RegisterError::ZeroQubitsPerAtom
        );
        assert_eq!(
            RegisterMap::new(0, 3).unwrap_err(),
            RegisterError::EmptyMolecule
        );
    }

    #[test]
    #[should_panic(expected = "atom index out of range")]
    fn register_panics_past_the_last_atom() {
        let map = RegisterMap::new(2, 2).unwrap();
        map.register(2);
    }
}
