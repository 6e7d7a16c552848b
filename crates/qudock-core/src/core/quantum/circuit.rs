use super::encoder::{self, EncodingError};
use crate::core::models::molecule::Molecule;
use crate::core::models::register::{RegisterError, RegisterMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("circuit requires {required} qubits but the simulator capacity is {capacity}")]
pub struct CircuitSizeError {
    pub required: usize,
    pub capacity: usize,
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum CircuitBuildError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Size(#[from] CircuitSizeError),
    #[error(transparent)]
    Register(#[from] RegisterError),
}

/// A single gate in the molecular circuit. Qubit indices are little-endian
/// positions into the state vector's basis index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    X { qubit: usize },
    Ry { qubit: usize, angle: f64 },
    Rz { qubit: usize, angle: f64 },
    /// The two-qubit entangler coupling two atoms' registers.
    Cz { control: usize, target: usize },
}

impl Gate {
    pub fn is_entangling(&self) -> bool {
        matches!(self, Gate::Cz { .. })
    }

    /// The largest qubit index this gate touches.
    pub fn max_qubit(&self) -> usize {
        match *self {
            Gate::X { qubit } | Gate::Ry { qubit, .. } | Gate::Rz { qubit, .. } => qubit,
            Gate::Cz { control, target } => control.max(target),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    qubit_count: usize,
    gates: Vec<Gate>,
}

impl Circuit {
    pub fn new(qubit_count: usize) -> Self {
        Self {
            qubit_count,
            gates: Vec::new(),
        }
    }

    pub fn push(&mut self, gate: Gate) {
        self.gates.push(gate);
    }

    pub fn qubit_count(&self) -> usize {
        self.qubit_count
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn entangling_count(&self) -> usize {
        self.gates.iter().filter(|g| g.is_entangling()).count()
    }
}

/// Assembles the simulable circuit for one molecule.
///
/// Each atom's register is initialized to |1...1> and rotated by the encoder's
/// state-preparation angles; every atom pair within `interaction_cutoff`
/// Angstroms (inclusive) is then coupled by a single Cz entangler between the
/// registers' anchor qubits, emitted in ascending `(i, j)` atom-index order.
/// Atom pairs beyond the cutoff are not entangled at all; that truncation is
/// the stated approximation boundary of the model.
pub fn build_molecular_circuit(
    molecule: &Molecule,
    qubits_per_atom: usize,
    interaction_cutoff: f64,
    capacity: usize,
) -> Result<Circuit, CircuitBuildError> {
    let registers = RegisterMap::new(molecule.atom_count(), qubits_per_atom)?;
    let required = registers.total_qubits();
    if required > capacity {
        return Err(CircuitSizeError { required, capacity }.into());
    }

    let mut circuit = Circuit::new(required);

    for (atom_index, atom) in molecule.atoms().iter().enumerate() {
        let prep = encoder::encode_atom(atom, atom_index, qubits_per_atom)?;
        let register = registers.register(atom_index);
        for qubit in register.clone() {
            circuit.push(Gate::X { qubit });
        }
        for (offset, rotation) in prep.rotations.iter().enumerate() {
            let qubit = register.start + offset;
            circuit.push(Gate::Ry {
                qubit,
                angle: rotation.ry,
            });
            if rotation.rz != 0.0 {
                circuit.push(Gate::Rz {
                    qubit,
                    angle: rotation.rz,
                });
            }
        }
    }

    let atoms = molecule.atoms();
    for i in 0..atoms.len() {
        for j in (i + 1)..atoms.len() {
            if atoms[i].distance_to(&atoms[j]) <= interaction_cutoff {
                circuit.push(Gate::Cz {
                    control: registers.anchor_qubit(i),
                    target: registers.anchor_qubit(j),
                });
            }
        }
    }

    Ok(circuit)
}
