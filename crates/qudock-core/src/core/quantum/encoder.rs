use crate::core::models::atom::Atom;
use crate::core::models::element;
use std::f64::consts::{FRAC_PI_2, PI};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum EncodingError {
    #[error("atom {index} has a non-finite coordinate or charge")]
    NonFiniteInput { index: usize },
    #[error("atom {index} has unknown element symbol '{symbol}'")]
    UnknownElement { index: usize, symbol: String },
}

/// Rotation angles preparing one qubit of an atom's register.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QubitRotation {
    pub ry: f64,
    pub rz: f64,
}

/// Normalized state-preparation spec for one atom: one rotation pair per
/// qubit in the atom's register.
#[derive(Debug, Clone, PartialEq)]
pub struct StatePrep {
    pub rotations: Vec<QubitRotation>,
}

/// Encodes an atom's spatial and electronic state into rotation angles for a
/// register of `qubits_per_atom` qubits.
///
/// The encoding is a pure, deterministic function of the atom: coordinates
/// are normalized by their Euclidean norm and mapped to Ry angles of
/// `pi/2 * component`, cycling x, y, z across the register; the partial
/// charge contributes an Rz phase of `pi * charge / (electronegativity * N)`
/// on every qubit, so more electronegative elements damp the charge phase.
/// A zero-length coordinate vector encodes to zero Ry angles.
///
/// `atom_index` is only used for error reporting.
pub fn encode_atom(
    atom: &Atom,
    atom_index: usize,
    qubits_per_atom: usize,
) -> Result<StatePrep, EncodingError> {
    if !atom.is_finite() {
        return Err(EncodingError::NonFiniteInput { index: atom_index });
    }
    let info = element::lookup(&atom.element).ok_or_else(|| EncodingError::UnknownElement {
        index: atom_index,
        symbol: atom.element.clone(),
    })?;

    let norm = atom.position.coords.norm();
    let normalized = if norm > 0.0 {
        atom.position.coords / norm
    } else {
        atom.position.coords
    };

    let rz = PI * atom.partial_charge / (info.electronegativity * qubits_per_atom as f64);
    let rotations = (0..qubits_per_atom)
        .map(|k| QubitRotation {
            ry: FRAC_PI_2 * normalized[k % 3],
            rz,
        })
        .collect();

    Ok(StatePrep { rotations })
}
