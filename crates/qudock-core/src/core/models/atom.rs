use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Represents a single atom within a drug candidate.
///
/// An atom is immutable once placed in a [`Molecule`](super::molecule::Molecule):
/// the optimizer never mutates coordinates in place, it derives a fresh
/// candidate from a parent instead. The element symbol is validated against
/// the static element table at encoding time, not at construction, so that
/// partially assembled inputs can be carried around freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// The element symbol (e.g. "C", "N", "Cl").
    pub element: String,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// The partial atomic charge in elementary charge units.
    pub partial_charge: f64,
}

impl Atom {
    pub fn new(element: &str, position: Point3<f64>, partial_charge: f64) -> Self {
        Self {
            element: element.to_string(),
            position,
            partial_charge,
        }
    }

    /// Returns true when every coordinate component and the charge are
    /// finite (no NaN, no infinities).
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|c| c.is_finite()) && self.partial_charge.is_finite()
    }

    /// Euclidean distance to another atom, in Angstroms.
    pub fn distance_to(&self, other: &Atom) -> f64 {
        (self.position - other.position).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_stores_fields() {
        let atom = Atom::new("C", Point3::new(1.0, 2.0, 3.0), -0.5);
        assert_eq!(atom.element, "C");
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.partial_charge, -0.5);
    }

    #[test]
    fn is_finite_rejects_nan_and_infinity() {
        let good = Atom::new("C", Point3::new(0.0, 0.0, 0.0), 0.1);
        assert!(good.is_finite());

        let nan_coord = Atom::new("C", Point3::new(f64::NAN, 0.0, 0.0), 0.1);
        assert!(!nan_coord.is_finite());

        let inf_charge = Atom::new("C", Point3::origin(), f64::INFINITY);
        assert!(!inf_charge.is_finite());
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Atom::new("C", Point3::origin(), 0.0);
        let b = Atom::new("N", Point3::new(3.0, 4.0, 0.0), 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}
