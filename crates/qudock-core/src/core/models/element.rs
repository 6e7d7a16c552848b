use phf::{Map, phf_map};

/// Static physicochemical properties of a chemical element.
///
/// The table covers the elements that actually occur in small-molecule drug
/// candidates. Electronegativities are Pauling values; covalent radii are in
/// Angstroms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementInfo {
    pub atomic_number: u8,
    pub electronegativity: f64,
    pub covalent_radius: f64,
}

static ELEMENTS: Map<&'static str, ElementInfo> = phf_map! {
    "H" => ElementInfo { atomic_number: 1, electronegativity: 2.20, covalent_radius: 0.31 },
    "C" => ElementInfo { atomic_number: 6, electronegativity: 2.55, covalent_radius: 0.76 },
    "N" => ElementInfo { atomic_number: 7, electronegativity: 3.04, covalent_radius: 0.71 },
    "O" => ElementInfo { atomic_number: 8, electronegativity: 3.44, covalent_radius: 0.66 },
    "F" => ElementInfo { atomic_number: 9, electronegativity: 3.98, covalent_radius: 0.57 },
    "P" => ElementInfo { atomic_number: 15, electronegativity: 2.19, covalent_radius: 1.07 },
    "S" => ElementInfo { atomic_number: 16, electronegativity: 2.58, covalent_radius: 1.05 },
    "Cl" => ElementInfo { atomic_number: 17, electronegativity: 3.16, covalent_radius: 1.02 },
    "Br" => ElementInfo { atomic_number: 35, electronegativity: 2.96, covalent_radius: 1.20 },
    "I" => ElementInfo { atomic_number: 53, electronegativity: 2.66, covalent_radius: 1.39 },
};

/// Looks up the static properties for an element symbol (case-sensitive,
/// standard capitalization, e.g. "C", "Cl").
pub fn lookup(symbol: &str) -> Option<&'static ElementInfo> {
    ELEMENTS.get(symbol)
}
