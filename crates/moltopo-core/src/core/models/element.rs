use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

struct ElementData {
    symbol: &'static str,
    mass: f64,            // Standard atomic weight (amu)
    covalent_radius: f64, // Single-bond covalent radius (Angstrom)
}

const fn data(symbol: &'static str, mass: f64, covalent_radius: f64) -> ElementData {
    ElementData {
        symbol,
        mass,
        covalent_radius,
    }
}

// Indexed by atomic number. Entry 0 is the dummy element.
static ELEMENT_TABLE: [ElementData; 87] = [
    data("Xx", 0.0, 0.0),
    data("H", 1.008, 0.31),
    data("He", 4.0026, 0.28),
    data("Li", 6.94, 1.28),
    data("Be", 9.0122, 0.96),
    data("B", 10.81, 0.84),
    data("C", 12.011, 0.76),
    data("N", 14.007, 0.71),
    data("O", 15.999, 0.66),
    data("F", 18.998, 0.57),
    data("Ne", 20.180, 0.58),
    data("Na", 22.990, 1.66),
    data("Mg", 24.305, 1.41),
    data("Al", 26.982, 1.21),
    data("Si", 28.085, 1.11),
    data("P", 30.974, 1.07),
    data("S", 32.06, 1.05),
    data("Cl", 35.45, 1.02),
    data("Ar", 39.948, 1.06),
    data("K", 39.098, 2.03),
    data("Ca", 40.078, 1.76),
    data("Sc", 44.956, 1.70),
    data("Ti", 47.867, 1.60),
    data("V", 50.942, 1.53),
    data("Cr", 51.996, 1.39),
    data("Mn", 54.938, 1.39),
    data("Fe", 55.845, 1.32),
    data("Co", 58.933, 1.26),
    data("Ni", 58.693, 1.24),
    data("Cu", 63.546, 1.32),
    data("Zn", 65.38, 1.22),
    data("Ga", 69.723, 1.22),
    data("Ge", 72.630, 1.20),
    data("As", 74.922, 1.19),
    data("Se", 78.971, 1.20),
    data("Br", 79.904, 1.20),
    data("Kr", 83.798, 1.16),
    data("Rb", 85.468, 2.20),
    data("Sr", 87.62, 1.95),
    data("Y", 88.906, 1.90),
    data("Zr", 91.224, 1.75),
    data("Nb", 92.906, 1.64),
    data("Mo", 95.95, 1.54),
    data("Tc", 98.0, 1.47),
    data("Ru", 101.07, 1.46),
    data("Rh", 102.91, 1.42),
    data("Pd", 106.42, 1.39),
    data("Ag", 107.87, 1.45),
    data("Cd", 112.41, 1.44),
    data("In", 114.82, 1.42),
    data("Sn", 118.71, 1.39),
    data("Sb", 121.76, 1.39),
    data("Te", 127.60, 1.38),
    data("I", 126.90, 1.39),
    data("Xe", 131.29, 1.40),
    data("Cs", 132.91, 2.44),
    data("Ba", 137.33, 2.15),
    data("La", 138.91, 2.07),
    data("Ce", 140.12, 2.04),
    data("Pr", 140.91, 2.03),
    data("Nd", 144.24, 2.01),
    data("Pm", 145.0, 1.99),
    data("Sm", 150.36, 1.98),
    data("Eu", 151.96, 1.98),
    data("Gd", 157.25, 1.96),
    data("Tb", 158.93, 1.94),
    data("Dy", 162.50, 1.92),
    data("Ho", 164.93, 1.92),
    data("Er", 167.26, 1.89),
    data("Tm", 168.93, 1.90),
    data("Yb", 173.05, 1.87),
    data("Lu", 174.97, 1.87),
    data("Hf", 178.49, 1.75),
    data("Ta", 180.95, 1.70),
    data("W", 183.84, 1.62),
    data("Re", 186.21, 1.51),
    data("Os", 190.23, 1.44),
    data("Ir", 192.22, 1.41),
    data("Pt", 195.08, 1.36),
    data("Au", 196.97, 1.36),
    data("Hg", 200.59, 1.32),
    data("Tl", 204.38, 1.45),
    data("Pb", 207.2, 1.46),
    data("Bi", 208.98, 1.48),
    data("Po", 209.0, 1.40),
    data("At", 210.0, 1.50),
    data("Rn", 222.0, 1.50),
];

static SYMBOL_TO_Z: Map<&'static str, u8> = phf_map! {
    "XX" => 0, "H" => 1, "HE" => 2, "LI" => 3, "BE" => 4, "B" => 5, "C" => 6, "N" => 7,
    "O" => 8, "F" => 9, "NE" => 10, "NA" => 11, "MG" => 12, "AL" => 13, "SI" => 14,
    "P" => 15, "S" => 16, "CL" => 17, "AR" => 18, "K" => 19, "CA" => 20, "SC" => 21,
    "TI" => 22, "V" => 23, "CR" => 24, "MN" => 25, "FE" => 26, "CO" => 27, "NI" => 28,
    "CU" => 29, "ZN" => 30, "GA" => 31, "GE" => 32, "AS" => 33, "SE" => 34, "BR" => 35,
    "KR" => 36, "RB" => 37, "SR" => 38, "Y" => 39, "ZR" => 40, "NB" => 41, "MO" => 42,
    "TC" => 43, "RU" => 44, "RH" => 45, "PD" => 46, "AG" => 47, "CD" => 48, "IN" => 49,
    "SN" => 50, "SB" => 51, "TE" => 52, "I" => 53, "XE" => 54, "CS" => 55, "BA" => 56,
    "LA" => 57, "CE" => 58, "PR" => 59, "ND" => 60, "PM" => 61, "SM" => 62, "EU" => 63,
    "GD" => 64, "TB" => 65, "DY" => 66, "HO" => 67, "ER" => 68, "TM" => 69, "YB" => 70,
    "LU" => 71, "HF" => 72, "TA" => 73, "W" => 74, "RE" => 75, "OS" => 76, "IR" => 77,
    "PT" => 78, "AU" => 79, "HG" => 80, "TL" => 81, "PB" => 82, "BI" => 83, "PO" => 84,
    "AT" => 85, "RN" => 86,
    // Hydrogen isotopes
    "D" => 1, "T" => 1,
};

/// Largest mass difference (amu) tolerated by `Element::from_mass`.
const MASS_MATCH_TOLERANCE: f64 = 0.5;

/// A chemical element, identified by its atomic number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Element(u8);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown element: '{0}'")]
pub struct ParseElementError(pub String);

impl Element {
    pub const DUMMY: Element = Element(0);
    pub const HYDROGEN: Element = Element(1);
    pub const CARBON: Element = Element(6);
    pub const NITROGEN: Element = Element(7);
    pub const OXYGEN: Element = Element(8);

    pub fn from_atomic_number(z: u8) -> Option<Self> {
        ((z as usize) < ELEMENT_TABLE.len()).then_some(Self(z))
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        SYMBOL_TO_Z
            .get(symbol.trim().to_ascii_uppercase().as_str())
            .map(|&z| Self(z))
    }

    /// Returns the element whose standard atomic weight is closest to `mass`,
    /// provided it lies within half a mass unit.
    pub fn from_mass(mass: f64) -> Option<Self> {
        ELEMENT_TABLE
            .iter()
            .enumerate()
            .skip(1)
            .map(|(z, d)| (z, (d.mass - mass).abs()))
            .filter(|&(_, diff)| diff <= MASS_MATCH_TOLERANCE)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(z, _)| Self(z as u8))
    }

    #[inline]
    pub fn atomic_number(&self) -> u8 {
        self.0
    }

    pub fn symbol(&self) -> &'static str {
        ELEMENT_TABLE[self.0 as usize].symbol
    }

    pub fn mass(&self) -> f64 {
        ELEMENT_TABLE[self.0 as usize].mass
    }

    pub fn covalent_radius(&self) -> f64 {
        ELEMENT_TABLE[self.0 as usize].covalent_radius
    }

    /// Whether this element counts as "heavy" under the given cut-off.
    #[inline]
    pub fn is_heavy(&self, min_atomic_number: u8) -> bool {
        self.0 >= min_atomic_number
    }
}

impl TryFrom<u8> for Element {
    type Error = ParseElementError;

    fn try_from(z: u8) -> Result<Self, Self::Error> {
        Self::from_atomic_number(z).ok_or_else(|| ParseElementError(z.to_string()))
    }
}

impl From<Element> for u8 {
    fn from(element: Element) -> Self {
        element.0
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s).ok_or_else(|| ParseElementError(s.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
