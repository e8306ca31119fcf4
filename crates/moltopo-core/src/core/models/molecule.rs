use super::element::Element;
use super::molecule_info::MoleculeInfo;
use super::selection::AtomSelection;
use crate::core::topology::connectivity::Connectivity;
use nalgebra::Point3;
use std::sync::Arc;

/// A molecule's layout together with the optional per-atom properties that
/// consumers of the topology engine may need.
///
/// Properties are plain options; a consumer that requires one reports its
/// absence as a missing-property error rather than guessing.
#[derive(Debug, Clone)]
pub struct Molecule {
    pub info: Arc<MoleculeInfo>,
    pub elements: Option<Vec<Element>>,
    pub masses: Option<Vec<f64>>,
    pub coordinates: Option<Vec<Point3<f64>>>,
    pub connectivity: Option<Connectivity>,
}

impl Molecule {
    pub fn new(info: Arc<MoleculeInfo>) -> Self {
        Self {
            info,
            elements: None,
            masses: None,
            coordinates: None,
            connectivity: None,
        }
    }

    pub fn with_elements(mut self, elements: Vec<Element>) -> Self {
        self.elements = Some(elements);
        self
    }

    pub fn with_masses(mut self, masses: Vec<f64>) -> Self {
        self.masses = Some(masses);
        self
    }

    pub fn with_coordinates(mut self, coordinates: Vec<Point3<f64>>) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    #[inline]
    pub fn n_atoms(&self) -> usize {
        self.info.n_atoms()
    }
}

/// A molecule seen through an atom selection.
#[derive(Debug, Clone)]
pub struct MoleculeView<'a> {
    molecule: &'a Molecule,
    selection: AtomSelection,
}

impl<'a> MoleculeView<'a> {
    /// A view of the whole molecule.
    pub fn new(molecule: &'a Molecule) -> Self {
        Self {
            molecule,
            selection: AtomSelection::all(molecule.n_atoms()),
        }
    }

    pub fn with_selection(molecule: &'a Molecule, selection: AtomSelection) -> Self {
        Self {
            molecule,
            selection,
        }
    }

    #[inline]
    pub fn molecule(&self) -> &'a Molecule {
        self.molecule
    }

    #[inline]
    pub fn info(&self) -> &'a MoleculeInfo {
        &self.molecule.info
    }

    #[inline]
    pub fn selection(&self) -> &AtomSelection {
        &self.selection
    }
}
