use super::connectivity::Connectivity;
use super::editor::ConnectivityEditor;
use crate::core::error::{Result, TopologyError};
use crate::core::models::element::Element;
use crate::core::models::ids::AtomIdx;
use crate::core::models::molecule_info::MoleculeInfo;
use nalgebra::Point3;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const DEFAULT_BOND_TOLERANCE: f64 = 1.1;

/// Perceives covalent bonds from geometry.
///
/// Two atoms are bonded when their distance is below `tolerance` times the
/// sum of their covalent radii. Dummy atoms never bond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CovalentBondHunter {
    pub tolerance: f64,
}

impl Default for CovalentBondHunter {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_BOND_TOLERANCE,
        }
    }
}

impl CovalentBondHunter {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    #[instrument(skip_all, name = "covalent_bond_hunt")]
    pub fn hunt(
        &self,
        molinfo: &Arc<MoleculeInfo>,
        elements: &[Element],
        coordinates: &[Point3<f64>],
    ) -> Result<Connectivity> {
        let n_atoms = molinfo.n_atoms();
        for (property, found) in [("element", elements.len()), ("coordinates", coordinates.len())] {
            if found != n_atoms {
                return Err(TopologyError::PropertyLength {
                    property,
                    expected: n_atoms,
                    found,
                });
            }
        }

        let mut editor = ConnectivityEditor::new(Arc::clone(molinfo));
        for i in 0..n_atoms {
            if elements[i] == Element::DUMMY {
                continue;
            }
            for j in (i + 1)..n_atoms {
                if elements[j] == Element::DUMMY {
                    continue;
                }
                let cutoff =
                    self.tolerance * (elements[i].covalent_radius() + elements[j].covalent_radius());
                if nalgebra::distance_squared(&coordinates[i], &coordinates[j]) < cutoff * cutoff {
                    editor.connect(AtomIdx::new(i), AtomIdx::new(j))?;
                }
            }
        }

        debug!("Perceived {} bonds among {} atoms", editor.n_connections(), n_atoms);
        Ok(editor.commit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethanol_like() -> (Arc<MoleculeInfo>, Vec<Element>, Vec<Point3<f64>>) {
        let info = MoleculeInfo::builder()
            .start_residue(1, "EOH")
            .and_then(|b| b.add_atoms(&["C1", "C2", "O", "HO"]))
            .unwrap()
            .build();
        let elements = vec![
            Element::CARBON,
            Element::CARBON,
            Element::OXYGEN,
            Element::HYDROGEN,
        ];
        let coordinates = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.54, 0.0, 0.0),
            Point3::new(2.05, 1.35, 0.0),
            Point3::new(2.95, 1.40, 0.0),
        ];
        (Arc::new(info), elements, coordinates)
    }

    #[test]
    fn bonds_atoms_within_covalent_distance() {
        let (info, elements, coords) = ethanol_like();
        let conn = CovalentBondHunter::default()
            .hunt(&info, &elements, &coords)
            .unwrap();
        let a = AtomIdx::new;
        assert_eq!(conn.n_connections(), 3);
        assert!(conn.are_connected(a(0), a(1)).unwrap());
        assert!(conn.are_connected(a(1), a(2)).unwrap());
        assert!(conn.are_connected(a(2), a(3)).unwrap());
        assert!(!conn.are_connected(a(0), a(2)).unwrap());
    }

    #[test]
    fn tight_tolerance_finds_nothing() {
        let (info, elements, coords) = ethanol_like();
        let conn = CovalentBondHunter::new(0.5)
            .hunt(&info, &elements, &coords)
            .unwrap();
        assert_eq!(conn.n_connections(), 0);
    }

    #[test]
    fn rejects_mismatched_property_lengths() {
        let (info, elements, coords) = ethanol_like();
        let result = CovalentBondHunter::default().hunt(&info, &elements[..2], &coords);
        assert_eq!(
            result.unwrap_err(),
            TopologyError::PropertyLength {
                property: "element",
                expected: 4,
                found: 2
            }
        );
    }
}
