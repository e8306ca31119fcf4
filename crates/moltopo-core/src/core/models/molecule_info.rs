use super::ids::{AtomIdx, ResIdx, ResNum};
use crate::core::error::{Result, TopologyError};
use crate::core::version::Incremint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomInfo {
    pub name: String,       // Atom name (e.g., "CA", "C1")
    pub residue: ResIdx,    // Index of the owning residue
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidueInfo {
    pub number: ResNum,
    pub name: String,
    atoms: Vec<AtomIdx>,
}

impl ResidueInfo {
    pub fn atoms(&self) -> &[AtomIdx] {
        &self.atoms
    }
}

/// The layout of one molecule: which atoms exist, and which residue each
/// atom belongs to.
///
/// Every topology container indexes atoms and residues through the dense
/// indices defined here, so a `MoleculeInfo` is shared (behind an `Arc`) by
/// all the containers built for the same molecule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoleculeInfo {
    atoms: Vec<AtomInfo>,
    residues: Vec<ResidueInfo>,
    resnum_to_residx: HashMap<ResNum, ResIdx>,
    /// Source of unique IDs for every version stamp built on this molecule.
    #[serde(skip)]
    id_generator: Arc<Incremint>,
}

impl PartialEq for MoleculeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.atoms == other.atoms && self.residues == other.residues
    }
}

impl Eq for MoleculeInfo {}

impl MoleculeInfo {
    pub fn builder() -> MoleculeInfoBuilder {
        MoleculeInfoBuilder::new()
    }

    #[inline]
    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn n_residues(&self) -> usize {
        self.residues.len()
    }

    pub fn atom(&self, atom: AtomIdx) -> Result<&AtomInfo> {
        Ok(&self.atoms[atom.map(self.atoms.len())?])
    }

    pub fn residue(&self, res: ResIdx) -> Result<&ResidueInfo> {
        self.residues
            .get(res.value())
            .ok_or(TopologyError::MissingResidueIndex(res))
    }

    #[inline]
    pub fn contains_atom(&self, atom: AtomIdx) -> bool {
        atom.value() < self.atoms.len()
    }

    #[inline]
    pub fn contains_residue(&self, resnum: ResNum) -> bool {
        self.resnum_to_residx.contains_key(&resnum)
    }

    pub fn assert_contains_atom(&self, atom: AtomIdx) -> Result<()> {
        if self.contains_atom(atom) {
            Ok(())
        } else {
            Err(TopologyError::MissingAtom(atom))
        }
    }

    pub fn assert_contains_residue(&self, resnum: ResNum) -> Result<()> {
        if self.contains_residue(resnum) {
            Ok(())
        } else {
            Err(TopologyError::MissingResidue(resnum))
        }
    }

    pub fn res_idx(&self, resnum: ResNum) -> Result<ResIdx> {
        self.resnum_to_residx
            .get(&resnum)
            .copied()
            .ok_or(TopologyError::MissingResidue(resnum))
    }

    pub fn resnum(&self, res: ResIdx) -> Result<ResNum> {
        self.residue(res).map(|r| r.number)
    }

    pub fn residue_of(&self, atom: AtomIdx) -> Result<ResIdx> {
        self.atoms
            .get(atom.value())
            .map(|a| a.residue)
            .ok_or(TopologyError::MissingAtom(atom))
    }

    pub fn resnum_of(&self, atom: AtomIdx) -> Result<ResNum> {
        let res = self.residue_of(atom)?;
        Ok(self.residues[res.value()].number)
    }

    pub fn atoms_in_residue(&self, res: ResIdx) -> Result<&[AtomIdx]> {
        self.residue(res).map(|r| r.atoms())
    }

    pub fn atom_name(&self, atom: AtomIdx) -> Result<&str> {
        self.atom(atom).map(|a| a.name.as_str())
    }

    pub fn find_atom(&self, resnum: ResNum, name: &str) -> Option<AtomIdx> {
        let res = self.resnum_to_residx.get(&resnum)?;
        self.residues[res.value()]
            .atoms
            .iter()
            .copied()
            .find(|&atom| self.atoms[atom.value()].name == name)
    }

    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomIdx, &AtomInfo)> {
        self.atoms
            .iter()
            .enumerate()
            .map(|(i, atom)| (AtomIdx::new(i), atom))
    }

    pub fn residues_iter(&self) -> impl Iterator<Item = (ResIdx, &ResidueInfo)> {
        self.residues
            .iter()
            .enumerate()
            .map(|(i, res)| (ResIdx::new(i), res))
    }

    /// The generator that stamps every versioned container built on this
    /// molecule with a unique ID.
    pub fn id_generator(&self) -> &Incremint {
        &self.id_generator
    }
}

/// Incremental builder for [`MoleculeInfo`], mirroring the order in which
/// structure files list their contents: start a residue, then add its atoms.
pub struct MoleculeInfoBuilder {
    info: MoleculeInfo,
    current_residue: Option<ResIdx>,
}

impl Default for MoleculeInfoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MoleculeInfoBuilder {
    pub fn new() -> Self {
        Self {
            info: MoleculeInfo {
                atoms: Vec::new(),
                residues: Vec::new(),
                resnum_to_residx: HashMap::new(),
                id_generator: Arc::new(Incremint::default()),
            },
            current_residue: None,
        }
    }

    /// Shares an existing ID generator, so stamps built on this molecule are
    /// unique across every molecule using the same generator.
    pub fn id_generator(mut self, generator: Arc<Incremint>) -> Self {
        self.info.id_generator = generator;
        self
    }

    pub fn start_residue(mut self, number: i32, name: &str) -> Result<Self> {
        let resnum = ResNum(number);
        if self.info.resnum_to_residx.contains_key(&resnum) {
            return Err(TopologyError::DuplicateResidue(resnum));
        }
        let res = ResIdx::new(self.info.residues.len());
        self.info.residues.push(ResidueInfo {
            number: resnum,
            name: name.to_string(),
            atoms: Vec::new(),
        });
        self.info.resnum_to_residx.insert(resnum, res);
        self.current_residue = Some(res);
        Ok(self)
    }

    pub fn add_atom(mut self, name: &str) -> Result<Self> {
        let res = self.current_residue.ok_or_else(|| {
            TopologyError::ProgramBug("an atom was added before any residue was started".into())
        })?;
        let atom = AtomIdx::new(self.info.atoms.len());
        self.info.atoms.push(AtomInfo {
            name: name.to_string(),
            residue: res,
        });
        self.info.residues[res.value()].atoms.push(atom);
        Ok(self)
    }

    pub fn add_atoms(mut self, names: &[&str]) -> Result<Self> {
        for name in names {
            self = self.add_atom(name)?;
        }
        Ok(self)
    }

    pub fn build(self) -> MoleculeInfo {
        self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_residue_info() -> MoleculeInfo {
        MoleculeInfo::builder()
            .start_residue(1, "ALA")
            .unwrap()
            .add_atoms(&["N", "CA"])
            .unwrap()
            .start_residue(2, "GLY")
            .unwrap()
            .add_atoms(&["N", "CA", "C"])
            .unwrap()
            .build()
    }

    #[test]
    fn builder_assigns_dense_indices_in_order() {
        let info = two_residue_info();
        assert_eq!(info.n_atoms(), 5);
        assert_eq!(info.n_residues(), 2);
        assert_eq!(info.atoms_in_residue(ResIdx(1)).unwrap(), &[
            AtomIdx(2),
            AtomIdx(3),
            AtomIdx(4)
        ]);
        assert_eq!(info.resnum_of(AtomIdx(1)).unwrap(), ResNum(1));
        assert_eq!(info.resnum_of(AtomIdx(4)).unwrap(), ResNum(2));
    }

    #[test]
    fn lookups_by_number_and_name() {
        let info = two_residue_info();
        assert_eq!(info.res_idx(ResNum(2)).unwrap(), ResIdx(1));
        assert_eq!(info.find_atom(ResNum(2), "CA"), Some(AtomIdx(3)));
        assert_eq!(info.find_atom(ResNum(2), "CB"), None);
        assert_eq!(info.atom_name(AtomIdx(0)).unwrap(), "N");
    }

    #[test]
    fn missing_entities_are_reported() {
        let info = two_residue_info();
        assert_eq!(
            info.res_idx(ResNum(9)).unwrap_err(),
            TopologyError::MissingResidue(ResNum(9))
        );
        assert_eq!(
            info.residue_of(AtomIdx(5)).unwrap_err(),
            TopologyError::MissingAtom(AtomIdx(5))
        );
        assert!(info.assert_contains_atom(AtomIdx(4)).is_ok());
        assert!(matches!(
            info.atom(AtomIdx(7)),
            Err(TopologyError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn duplicate_residue_numbers_are_rejected() {
        let result = MoleculeInfo::builder()
            .start_residue(1, "ALA")
            .unwrap()
            .start_residue(1, "GLY");
        assert!(matches!(
            result,
            Err(TopologyError::DuplicateResidue(ResNum(1)))
        ));
    }

    #[test]
    fn adding_an_atom_without_a_residue_is_a_bug() {
        let result = MoleculeInfo::builder().add_atom("C1");
        assert!(matches!(result, Err(TopologyError::ProgramBug(_))));
    }

    #[test]
    fn shared_generator_is_used_for_stamps() {
        let generator = Arc::new(Incremint::new(100));
        let info = MoleculeInfo::builder()
            .id_generator(Arc::clone(&generator))
            .build();
        assert_eq!(info.id_generator().increment(), 101);
        assert_eq!(generator.current(), 101);
    }
}
