use super::ids::AtomIdx;
use crate::core::error::Result;
use serde::{Deserialize, Serialize};

/// A per-atom on/off mask over one molecule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtomSelection {
    selected: Vec<bool>,
}

impl AtomSelection {
    /// A selection with every atom switched on.
    pub fn all(n_atoms: usize) -> Self {
        Self {
            selected: vec![true; n_atoms],
        }
    }

    /// A selection with every atom switched off.
    pub fn none(n_atoms: usize) -> Self {
        Self {
            selected: vec![false; n_atoms],
        }
    }

    /// Selects exactly `atoms` out of `n_atoms`.
    ///
    /// # Errors
    ///
    /// Returns an error if any atom is out of range.
    pub fn from_atoms(n_atoms: usize, atoms: impl IntoIterator<Item = AtomIdx>) -> Result<Self> {
        let mut selection = Self::none(n_atoms);
        for atom in atoms {
            selection.select(atom)?;
        }
        Ok(selection)
    }

    /// Number of atoms the mask covers, selected or not.
    #[inline]
    pub fn n_atoms(&self) -> usize {
        self.selected.len()
    }

    /// Switches `atom` on. Fails if it is out of range.
    pub fn select(&mut self, atom: AtomIdx) -> Result<()> {
        let i = atom.map(self.selected.len())?;
        self.selected[i] = true;
        Ok(())
    }

    /// Switches `atom` off. Fails if it is out of range.
    pub fn deselect(&mut self, atom: AtomIdx) -> Result<()> {
        let i = atom.map(self.selected.len())?;
        self.selected[i] = false;
        Ok(())
    }

    /// Out-of-range atoms are reported as not selected.
    #[inline]
    pub fn is_selected(&self, atom: AtomIdx) -> bool {
        self.selected.get(atom.value()).copied().unwrap_or(false)
    }

    pub fn n_selected(&self) -> usize {
        self.selected.iter().filter(|&&s| s).count()
    }

    /// Whether no atom is switched off.
    pub fn selected_all(&self) -> bool {
        self.selected.iter().all(|&s| s)
    }

    /// Iterates the selected atoms in ascending order.
    pub fn selected(&self) -> impl Iterator<Item = AtomIdx> + '_ {
        self.selected
            .iter()
            .enumerate()
            .filter(|(_, s)| **s)
            .map(|(i, _)| AtomIdx::new(i))
    }

    /// Flips every atom.
    pub fn invert(&mut self) {
        self.selected.iter_mut().for_each(|s| *s = !*s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_and_none_cover_every_atom() {
        assert_eq!(AtomSelection::all(4).n_selected(), 4);
        assert_eq!(AtomSelection::none(4).n_selected(), 0);
        assert!(AtomSelection::all(4).selected_all());
    }

    #[test]
    fn select_and_deselect_toggle_single_atoms() {
        let mut sel = AtomSelection::none(3);
        sel.select(AtomIdx(1)).unwrap();
        assert!(sel.is_selected(AtomIdx(1)));
        sel.deselect(AtomIdx(1)).unwrap();
        assert!(!sel.is_selected(AtomIdx(1)));
        assert!(sel.select(AtomIdx(3)).is_err());
        assert!(!sel.is_selected(AtomIdx(3)));
    }

    #[test]
    fn invert_swaps_membership() {
        let mut sel = AtomSelection::from_atoms(4, [AtomIdx(0), AtomIdx(2)]).unwrap();
        sel.invert();
        assert_eq!(sel.selected().collect::<Vec<_>>(), vec![AtomIdx(1), AtomIdx(3)]);
    }
}
