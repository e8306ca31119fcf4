use super::connectivity::{Connectivity, ConnectivityBase};
use crate::core::error::Result;
use crate::core::models::ids::{AtomIdx, ResIdx, ResNum};
use crate::core::models::molecule_info::MoleculeInfo;
use crate::core::version::IdPair;
use std::ops::Deref;
use std::sync::Arc;
use tracing::trace;

/// The mutable side of [`Connectivity`].
///
/// An editor starts from a snapshot (or from nothing), accepts any number of
/// edits and is frozen back into a [`Connectivity`] by [`commit`](Self::commit).
/// The read-only queries of [`ConnectivityBase`] are available throughout.
#[derive(Debug, Clone)]
pub struct ConnectivityEditor {
    base: ConnectivityBase,
    stamp: IdPair,
    dirty: bool,
}

impl Deref for ConnectivityEditor {
    type Target = ConnectivityBase;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

fn insert_sorted<T: Ord>(list: &mut Vec<T>, value: T) -> bool {
    match list.binary_search(&value) {
        Ok(_) => false,
        Err(pos) => {
            list.insert(pos, value);
            true
        }
    }
}

fn remove_sorted<T: Ord>(list: &mut Vec<T>, value: &T) -> bool {
    match list.binary_search(value) {
        Ok(pos) => {
            list.remove(pos);
            true
        }
        Err(_) => false,
    }
}

impl ConnectivityEditor {
    /// An editor for a molecule with no bonds yet.
    pub fn new(molinfo: Arc<MoleculeInfo>) -> Self {
        Connectivity::new(molinfo).edit()
    }

    pub(super) fn from_parts(base: ConnectivityBase, stamp: IdPair) -> Self {
        Self {
            base,
            stamp,
            dirty: false,
        }
    }

    /// Whether any edit changed the adjacency since the editor was created.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn residues_of(&self, a0: AtomIdx, a1: AtomIdx) -> Result<(ResIdx, ResIdx)> {
        Ok((
            self.base.molinfo.residue_of(a0)?,
            self.base.molinfo.residue_of(a1)?,
        ))
    }

    /// Bonds `a0` to `a1`. Connecting an atom to itself, or connecting an
    /// already-bonded pair, changes nothing.
    pub fn connect(&mut self, a0: AtomIdx, a1: AtomIdx) -> Result<&mut Self> {
        let i0 = self.base.slot(a0)?;
        let i1 = self.base.slot(a1)?;
        if i0 == i1 {
            return Ok(self);
        }

        if !insert_sorted(&mut self.base.connected_atoms[i0], a1) {
            return Ok(self);
        }
        insert_sorted(&mut self.base.connected_atoms[i1], a0);

        let (r0, r1) = self.residues_of(a0, a1)?;
        if r0 != r1 {
            insert_sorted(&mut self.base.connected_residues[r0.value()], r1);
            insert_sorted(&mut self.base.connected_residues[r1.value()], r0);
        }
        self.dirty = true;
        Ok(self)
    }

    /// Removes the bond `a0-a1` if present. When it was the last bond between
    /// two residues, the residue-level edge goes with it.
    pub fn disconnect(&mut self, a0: AtomIdx, a1: AtomIdx) -> Result<&mut Self> {
        let i0 = self.base.slot(a0)?;
        let i1 = self.base.slot(a1)?;

        if !remove_sorted(&mut self.base.connected_atoms[i0], &a1) {
            return Ok(self);
        }
        remove_sorted(&mut self.base.connected_atoms[i1], &a0);
        self.dirty = true;

        let (r0, r1) = self.residues_of(a0, a1)?;
        if r0 != r1 {
            let n0 = self.base.molinfo.resnum(r0)?;
            let n1 = self.base.molinfo.resnum(r1)?;
            if self.base.n_residue_connections(n0, n1)? == 0 {
                remove_sorted(&mut self.base.connected_residues[r0.value()], &r1);
                remove_sorted(&mut self.base.connected_residues[r1.value()], &r0);
                trace!("Residues {n0} and {n1} are no longer bonded");
            }
        }
        Ok(self)
    }

    /// Removes every bond to `atom`.
    pub fn disconnect_all(&mut self, atom: AtomIdx) -> Result<&mut Self> {
        let partners = self.base.connections_to(atom)?.to_vec();
        for partner in partners {
            self.disconnect(atom, partner)?;
        }
        Ok(self)
    }

    /// Removes every bond to every atom of the residue `resnum`.
    pub fn disconnect_all_residue(&mut self, resnum: ResNum) -> Result<&mut Self> {
        let res = self.base.molinfo.res_idx(resnum)?;
        let atoms = self.base.molinfo.atoms_in_residue(res)?.to_vec();
        for atom in atoms {
            self.disconnect_all(atom)?;
        }
        Ok(self)
    }

    /// Freezes the edits into an immutable snapshot. The version is bumped
    /// only if something changed.
    pub fn commit(self) -> Connectivity {
        let mut stamp = self.stamp;
        if self.dirty {
            stamp.increment();
        }
        Connectivity::from_parts(self.base, stamp)
    }
}
