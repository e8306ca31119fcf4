use super::editor::ConnectivityEditor;
use crate::core::error::{Result, TopologyError};
use crate::core::models::ids::{AtomIdx, ResIdx, ResNum};
use crate::core::models::internals::{Angle, Bond, Dihedral, Internal};
use crate::core::models::molecule_info::MoleculeInfo;
use crate::core::models::selection::AtomSelection;
use crate::core::version::IdPair;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;

/// Atom and residue adjacency of a molecule, together with the read-only
/// queries shared by [`Connectivity`] and [`ConnectivityEditor`].
///
/// Adjacency lists are kept sorted and symmetric. Residue adjacency only
/// records pairs of distinct residues and is derived from the atom bonds:
/// two residues are connected exactly while at least one atom of the first
/// is bonded to an atom of the second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityBase {
    pub(super) molinfo: Arc<MoleculeInfo>,
    pub(super) connected_atoms: Vec<Vec<AtomIdx>>,
    pub(super) connected_residues: Vec<Vec<ResIdx>>,
}

impl ConnectivityBase {
    pub(super) fn empty(molinfo: Arc<MoleculeInfo>) -> Self {
        Self {
            connected_atoms: vec![Vec::new(); molinfo.n_atoms()],
            connected_residues: vec![Vec::new(); molinfo.n_residues()],
            molinfo,
        }
    }

    #[inline]
    pub fn molecule_info(&self) -> &Arc<MoleculeInfo> {
        &self.molinfo
    }

    #[inline]
    pub fn n_atoms(&self) -> usize {
        self.connected_atoms.len()
    }

    pub(super) fn slot(&self, atom: AtomIdx) -> Result<usize> {
        atom.map(self.connected_atoms.len())
    }

    pub(super) fn res_slot(&self, resnum: ResNum) -> Result<usize> {
        self.molinfo.res_idx(resnum).map(|r| r.value())
    }

    // ---------------------------------------------------------------------
    // Direct adjacency
    // ---------------------------------------------------------------------

    pub fn are_connected(&self, a0: AtomIdx, a1: AtomIdx) -> Result<bool> {
        let i0 = self.slot(a0)?;
        self.slot(a1)?;
        Ok(self.connected_atoms[i0].binary_search(&a1).is_ok())
    }

    /// Atoms bonded to `atom`, in ascending order.
    pub fn connections_to(&self, atom: AtomIdx) -> Result<&[AtomIdx]> {
        let i = self.slot(atom)?;
        Ok(&self.connected_atoms[i])
    }

    pub fn n_connections_of(&self, atom: AtomIdx) -> Result<usize> {
        self.connections_to(atom).map(<[AtomIdx]>::len)
    }

    /// Total number of bonds.
    pub fn n_connections(&self) -> usize {
        self.connected_atoms.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Whether the two (distinct) residues share at least one bond. A residue
    /// is never reported as connected to itself.
    pub fn are_residues_connected(&self, r0: ResNum, r1: ResNum) -> Result<bool> {
        let i0 = self.res_slot(r0)?;
        let i1 = self.molinfo.res_idx(r1)?;
        Ok(self.connected_residues[i0].binary_search(&i1).is_ok())
    }

    /// Residues bonded to `resnum`, ordered by residue index.
    pub fn residue_connections_to(&self, resnum: ResNum) -> Result<Vec<ResNum>> {
        let i = self.res_slot(resnum)?;
        self.connected_residues[i]
            .iter()
            .map(|&r| self.molinfo.resnum(r))
            .collect()
    }

    /// Number of atom-level bonds between residues `r0` and `r1`. With
    /// `r0 == r1` this counts the bonds inside the residue.
    pub fn n_residue_connections(&self, r0: ResNum, r1: ResNum) -> Result<usize> {
        let res0 = self.molinfo.res_idx(r0)?;
        let res1 = self.molinfo.res_idx(r1)?;
        let mut count = 0;
        for &atom in self.molinfo.atoms_in_residue(res0)? {
            for &partner in &self.connected_atoms[atom.value()] {
                if self.molinfo.residue_of(partner)? == res1 {
                    count += 1;
                }
            }
        }
        Ok(if res0 == res1 { count / 2 } else { count })
    }

    // ---------------------------------------------------------------------
    // Paths
    // ---------------------------------------------------------------------

    #[inline]
    pub fn are_bonded(&self, a0: AtomIdx, a1: AtomIdx) -> Result<bool> {
        self.are_connected(a0, a1)
    }

    /// Whether `a0` and `a1` are the end atoms of some angle `a0-x-a1`.
    pub fn are_angled(&self, a0: AtomIdx, a1: AtomIdx) -> Result<bool> {
        let n0 = self.connections_to(a0)?;
        let n1 = self.connections_to(a1)?;
        if a0 == a1 {
            return Ok(false);
        }
        Ok(n0.iter().any(|x| n1.binary_search(x).is_ok()))
    }

    /// Whether `a0` and `a1` are the end atoms of some dihedral
    /// `a0-x-y-a1` over four distinct atoms.
    pub fn are_dihedraled(&self, a0: AtomIdx, a1: AtomIdx) -> Result<bool> {
        let n0 = self.connections_to(a0)?;
        let n1 = self.connections_to(a1)?;
        if a0 == a1 {
            return Ok(false);
        }
        for &x in n0.iter().filter(|&&x| x != a1) {
            let nx = &self.connected_atoms[x.value()];
            if n1
                .iter()
                .any(|&y| y != a0 && y != x && nx.binary_search(&y).is_ok())
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Breadth-first search over bonds, optionally refusing to cross the
    /// bond `skip`. Returns the predecessor of every reached atom.
    fn bfs(&self, start: usize, skip: Option<(usize, usize)>) -> Vec<Option<usize>> {
        let n = self.connected_atoms.len();
        let mut parent = vec![None; n];
        let mut visited = vec![false; n];
        let mut queue = VecDeque::from([start]);
        visited[start] = true;

        while let Some(current) = queue.pop_front() {
            for next in self.connected_atoms[current].iter().map(AtomIdx::value) {
                let crosses_skipped = skip.is_some_and(|(s0, s1)| {
                    (current == s0 && next == s1) || (current == s1 && next == s0)
                });
                if visited[next] || crosses_skipped {
                    continue;
                }
                visited[next] = true;
                parent[next] = Some(current);
                queue.push_back(next);
            }
        }
        parent
    }

    /// The shortest bonded path from `a0` to `a1`, inclusive of both ends,
    /// or `None` if the atoms lie in different fragments.
    pub fn shortest_path(&self, a0: AtomIdx, a1: AtomIdx) -> Result<Option<Vec<AtomIdx>>> {
        let start = self.slot(a0)?;
        let goal = self.slot(a1)?;
        if start == goal {
            return Ok(Some(vec![a0]));
        }

        let parent = self.bfs(start, None);
        if parent[goal].is_none() {
            return Ok(None);
        }

        let mut path = vec![a1];
        let mut current = goal;
        while let Some(prev) = parent[current] {
            path.push(AtomIdx::new(prev));
            current = prev;
        }
        path.reverse();
        Ok(Some(path))
    }

    /// Whether the bond `a0-a1` exists and lies on a ring, i.e. its ends stay
    /// connected once the bond itself is removed.
    pub fn in_ring_bond(&self, a0: AtomIdx, a1: AtomIdx) -> Result<bool> {
        if !self.are_connected(a0, a1)? {
            return Ok(false);
        }
        let (i0, i1) = (a0.value(), a1.value());
        Ok(self.bfs(i0, Some((i0, i1)))[i1].is_some())
    }

    /// Whether `atom` is part of at least one ring.
    pub fn in_ring(&self, atom: AtomIdx) -> Result<bool> {
        for &partner in self.connections_to(atom)? {
            if self.in_ring_bond(atom, partner)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Every bond that lies on a ring.
    pub fn ring_bonds(&self) -> Vec<Bond> {
        self.bonds()
            .into_iter()
            .filter(|b| {
                let [a0, a1] = b.key();
                self.in_ring_bond(a0, a1).unwrap_or(false)
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Internal enumeration
    // ---------------------------------------------------------------------

    /// Every bond, each reported once in ascending order.
    pub fn bonds(&self) -> Vec<Bond> {
        self.connected_atoms
            .iter()
            .enumerate()
            .flat_map(|(i, partners)| {
                let a0 = AtomIdx::new(i);
                partners
                    .iter()
                    .filter(move |&&a1| a0 < a1)
                    .map(move |&a1| Bond::new(a0, a1))
            })
            .collect()
    }

    /// Every angle `a-b-c` with `a-b` and `b-c` bonded, each reported once.
    pub fn angles(&self) -> Vec<Angle> {
        let mut angles = Vec::new();
        for (center, partners) in self.connected_atoms.iter().enumerate() {
            let b = AtomIdx::new(center);
            for (i, &a) in partners.iter().enumerate() {
                for &c in &partners[i + 1..] {
                    angles.push(Angle::new(a, b, c));
                }
            }
        }
        angles
    }

    /// Every dihedral `a-b-c-d` along a bonded path of four distinct atoms,
    /// each reported once.
    pub fn dihedrals(&self) -> Vec<Dihedral> {
        let mut dihedrals = Vec::new();
        for bond in self.bonds() {
            let [b, c] = bond.key();
            for &a in self.connected_atoms[b.value()].iter().filter(|&&a| a != c) {
                for &d in self.connected_atoms[c.value()].iter().filter(|&&d| d != b) {
                    if a != d {
                        dihedrals.push(Dihedral::new(a, b, c, d));
                    }
                }
            }
        }
        dihedrals
    }

    /// Splits the molecule along the non-ring bond `a0-a1`.
    ///
    /// # Return
    ///
    /// The atoms reachable from `a0` and from `a1` once the bond is cut.
    /// Atoms in other fragments belong to neither selection.
    ///
    /// # Errors
    ///
    /// [`TopologyError::NotBonded`] if the atoms are not bonded and
    /// [`TopologyError::RingBond`] if the bond lies on a ring.
    pub fn split(&self, a0: AtomIdx, a1: AtomIdx) -> Result<(AtomSelection, AtomSelection)> {
        if !self.are_connected(a0, a1)? {
            return Err(TopologyError::NotBonded(a0, a1));
        }
        let (i0, i1) = (a0.value(), a1.value());
        let side = |start: usize| -> Result<AtomSelection> {
            let parent = self.bfs(start, Some((i0, i1)));
            let mut selection = AtomSelection::none(self.n_atoms());
            selection.select(AtomIdx::new(start))?;
            for (i, p) in parent.iter().enumerate() {
                if p.is_some() {
                    selection.select(AtomIdx::new(i))?;
                }
            }
            Ok(selection)
        };

        let left = side(i0)?;
        if left.is_selected(a1) {
            return Err(TopologyError::RingBond(a0, a1));
        }
        Ok((left, side(i1)?))
    }

    /// Shrinks every adjacency list to its length.
    pub(super) fn squeeze(&mut self) {
        self.connected_atoms.iter_mut().for_each(Vec::shrink_to_fit);
        self.connected_residues.iter_mut().for_each(Vec::shrink_to_fit);
        self.connected_atoms.shrink_to_fit();
        self.connected_residues.shrink_to_fit();
    }
}

/// An immutable adjacency snapshot of a molecule.
///
/// All edits go through [`Connectivity::edit`], which hands out a
/// [`ConnectivityEditor`]; committing the editor yields a new snapshot and
/// leaves this one untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connectivity {
    base: ConnectivityBase,
    stamp: IdPair,
}

impl PartialEq for Connectivity {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}

impl Deref for Connectivity {
    type Target = ConnectivityBase;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl Connectivity {
    /// A connectivity with no bonds.
    pub fn new(molinfo: Arc<MoleculeInfo>) -> Self {
        let stamp = IdPair::new(molinfo.id_generator());
        Self {
            base: ConnectivityBase::empty(molinfo),
            stamp,
        }
    }

    pub(super) fn from_parts(mut base: ConnectivityBase, stamp: IdPair) -> Self {
        base.squeeze();
        Self { base, stamp }
    }

    /// An editor seeded with this connectivity's bonds.
    pub fn edit(&self) -> ConnectivityEditor {
        ConnectivityEditor::from_parts(self.base.clone(), self.stamp.clone())
    }

    #[inline]
    pub fn stamp_id(&self) -> u64 {
        self.stamp.id()
    }

    /// Bumped by every commit that changed at least one bond.
    #[inline]
    pub fn version(&self) -> u64 {
        self.stamp.version()
    }
}

impl From<ConnectivityEditor> for Connectivity {
    fn from(editor: ConnectivityEditor) -> Self {
        editor.commit()
    }
}
