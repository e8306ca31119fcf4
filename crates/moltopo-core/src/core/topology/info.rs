use super::connectivity::ConnectivityBase;
use super::group::InternalGroup;
use super::iterator::{GroupMap, InternalGroupIterator};
use crate::core::error::{Result, TopologyError};
use crate::core::models::ids::{AtomIdx, GroupId, GroupIndexId, ResNum};
use crate::core::models::internals::{Angle, Bond, Dihedral, Internal, ResidueKey};
use crate::core::models::molecule_info::MoleculeInfo;
use crate::core::version::{IdTriple, Version};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{instrument, trace};

/// Which part of the molecule a query ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Every group in the molecule.
    Molecule,
    /// Groups touching one residue.
    Residue(ResNum),
    /// Groups touching both residues of a pair.
    Pair(ResNum, ResNum),
    /// Groups whose residue set contains every residue listed.
    Common(&'a [ResNum]),
}

/// Restricts a query to intra-residue or inter-residue internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InternalKind {
    #[default]
    All,
    Intra,
    Inter,
}

impl InternalKind {
    fn accepts(&self, key: &ResidueKey) -> bool {
        match self {
            Self::All => true,
            Self::Intra => key.is_intra(),
            Self::Inter => key.is_inter(),
        }
    }
}

/// The complete set of internals of one kind for one molecule.
///
/// Internals are partitioned into [`InternalGroup`]s by their residue key.
/// The group map, the residue-key index and the residue-number index are kept
/// consistent on every insertion and removal: the first internal with a new
/// residue key allocates the next [`GroupId`], and removing the last internal
/// of a group deletes the group together with every reference to it.
///
/// Queries naming a residue that does not exist fail with
/// [`TopologyError::MissingResidue`]; queries on an existing residue that has
/// no matching internals succeed with an empty result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct InternalInfo<T: Internal> {
    molinfo: Arc<MoleculeInfo>,
    groups: Arc<GroupMap<T>>,
    resid_to_groupid: HashMap<ResidueKey, GroupId>,
    resnum_to_groupids: HashMap<ResNum, BTreeSet<GroupId>>,
    /// Smallest group ID that has never been handed out.
    next_group_id: u32,
    stamp: IdTriple,
}

impl<T: Internal> PartialEq for InternalInfo<T> {
    fn eq(&self, other: &Self) -> bool {
        self.next_group_id == other.next_group_id
            && *self.molinfo == *other.molinfo
            && *self.groups == *other.groups
    }
}

impl<T: Internal> InternalInfo<T> {
    /// An empty index over the atoms of `molinfo`.
    pub fn new(molinfo: Arc<MoleculeInfo>) -> Self {
        let stamp = IdTriple::new(molinfo.id_generator());
        Self {
            molinfo,
            groups: Arc::new(GroupMap::new()),
            resid_to_groupid: HashMap::new(),
            resnum_to_groupids: HashMap::new(),
            next_group_id: 0,
            stamp,
        }
    }

    /// The molecule layout this index is built over.
    #[inline]
    pub fn molecule_info(&self) -> &Arc<MoleculeInfo> {
        &self.molinfo
    }

    /// Version stamp: the major number changes whenever a group is created or
    /// deleted, the minor number on every other modification.
    #[inline]
    pub fn version(&self) -> Version {
        self.stamp.version()
    }

    /// Identifier shared by this index and every copy derived from it.
    #[inline]
    pub fn stamp_id(&self) -> u64 {
        self.stamp.id()
    }

    fn groups_mut(&mut self) -> &mut GroupMap<T> {
        Arc::make_mut(&mut self.groups)
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Adds `internal`, returning a handle that stays valid until the
    /// internal or its whole group is removed. Adding an internal that is
    /// already present returns its existing handle.
    pub fn add(&mut self, internal: T) -> Result<GroupIndexId> {
        internal.validate()?;
        let key = internal.residue_key(&self.molinfo)?;

        if let Some(&group_id) = self.resid_to_groupid.get(&key) {
            if let Some(index) = self.groups.get(&group_id).and_then(|g| g.index_of(&internal)) {
                return Ok(GroupIndexId::new(group_id, index));
            }
            let group = self
                .groups_mut()
                .get_mut(&group_id)
                .ok_or(TopologyError::MissingGroup(group_id))?;
            let index = group.add(&internal);
            self.stamp.increment_minor();
            return Ok(GroupIndexId::new(group_id, index));
        }

        let group_id = GroupId(self.next_group_id);
        self.next_group_id += 1;

        let mut group = InternalGroup::new(key);
        let index = group.add(&internal);
        self.groups_mut().insert(group_id, group);
        self.resid_to_groupid.insert(key, group_id);
        for resnum in key.unique_resnums() {
            self.resnum_to_groupids
                .entry(resnum)
                .or_default()
                .insert(group_id);
        }
        self.stamp.increment_major();

        trace!(
            "Created group {:?} for residues {:?} ({})",
            group_id,
            key.resnums(),
            T::NAME
        );
        Ok(GroupIndexId::new(group_id, index))
    }

    /// Removes `internal`. Removing an internal that is not present is a
    /// no-op and returns `None`.
    pub fn remove(&mut self, internal: &T) -> Option<T> {
        let key = internal.residue_key(&self.molinfo).ok()?;
        let group_id = *self.resid_to_groupid.get(&key)?;
        if !self.groups.get(&group_id)?.contains(internal) {
            return None;
        }
        self.groups_mut().get_mut(&group_id)?.remove(internal)?;
        self.after_removal(group_id);
        Some(T::from_key(internal.key()))
    }

    /// Removes the internal identified by `id`. Unknown handles are a no-op.
    pub fn remove_id(&mut self, id: GroupIndexId) -> Option<T> {
        if !self.groups.get(&id.group)?.contains_index(id.index) {
            return None;
        }
        let removed = self.groups_mut().get_mut(&id.group)?.remove_index(id.index).ok()?;
        self.after_removal(id.group);
        Some(removed)
    }

    fn after_removal(&mut self, group_id: GroupId) {
        let now_empty = self.groups.get(&group_id).is_none_or(InternalGroup::is_empty);
        if now_empty {
            self.purge_group(group_id);
        } else {
            self.stamp.increment_minor();
        }
    }

    fn purge_group(&mut self, group_id: GroupId) {
        let Some(group) = self.groups_mut().remove(&group_id) else {
            return;
        };
        let key = *group.residue_key();
        self.resid_to_groupid.remove(&key);
        for resnum in key.unique_resnums() {
            if let Some(ids) = self.resnum_to_groupids.get_mut(&resnum) {
                ids.remove(&group_id);
                if ids.is_empty() {
                    self.resnum_to_groupids.remove(&resnum);
                }
            }
        }
        self.stamp.increment_major();
        trace!("Deleted empty group {:?} ({})", group_id, T::NAME);
    }

    // ---------------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------------

    /// Whether `internal` is stored.
    pub fn contains(&self, internal: &T) -> bool {
        self.at(internal).is_ok()
    }

    /// Whether `id` refers to a stored internal.
    pub fn contains_id(&self, id: GroupIndexId) -> bool {
        self.groups
            .get(&id.group)
            .is_some_and(|g| g.contains_index(id.index))
    }

    /// The handle of a stored internal.
    pub fn at(&self, internal: &T) -> Result<GroupIndexId> {
        let key = internal.residue_key(&self.molinfo)?;
        self.resid_to_groupid
            .get(&key)
            .and_then(|&gid| {
                let index = self.groups.get(&gid)?.index_of(internal)?;
                Some(GroupIndexId::new(gid, index))
            })
            .ok_or_else(|| TopologyError::MissingInternal(internal.to_string()))
    }

    /// The internal stored under `id`.
    pub fn get(&self, id: GroupIndexId) -> Result<T> {
        self.group(id.group)?.internal(id.index)
    }

    /// The group with ID `group_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if no such group exists.
    pub fn group(&self, group_id: GroupId) -> Result<&InternalGroup<T>> {
        self.groups
            .get(&group_id)
            .ok_or(TopologyError::MissingGroup(group_id))
    }

    /// Every internal that involves `atom`.
    pub fn internals_involving(&self, atom: AtomIdx) -> Result<Vec<T>> {
        let resnum = self.molinfo.resnum_of(atom)?;
        let ids = self.select_groups(Scope::Residue(resnum), InternalKind::All)?;
        Ok(ids
            .iter()
            .filter_map(|id| self.groups.get(id))
            .flat_map(|g| g.iter())
            .filter(|internal| internal.involves(atom))
            .collect())
    }

    // ---------------------------------------------------------------------
    // Scoped queries
    // ---------------------------------------------------------------------

    fn check_residues(&self, resnums: &[ResNum]) -> Result<()> {
        resnums
            .iter()
            .try_for_each(|&r| self.molinfo.assert_contains_residue(r))
    }

    fn ids_touching(&self, resnum: ResNum) -> impl Iterator<Item = GroupId> + '_ {
        self.resnum_to_groupids
            .get(&resnum)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    /// Resolves a scope to the matching group IDs, in ascending order.
    fn select_groups(&self, scope: Scope<'_>, kind: InternalKind) -> Result<Vec<GroupId>> {
        let candidates: Vec<GroupId> = match scope {
            Scope::Molecule => self.groups.keys().copied().collect(),
            Scope::Residue(r) => {
                self.check_residues(&[r])?;
                self.ids_touching(r).collect()
            }
            Scope::Pair(r0, r1) => {
                self.check_residues(&[r0, r1])?;
                let other = self.resnum_to_groupids.get(&r1);
                self.ids_touching(r0)
                    .filter(|id| other.is_some_and(|ids| ids.contains(id)))
                    .collect()
            }
            Scope::Common(resnums) => {
                self.check_residues(resnums)?;
                // Linear in the number of groups touching the first residue
                // (or all groups for an empty set).
                match resnums.first() {
                    None => self.groups.keys().copied().collect(),
                    Some(&first) => self
                        .ids_touching(first)
                        .filter(|id| {
                            self.groups
                                .get(id)
                                .is_some_and(|g| g.residue_key().contains_all(resnums))
                        })
                        .collect(),
                }
            }
        };

        Ok(candidates
            .into_iter()
            .filter(|id| {
                self.groups
                    .get(id)
                    .is_some_and(|g| kind.accepts(g.residue_key()))
            })
            .collect())
    }

    /// IDs of the groups selected by `scope` and `kind`, in ascending order.
    pub fn group_ids_in(&self, scope: Scope<'_>, kind: InternalKind) -> Result<Vec<GroupId>> {
        self.select_groups(scope, kind)
    }

    /// Number of internals in the groups selected by `scope` and `kind`.
    pub fn n_internals_in(&self, scope: Scope<'_>, kind: InternalKind) -> Result<usize> {
        Ok(self
            .select_groups(scope, kind)?
            .iter()
            .filter_map(|id| self.groups.get(id))
            .map(InternalGroup::n_internals)
            .sum())
    }

    /// A cursor over the selected internals. The cursor snapshots the current
    /// contents; later modifications of `self` are not visible through it.
    pub fn iter_in(&self, scope: Scope<'_>, kind: InternalKind) -> Result<InternalGroupIterator<T>> {
        let ids = self.select_groups(scope, kind)?;
        Ok(InternalGroupIterator::new(
            Arc::clone(&self.molinfo),
            Arc::clone(&self.groups),
            ids,
        ))
    }

    // Whole-molecule shorthands. These cannot fail.

    #[inline]
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    /// Total number of internals.
    pub fn n_internals(&self) -> usize {
        self.groups.values().map(InternalGroup::n_internals).sum()
    }

    pub fn n_intra_internals(&self) -> usize {
        self.groups.values().map(InternalGroup::n_intra_internals).sum()
    }

    pub fn n_inter_internals(&self) -> usize {
        self.groups.values().map(InternalGroup::n_inter_internals).sum()
    }

    /// IDs of every group in ascending order.
    pub fn group_ids(&self) -> Vec<GroupId> {
        self.groups.keys().copied().collect()
    }

    pub fn intra_group_ids(&self) -> Vec<GroupId> {
        self.filtered_ids(InternalKind::Intra)
    }

    pub fn inter_group_ids(&self) -> Vec<GroupId> {
        self.filtered_ids(InternalKind::Inter)
    }

    fn filtered_ids(&self, kind: InternalKind) -> Vec<GroupId> {
        self.groups
            .iter()
            .filter(|(_, g)| kind.accepts(g.residue_key()))
            .map(|(id, _)| *id)
            .collect()
    }

    /// A snapshot cursor over every internal.
    pub fn internals(&self) -> InternalGroupIterator<T> {
        InternalGroupIterator::new(
            Arc::clone(&self.molinfo),
            Arc::clone(&self.groups),
            self.group_ids(),
        )
    }

    pub fn intra_internals(&self) -> InternalGroupIterator<T> {
        InternalGroupIterator::new(
            Arc::clone(&self.molinfo),
            Arc::clone(&self.groups),
            self.intra_group_ids(),
        )
    }

    pub fn inter_internals(&self) -> InternalGroupIterator<T> {
        InternalGroupIterator::new(
            Arc::clone(&self.molinfo),
            Arc::clone(&self.groups),
            self.inter_group_ids(),
        )
    }

    // Residue, pair and residue-set shorthands.

    pub fn n_internals_in_residue(&self, resnum: ResNum) -> Result<usize> {
        self.n_internals_in(Scope::Residue(resnum), InternalKind::All)
    }

    pub fn n_intra_internals_in_residue(&self, resnum: ResNum) -> Result<usize> {
        self.n_internals_in(Scope::Residue(resnum), InternalKind::Intra)
    }

    pub fn n_inter_internals_in_residue(&self, resnum: ResNum) -> Result<usize> {
        self.n_internals_in(Scope::Residue(resnum), InternalKind::Inter)
    }

    /// Number of internals spanning both `r0` and `r1`.
    pub fn n_internals_between(&self, r0: ResNum, r1: ResNum) -> Result<usize> {
        self.n_internals_in(Scope::Pair(r0, r1), InternalKind::All)
    }

    pub fn n_internals_common(&self, resnums: &[ResNum]) -> Result<usize> {
        self.n_internals_in(Scope::Common(resnums), InternalKind::All)
    }

    pub fn group_ids_in_residue(&self, resnum: ResNum) -> Result<Vec<GroupId>> {
        self.select_groups(Scope::Residue(resnum), InternalKind::All)
    }

    pub fn group_ids_between(&self, r0: ResNum, r1: ResNum) -> Result<Vec<GroupId>> {
        self.select_groups(Scope::Pair(r0, r1), InternalKind::All)
    }

    /// Groups whose residue set is a superset of `resnums`. This scans every
    /// group touching the first residue.
    pub fn common_groups(&self, resnums: &[ResNum]) -> Result<Vec<GroupId>> {
        self.select_groups(Scope::Common(resnums), InternalKind::All)
    }

    pub fn internals_in_residue(&self, resnum: ResNum) -> Result<InternalGroupIterator<T>> {
        self.iter_in(Scope::Residue(resnum), InternalKind::All)
    }

    pub fn intra_internals_in_residue(&self, resnum: ResNum) -> Result<InternalGroupIterator<T>> {
        self.iter_in(Scope::Residue(resnum), InternalKind::Intra)
    }

    pub fn inter_internals_in_residue(&self, resnum: ResNum) -> Result<InternalGroupIterator<T>> {
        self.iter_in(Scope::Residue(resnum), InternalKind::Inter)
    }

    pub fn internals_between(&self, r0: ResNum, r1: ResNum) -> Result<InternalGroupIterator<T>> {
        self.iter_in(Scope::Pair(r0, r1), InternalKind::All)
    }

    /// A cursor over internals whose residues include all of `resnums`.
    pub fn internals_common(&self, resnums: &[ResNum]) -> Result<InternalGroupIterator<T>> {
        self.iter_in(Scope::Common(resnums), InternalKind::All)
    }

    // ---------------------------------------------------------------------
    // Extraction
    // ---------------------------------------------------------------------

    /// A new index holding only the groups that touch `resnum`.
    ///
    /// Group IDs and the next-unassigned-ID counter are preserved, so handles
    /// taken from the extract still make sense against `self`. The result
    /// shares no mutable state with `self`.
    pub fn extract_residue(&self, resnum: ResNum) -> Result<Self> {
        let ids = self.select_groups(Scope::Residue(resnum), InternalKind::All)?;

        let mut groups = GroupMap::new();
        let mut resid_to_groupid = HashMap::new();
        let mut resnum_to_groupids: HashMap<ResNum, BTreeSet<GroupId>> = HashMap::new();
        for id in ids {
            let Some(group) = self.groups.get(&id) else {
                continue;
            };
            let key = *group.residue_key();
            resid_to_groupid.insert(key, id);
            for r in key.unique_resnums() {
                resnum_to_groupids.entry(r).or_default().insert(id);
            }
            groups.insert(id, group.clone());
        }

        Ok(Self {
            molinfo: Arc::clone(&self.molinfo),
            groups: Arc::new(groups),
            resid_to_groupid,
            resnum_to_groupids,
            next_group_id: self.next_group_id,
            stamp: IdTriple::new(self.molinfo.id_generator()),
        })
    }

    /// Verifies that every cross-reference agrees with the group map.
    pub fn check_invariants(&self) -> Result<()> {
        let bug = |msg: String| Err(TopologyError::ProgramBug(msg));

        if self.resid_to_groupid.len() != self.groups.len() {
            return bug(format!(
                "{} residue keys for {} groups",
                self.resid_to_groupid.len(),
                self.groups.len()
            ));
        }
        for (&id, group) in self.groups.iter() {
            group.check_invariants()?;
            if group.is_empty() {
                return bug(format!("group {id:?} is empty"));
            }
            if id.0 >= self.next_group_id {
                return bug(format!("group {id:?} was never allocated"));
            }
            if self.resid_to_groupid.get(group.residue_key()) != Some(&id) {
                return bug(format!("group {id:?} is missing from the residue-key index"));
            }
            for r in group.residue_key().unique_resnums() {
                if !self.resnum_to_groupids.get(&r).is_some_and(|s| s.contains(&id)) {
                    return bug(format!("group {id:?} is missing from residue {r:?}"));
                }
            }
        }
        for (r, ids) in &self.resnum_to_groupids {
            if ids.is_empty() {
                return bug(format!("residue {r:?} has an empty group set"));
            }
            for id in ids {
                if !self.groups.get(id).is_some_and(|g| g.residue_key().contains(*r)) {
                    return bug(format!("residue {r:?} references stale group {id:?}"));
                }
            }
        }
        Ok(())
    }
}

impl InternalInfo<Bond> {
    /// Indexes every bond recorded in `connectivity`.
    #[instrument(skip_all, name = "bonds_from_connectivity")]
    pub fn from_connectivity(connectivity: &ConnectivityBase) -> Result<Self> {
        let mut info = Self::new(Arc::clone(connectivity.molecule_info()));
        for bond in connectivity.bonds() {
            info.add(bond)?;
        }
        Ok(info)
    }
}

impl InternalInfo<Angle> {
    /// Indexes every angle a-b-c where a-b and b-c are bonded.
    #[instrument(skip_all, name = "angles_from_connectivity")]
    pub fn from_connectivity(connectivity: &ConnectivityBase) -> Result<Self> {
        let mut info = Self::new(Arc::clone(connectivity.molecule_info()));
        for angle in connectivity.angles() {
            info.add(angle)?;
        }
        Ok(info)
    }
}

impl InternalInfo<Dihedral> {
    /// Indexes every dihedral along a bonded path a-b-c-d.
    #[instrument(skip_all, name = "dihedrals_from_connectivity")]
    pub fn from_connectivity(connectivity: &ConnectivityBase) -> Result<Self> {
        let mut info = Self::new(Arc::clone(connectivity.molecule_info()));
        for dihedral in connectivity.dihedrals() {
            info.add(dihedral)?;
        }
        Ok(info)
    }
}
