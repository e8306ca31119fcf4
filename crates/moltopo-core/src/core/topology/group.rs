use crate::core::error::{Result, TopologyError};
use crate::core::models::ids::Index;
use crate::core::models::internals::{Internal, ResidueKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Dense-indexed storage for all internals that share one residue key.
///
/// Indices are always the contiguous range `[0, n_internals())`. Removing an
/// internal shifts every internal with a higher index down by one, which is
/// linear in the group size; groups hold one residue combination's worth of
/// internals, so they stay small.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct InternalGroup<T: Internal> {
    residue_key: ResidueKey,
    atomid_to_index: HashMap<T::Key, Index>,
    index_to_atomid: Vec<T::Key>,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: Internal> InternalGroup<T> {
    /// An empty group for internals with the given residue key.
    pub fn new(residue_key: ResidueKey) -> Self {
        Self {
            residue_key,
            atomid_to_index: HashMap::new(),
            index_to_atomid: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// The residues every internal in this group spans.
    #[inline]
    pub fn residue_key(&self) -> &ResidueKey {
        &self.residue_key
    }

    /// Whether the group's internals all lie within a single residue.
    #[inline]
    pub fn is_intra(&self) -> bool {
        self.residue_key.is_intra()
    }

    /// Adds `internal`, returning its index. If it is already present the
    /// existing index is returned and nothing changes.
    pub fn add(&mut self, internal: &T) -> Index {
        let key = internal.key();
        if let Some(&index) = self.atomid_to_index.get(&key) {
            return index;
        }
        let index = Index(self.index_to_atomid.len() as u32);
        self.index_to_atomid.push(key);
        self.atomid_to_index.insert(key, index);
        index
    }

    /// Removes `internal` if present, returning the index it had.
    pub fn remove(&mut self, internal: &T) -> Option<Index> {
        let index = self.atomid_to_index.remove(&internal.key())?;
        self.index_to_atomid.remove(index.value());
        self.reindex_from(index.value());
        Some(index)
    }

    /// Removes the internal at `index`, shifting later internals down.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn remove_index(&mut self, index: Index) -> Result<T> {
        let i = index.map(self.index_to_atomid.len())?;
        let key = self.index_to_atomid.remove(i);
        self.atomid_to_index.remove(&key);
        self.reindex_from(i);
        Ok(T::from_key(key))
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, key) in self.index_to_atomid.iter().enumerate().skip(start) {
            self.atomid_to_index.insert(*key, Index(i as u32));
        }
    }

    /// The internal at `index`.
    pub fn internal(&self, index: Index) -> Result<T> {
        let i = index.map(self.index_to_atomid.len())?;
        Ok(T::from_key(self.index_to_atomid[i]))
    }

    /// Rebuilds the internal described by `key` in its canonical orientation.
    ///
    /// This is a pure function of the key and does not require the internal
    /// to be stored in this group.
    pub fn internal_for(&self, key: T::Key) -> T {
        T::from_key(key)
    }

    /// The index of `internal`, if stored here.
    pub fn index_of(&self, internal: &T) -> Option<Index> {
        self.atomid_to_index.get(&internal.key()).copied()
    }

    /// Like [`index_of`](Self::index_of) but reports absence as an error.
    pub fn find(&self, internal: &T) -> Result<Index> {
        self.index_of(internal)
            .ok_or_else(|| TopologyError::MissingInternal(internal.to_string()))
    }

    #[inline]
    pub fn contains(&self, internal: &T) -> bool {
        self.atomid_to_index.contains_key(&internal.key())
    }

    #[inline]
    pub fn contains_index(&self, index: Index) -> bool {
        index.value() < self.index_to_atomid.len()
    }

    /// Number of stored internals.
    #[inline]
    pub fn n_internals(&self) -> usize {
        self.index_to_atomid.len()
    }

    #[inline]
    pub fn n_inter_internals(&self) -> usize {
        if self.is_intra() { 0 } else { self.n_internals() }
    }

    #[inline]
    pub fn n_intra_internals(&self) -> usize {
        if self.is_intra() { self.n_internals() } else { 0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index_to_atomid.is_empty()
    }

    /// Iterates the stored internals in index order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.index_to_atomid.iter().map(|&key| T::from_key(key))
    }

    /// Iterates `(index, internal)` pairs in index order.
    pub fn indexed(&self) -> impl Iterator<Item = (Index, T)> + '_ {
        self.index_to_atomid
            .iter()
            .enumerate()
            .map(|(i, &key)| (Index(i as u32), T::from_key(key)))
    }

    /// Checks that both maps describe the same dense bijection.
    pub fn check_invariants(&self) -> Result<()> {
        if self.atomid_to_index.len() != self.index_to_atomid.len() {
            return Err(TopologyError::ProgramBug(format!(
                "group maps disagree in size ({} vs {})",
                self.atomid_to_index.len(),
                self.index_to_atomid.len()
            )));
        }
        for (i, key) in self.index_to_atomid.iter().enumerate() {
            if self.atomid_to_index.get(key) != Some(&Index(i as u32)) {
                return Err(TopologyError::ProgramBug(format!(
                    "group index {i} is not mapped back to its key"
                )));
            }
        }
        Ok(())
    }
}
