use crate::core::error::TopologyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense, 0-based index of an atom within one `MoleculeInfo`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct AtomIdx(pub u32);

/// Dense, 0-based index of a residue within one `MoleculeInfo`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ResIdx(pub u32);

/// Residue number as assigned by the molecule's author. Unique per molecule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ResNum(pub i32);

/// Identifier of one `InternalGroup` inside an `InternalInfo`.
///
/// Group IDs are handed out in strictly increasing order and are never reused
/// by the index that allocated them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GroupId(pub u32);

/// Dense position of an internal inside its group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Index(pub u32);

/// Stable handle for one stored internal: the group it lives in plus its
/// position inside that group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupIndexId {
    pub group: GroupId,
    pub index: Index,
}

impl GroupIndexId {
    pub fn new(group: GroupId, index: Index) -> Self {
        Self { group, index }
    }
}

fn map_index(what: &'static str, index: i64, count: usize) -> Result<usize, TopologyError> {
    // Negative indices count back from the end.
    let resolved = if index < 0 { index + count as i64 } else { index };
    if resolved < 0 || resolved >= count as i64 {
        return Err(TopologyError::InvalidIndex { what, index, count });
    }
    Ok(resolved as usize)
}

impl AtomIdx {
    pub fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    #[inline]
    pub fn value(&self) -> usize {
        self.0 as usize
    }

    /// Bounds-checks this index against `n_atoms` and returns it as a `usize`.
    pub fn map(&self, n_atoms: usize) -> Result<usize, TopologyError> {
        map_index("atom", self.0 as i64, n_atoms)
    }

    /// Resolves a signed (Python-style) index against `n_atoms`.
    pub fn from_signed(index: i64, n_atoms: usize) -> Result<Self, TopologyError> {
        map_index("atom", index, n_atoms).map(Self::new)
    }
}

impl ResIdx {
    pub fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    #[inline]
    pub fn value(&self) -> usize {
        self.0 as usize
    }

    pub fn map(&self, n_residues: usize) -> Result<usize, TopologyError> {
        map_index("residue", self.0 as i64, n_residues)
    }
}

impl Index {
    #[inline]
    pub fn value(&self) -> usize {
        self.0 as usize
    }

    pub fn map(&self, count: usize) -> Result<usize, TopologyError> {
        map_index("internal", self.0 as i64, count)
    }
}

impl fmt::Display for AtomIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AtomIdx({})", self.0)
    }
}

impl fmt::Display for ResNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResNum({})", self.0)
    }
}

impl fmt::Display for GroupIndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group.0, self.index.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_idx_map_accepts_in_range_indices() {
        assert_eq!(AtomIdx(0).map(3).unwrap(), 0);
        assert_eq!(AtomIdx(2).map(3).unwrap(), 2);
    }

    #[test]
    fn atom_idx_map_rejects_out_of_range_indices() {
        let err = AtomIdx(3).map(3).unwrap_err();
        assert_eq!(
            err,
            TopologyError::InvalidIndex {
                what: "atom",
                index: 3,
                count: 3
            }
        );
        assert!(AtomIdx(0).map(0).is_err());
    }

    #[test]
    fn from_signed_resolves_negative_indices_from_the_end() {
        assert_eq!(AtomIdx::from_signed(-1, 4).unwrap(), AtomIdx(3));
        assert_eq!(AtomIdx::from_signed(-4, 4).unwrap(), AtomIdx(0));
        assert!(AtomIdx::from_signed(-5, 4).is_err());
    }

    #[test]
    fn group_index_id_orders_by_group_then_index() {
        let a = GroupIndexId::new(GroupId(1), Index(5));
        let b = GroupIndexId::new(GroupId(2), Index(0));
        assert!(a < b);
        assert_eq!(a.to_string(), "1:5");
    }
}
