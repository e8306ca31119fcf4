use super::ids::{AtomIdx, ResNum};
use super::molecule_info::MoleculeInfo;
use crate::core::error::{Result, TopologyError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A bonded internal coordinate (bond, angle, dihedral or improper) made of
/// an ordered tuple of atoms.
///
/// Two internals are equal when their atom keys are equal. The key is the
/// canonical orientation of the tuple under the permutation rules of the
/// concrete internal type, so e.g. `Bond::new(a, b) == Bond::new(b, a)`.
pub trait Internal:
    Copy + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const ARITY: usize;
    const NAME: &'static str;

    /// Canonical atom key used for storage and lookup.
    type Key: Copy
        + Eq
        + Hash
        + Ord
        + fmt::Debug
        + Send
        + Sync
        + Serialize
        + DeserializeOwned
        + 'static;

    fn atoms(&self) -> &[AtomIdx];
    fn key(&self) -> Self::Key;
    fn from_key(key: Self::Key) -> Self;

    fn involves(&self, atom: AtomIdx) -> bool {
        self.atoms().contains(&atom)
    }

    /// Rejects tuples that reference the same atom more than once.
    fn validate(&self) -> Result<()> {
        let atoms = self.atoms();
        for (i, a) in atoms.iter().enumerate() {
            if atoms[i + 1..].contains(a) {
                return Err(TopologyError::InvalidInternal {
                    internal: self.to_string(),
                    reason: format!("atom {a} appears more than once"),
                });
            }
        }
        Ok(())
    }

    /// Computes the residue-combination key, checking that every atom exists.
    fn residue_key(&self, info: &MoleculeInfo) -> Result<ResidueKey> {
        let mut resnums = [ResNum::default(); 4];
        for (slot, &atom) in resnums.iter_mut().zip(self.atoms()) {
            *slot = info.resnum_of(atom)?;
        }
        Ok(ResidueKey::new(&resnums[..Self::ARITY]))
    }
}

/// Sorted multiset of the residue numbers touched by one internal.
///
/// Internals whose atoms span the same multiset of residues share a key and
/// therefore always land in the same group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResidueKey {
    resnums: [ResNum; 4],
    len: u8,
}

impl ResidueKey {
    pub fn new(resnums: &[ResNum]) -> Self {
        debug_assert!(!resnums.is_empty() && resnums.len() <= 4);
        let mut sorted = [ResNum::default(); 4];
        sorted[..resnums.len()].copy_from_slice(resnums);
        sorted[..resnums.len()].sort_unstable();
        Self {
            resnums: sorted,
            len: resnums.len() as u8,
        }
    }

    #[inline]
    pub fn resnums(&self) -> &[ResNum] {
        &self.resnums[..self.len as usize]
    }

    /// True when every atom of the internal lies in one residue.
    #[inline]
    pub fn is_intra(&self) -> bool {
        let r = self.resnums();
        r.first() == r.last()
    }

    #[inline]
    pub fn is_inter(&self) -> bool {
        !self.is_intra()
    }

    pub fn contains(&self, resnum: ResNum) -> bool {
        self.resnums().binary_search(&resnum).is_ok()
    }

    /// Distinct residue numbers, in ascending order.
    pub fn unique_resnums(&self) -> Vec<ResNum> {
        let mut unique = self.resnums().to_vec();
        unique.dedup();
        unique
    }

    /// Whether every residue in `query` is touched by this key.
    pub fn contains_all(&self, query: &[ResNum]) -> bool {
        query.iter().all(|&r| self.contains(r))
    }
}

macro_rules! impl_internal_common {
    ($name:ident, $arity:expr, $label:expr) => {
        impl Internal for $name {
            const ARITY: usize = $arity;
            const NAME: &'static str = $label;
            type Key = [AtomIdx; $arity];

            #[inline]
            fn atoms(&self) -> &[AtomIdx] {
                &self.atoms
            }

            #[inline]
            fn key(&self) -> Self::Key {
                Self::canonical(self.atoms)
            }

            #[inline]
            fn from_key(key: Self::Key) -> Self {
                Self {
                    atoms: Self::canonical(key),
                }
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.key() == other.key()
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.key().hash(state);
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.key().cmp(&other.key())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let atoms: Vec<String> = self.atoms.iter().map(|a| a.0.to_string()).collect();
                write!(f, "{}({})", $label, atoms.join("-"))
            }
        }
    };
}

/// Two bonded atoms. Unordered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bond {
    atoms: [AtomIdx; 2],
}

impl Bond {
    pub fn new(a0: AtomIdx, a1: AtomIdx) -> Self {
        Self { atoms: [a0, a1] }
    }

    fn canonical([a0, a1]: [AtomIdx; 2]) -> [AtomIdx; 2] {
        if a0 <= a1 { [a0, a1] } else { [a1, a0] }
    }

    /// The atom at the other end of the bond from `atom`.
    pub fn partner(&self, atom: AtomIdx) -> Option<AtomIdx> {
        match self.atoms {
            [a0, a1] if a0 == atom => Some(a1),
            [a0, a1] if a1 == atom => Some(a0),
            _ => None,
        }
    }
}

/// Three atoms a-b-c with `b` central. Equal under reversal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Angle {
    atoms: [AtomIdx; 3],
}

impl Angle {
    pub fn new(a0: AtomIdx, a1: AtomIdx, a2: AtomIdx) -> Self {
        Self {
            atoms: [a0, a1, a2],
        }
    }

    fn canonical([a0, a1, a2]: [AtomIdx; 3]) -> [AtomIdx; 3] {
        if a0 <= a2 { [a0, a1, a2] } else { [a2, a1, a0] }
    }

    pub fn central_atom(&self) -> AtomIdx {
        self.atoms[1]
    }
}

/// Four atoms a-b-c-d along a bonded path. Equal under reversal, which swaps
/// both end atoms together with their partners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Dihedral {
    atoms: [AtomIdx; 4],
}

impl Dihedral {
    pub fn new(a0: AtomIdx, a1: AtomIdx, a2: AtomIdx, a3: AtomIdx) -> Self {
        Self {
            atoms: [a0, a1, a2, a3],
        }
    }

    fn canonical([a0, a1, a2, a3]: [AtomIdx; 4]) -> [AtomIdx; 4] {
        if (a0, a1) <= (a3, a2) {
            [a0, a1, a2, a3]
        } else {
            [a3, a2, a1, a0]
        }
    }

    /// The central bond b-c.
    pub fn central_bond(&self) -> Bond {
        Bond::new(self.atoms[1], self.atoms[2])
    }
}

/// Four atoms where the first two are fixed and the last two may be swapped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Improper {
    atoms: [AtomIdx; 4],
}

impl Improper {
    pub fn new(a0: AtomIdx, a1: AtomIdx, a2: AtomIdx, a3: AtomIdx) -> Self {
        Self {
            atoms: [a0, a1, a2, a3],
        }
    }

    fn canonical([a0, a1, a2, a3]: [AtomIdx; 4]) -> [AtomIdx; 4] {
        if a2 <= a3 {
            [a0, a1, a2, a3]
        } else {
            [a0, a1, a3, a2]
        }
    }
}

impl_internal_common!(Bond, 2, "Bond");
impl_internal_common!(Angle, 3, "Angle");
impl_internal_common!(Dihedral, 4, "Dihedral");
impl_internal_common!(Improper, 4, "Improper");
