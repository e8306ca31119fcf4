use super::models::ids::{AtomIdx, GroupId, ResIdx, ResNum};
use thiserror::Error;

/// Errors raised by the topology containers when they are misused.
///
/// Every variant describes a programmer or input error detected at the point
/// of misuse. None of them are transient, so nothing in the library retries
/// an operation that produced one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Residue with number {0:?} is not part of this molecule")]
    MissingResidue(ResNum),

    #[error("Residue index {0:?} is not part of this molecule")]
    MissingResidueIndex(ResIdx),

    #[error("Atom {0:?} is not part of this molecule")]
    MissingAtom(AtomIdx),

    #[error("No group with ID {0:?} exists")]
    MissingGroup(GroupId),

    #[error("Internal {0} is not stored in this index")]
    MissingInternal(String),

    #[error("Invalid {what} index {index}: valid range is [0, {count})")]
    InvalidIndex {
        what: &'static str,
        index: i64,
        count: usize,
    },

    #[error("Invalid internal {internal}: {reason}")]
    InvalidInternal { internal: String, reason: String },

    #[error("Residue number {0:?} is used more than once")]
    DuplicateResidue(ResNum),

    #[error("Atoms {0:?} and {1:?} are not bonded")]
    NotBonded(AtomIdx, AtomIdx),

    #[error("Property '{property}' has {found} entries but the molecule has {expected} atoms")]
    PropertyLength {
        property: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Cannot split the molecule along bond {0:?}-{1:?} because it is part of a ring")]
    RingBond(AtomIdx, AtomIdx),

    #[error("Internal logic error (this is a bug): {0}")]
    ProgramBug(String),
}

pub type Result<T> = std::result::Result<T, TopologyError>;
