use thiserror::Error;

use crate::core::error::TopologyError;

#[derive(Debug, Error)]
pub enum McsError {
    #[error("Topology query failed: {source}")]
    Topology {
        #[from]
        source: TopologyError,
    },

    #[error("Molecule {molecule} has no '{property}' property and it cannot be derived")]
    MissingProperty {
        molecule: usize,
        property: &'static str,
    },

    #[error("Atom matcher returned an unusable mapping: {message}")]
    Matcher { message: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
