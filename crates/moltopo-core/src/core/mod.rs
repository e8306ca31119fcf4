//! # Core Module
//!
//! The data model and the topology containers.
//!
//! - **Molecule description** ([`models`]) - indices, element data, the
//!   residue layout, selections and bonded internals
//! - **Version stamps** ([`version`]) - counters that let caches detect
//!   stale topology objects
//! - **Topology indexes** ([`topology`]) - internals grouped by residue
//!   combination and the adjacency graph
//! - **Persistence** ([`io`]) - tagged binary streams for every container
//!
//! Nothing in this module spawns threads or blocks; every operation runs to
//! completion on the calling thread.

pub mod error;
pub mod io;
pub mod models;
pub mod topology;
pub mod version;
