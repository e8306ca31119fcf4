//! # moltopo
//!
//! Bonded-topology indexing for molecules and maximum-common-substructure
//! matching between them.
//!
//! ## Architecture
//!
//! - [`core`]: **The Foundation.** Atom and residue identity, element data, the
//!   `InternalInfo` indexes of bonds, angles and dihedrals grouped by residue
//!   combination, the `Connectivity` adjacency graph with its editor, version
//!   stamps and binary persistence.
//!
//! - [`engine`]: **The Search Machinery.** Matching configuration, atom
//!   pre-matchers, labelled search graphs and the common-subgraph search.
//!
//! - [`workflows`]: **The Public API.** `find_mcs`, which runs a complete match
//!   from two molecule views to an atom mapping.
//!
//! All containers assume one writer at a time. Only the version counters are
//! safe to share across threads.

pub mod core;
pub mod engine;
pub mod workflows;
