//! # Topology Module
//!
//! Indexes of a molecule's bonded structure.
//!
//! - [`group`] - [`InternalGroup`], dense storage for the internals sharing
//!   one residue combination
//! - [`iterator`] - [`InternalGroupIterator`], a snapshot cursor over groups
//! - [`info`] - [`InternalInfo`], the per-molecule index with queries by
//!   residue, residue pair and residue set
//! - [`connectivity`] / [`editor`] - the atom and residue adjacency graph as an
//!   immutable snapshot and its editor
//! - [`hunter`] - bond perception from coordinates
//!
//! The containers assume a single writer at a time and do no locking of
//! their own.

pub mod connectivity;
pub mod editor;
pub mod group;
pub mod hunter;
pub mod info;
pub mod iterator;

pub use connectivity::{Connectivity, ConnectivityBase};
pub use editor::ConnectivityEditor;
pub use group::InternalGroup;
pub use hunter::CovalentBondHunter;
pub use info::{InternalInfo, InternalKind, Scope};
pub use iterator::InternalGroupIterator;
