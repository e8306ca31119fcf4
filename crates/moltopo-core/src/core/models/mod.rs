//! # Core Models Module
//!
//! Data structures describing a molecule as the topology engine sees it:
//! dense atom and residue indices, the residue layout, per-atom properties,
//! and the bonded internals (bonds, angles, dihedrals, impropers) that the
//! topology indexes store.
//!
//! ## Key Components
//!
//! - [`ids`] - Index and handle types (`AtomIdx`, `ResIdx`, `ResNum`, `GroupId`, ...)
//! - [`element`] - Element data used to classify atoms
//! - [`molecule_info`] - Atom/residue layout shared by every container of one molecule
//! - [`molecule`] - The property bag (elements, masses, coordinates, connectivity)
//! - [`selection`] - Per-atom selection masks
//! - [`internals`] - The `Internal` trait and its four implementations
//!
//! ## Usage
//!
//! ```ignore
//! use moltopo::core::models::molecule_info::MoleculeInfo;
//!
//! let info = MoleculeInfo::builder()
//!     .start_residue(1, "LIG")?
//!     .add_atoms(&["C1", "C2", "O3"])?
//!     .build();
//! ```

pub mod element;
pub mod ids;
pub mod internals;
pub mod molecule;
pub mod molecule_info;
pub mod selection;
