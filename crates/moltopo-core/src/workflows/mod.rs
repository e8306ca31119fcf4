//! # Workflows Module
//!
//! Top-level entry points that tie the topology containers and the engine
//! together.
//!
//! - **Substructure matching** ([`mcs`]) - [`mcs::find_mcs`] maps the atoms of
//!   one molecule onto another, for example to set up a relative free-energy
//!   perturbation between two ligands.

pub mod mcs;
