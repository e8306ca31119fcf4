//! # Version Module
//!
//! Thread-safe version stamps used to mark mutable topology objects so that
//! caches held elsewhere can detect staleness.
//!
//! - [`incremint`] - the lock-free counter every stamp draws its numbers from
//! - [`stamp`] - [`Version`] values and the [`MajorMinorVersion`], [`IdPair`]
//!   and [`IdTriple`] stamps built from counters
//!
//! Generators are always passed in explicitly; nothing in this module keeps
//! process-wide state.

pub mod incremint;
pub mod stamp;

pub use incremint::Incremint;
pub use stamp::{IdPair, IdTriple, MajorMinorVersion, Version};
