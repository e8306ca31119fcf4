//! # Engine Module
//!
//! The machinery behind maximum-common-substructure matching.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - time budget and matching policy, built in code or
//!   loaded from TOML
//! - **Pre-matching** ([`matcher`]) - the `AtomMatcher` seam that pins atom pairs before
//!   the search
//! - **Search graphs** ([`graph`]) - molecules reduced to vertex- and edge-labelled graphs
//! - **Search** ([`search`]) - connected common induced subgraph search with a
//!   wall-clock deadline
//! - **Progress Monitoring** ([`progress`]) - phase and improvement callbacks
//! - **Error Handling** ([`error`]) - the `McsError` type
//!
//! The search is single-threaded and synchronous. Its only cancellation lever
//! is the deadline, which is checked between candidate extensions.

pub mod config;
pub mod error;
pub mod graph;
pub mod matcher;
pub mod progress;
pub mod search;
