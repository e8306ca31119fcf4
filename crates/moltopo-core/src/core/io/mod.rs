//! Binary persistence for the topology containers.
//!
//! Every stream starts with a magic tag and a format version so that a
//! stream written for one container type, or by a newer format, is refused
//! instead of misread.

pub mod stream;
