use super::incremint::Incremint;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A plain major/minor version value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A [`Version`] together with the counters it was drawn from.
///
/// Clones share the counters, so two clones that are incremented
/// independently still end up with distinct versions. Bumping the major
/// number starts a fresh minor counter that is shared only by stamps holding
/// that major number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Version", into = "Version")]
pub struct MajorMinorVersion {
    major_counter: Arc<Incremint>,
    minor_counter: Arc<Incremint>,
    version: Version,
}

impl MajorMinorVersion {
    pub fn new() -> Self {
        Self::from(Version::default())
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    #[inline]
    pub fn major(&self) -> u64 {
        self.version.major
    }

    #[inline]
    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    pub fn increment_major(&mut self) -> Version {
        let major = self.major_counter.increment();
        self.minor_counter = Arc::new(Incremint::new(0));
        self.version = Version::new(major, 0);
        self.version
    }

    pub fn increment_minor(&mut self) -> Version {
        self.version.minor = self.minor_counter.increment();
        self.version
    }
}

impl Default for MajorMinorVersion {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Version> for MajorMinorVersion {
    // Counters resume from the stored values so later increments stay monotonic.
    fn from(version: Version) -> Self {
        Self {
            major_counter: Arc::new(Incremint::new(version.major)),
            minor_counter: Arc::new(Incremint::new(version.minor)),
            version,
        }
    }
}

impl From<MajorMinorVersion> for Version {
    fn from(stamp: MajorMinorVersion) -> Self {
        stamp.version
    }
}

impl PartialEq for MajorMinorVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for MajorMinorVersion {}

impl PartialOrd for MajorMinorVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MajorMinorVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

#[derive(Serialize, Deserialize)]
struct IdPairValue {
    id: u64,
    version: u64,
}

/// An object identity plus a single version number.
///
/// The ID is drawn from an injected generator, so two objects stamped from the
/// same generator never share an ID. The version counter is shared between
/// clones that carry the same ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "IdPairValue", into = "IdPairValue")]
pub struct IdPair {
    id: u64,
    version: u64,
    version_counter: Arc<Incremint>,
}

impl IdPair {
    pub fn new(generator: &Incremint) -> Self {
        Self {
            id: generator.increment(),
            version: 0,
            version_counter: Arc::new(Incremint::new(0)),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn increment(&mut self) -> u64 {
        self.version = self.version_counter.increment();
        self.version
    }

    /// Gives this object a brand new identity, restarting its version history.
    pub fn renew_id(&mut self, generator: &Incremint) {
        *self = Self::new(generator);
    }
}

impl From<IdPairValue> for IdPair {
    fn from(value: IdPairValue) -> Self {
        Self {
            id: value.id,
            version: value.version,
            version_counter: Arc::new(Incremint::new(value.version)),
        }
    }
}

impl From<IdPair> for IdPairValue {
    fn from(pair: IdPair) -> Self {
        Self {
            id: pair.id,
            version: pair.version,
        }
    }
}

impl PartialEq for IdPair {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.version == other.version
    }
}

impl Eq for IdPair {}

/// An object identity plus a major/minor version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTriple {
    id: u64,
    version: MajorMinorVersion,
}

impl IdTriple {
    pub fn new(generator: &Incremint) -> Self {
        Self {
            id: generator.increment(),
            version: MajorMinorVersion::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version.version()
    }

    pub fn increment_major(&mut self) -> Version {
        self.version.increment_major()
    }

    pub fn increment_minor(&mut self) -> Version {
        self.version.increment_minor()
    }

    pub fn renew_id(&mut self, generator: &Incremint) {
        *self = Self::new(generator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod major_minor {
        use super::*;

        #[test]
        fn increment_major_resets_minor() {
            let mut stamp = MajorMinorVersion::new();
            stamp.increment_minor();
            stamp.increment_minor();
            assert_eq!(stamp.version(), Version::new(0, 2));

            assert_eq!(stamp.increment_major(), Version::new(1, 0));
            assert_eq!(stamp.increment_minor(), Version::new(1, 1));
        }

        #[test]
        fn clones_draw_distinct_versions_from_shared_counters() {
            let mut a = MajorMinorVersion::new();
            a.increment_major();
            let mut b = a.clone();

            let va = a.increment_minor();
            let vb = b.increment_minor();
            assert_ne!(va, vb);

            let ma = a.increment_major();
            let mb = b.increment_major();
            assert_ne!(ma.major, mb.major);
        }

        #[test]
        fn restored_stamp_keeps_counting_upwards() {
            let mut restored = MajorMinorVersion::from(Version::new(7, 3));
            assert_eq!(restored.increment_minor(), Version::new(7, 4));
            assert_eq!(restored.increment_major(), Version::new(8, 0));
        }

        #[test]
        fn ordering_follows_version_values() {
            let low = MajorMinorVersion::from(Version::new(1, 9));
            let high = MajorMinorVersion::from(Version::new(2, 0));
            assert!(low < high);
            assert_eq!(low, MajorMinorVersion::from(Version::new(1, 9)));
        }
    }

    mod id_stamps {
        use super::*;

        #[test]
        fn ids_from_one_generator_are_unique() {
            let generator = Incremint::default();
            let a = IdPair::new(&generator);
            let b = IdPair::new(&generator);
            assert_ne!(a.id(), b.id());
            assert_eq!(a.version(), 0);
        }

        #[test]
        fn separate_generators_may_reuse_ids() {
            let a = IdPair::new(&Incremint::default());
            let b = IdPair::new(&Incremint::default());
            assert_eq!(a.id(), b.id());
        }

        #[test]
        fn id_pair_clones_share_version_counter() {
            let generator = Incremint::default();
            let mut a = IdPair::new(&generator);
            let mut b = a.clone();
            assert_eq!(a.increment(), 1);
            assert_eq!(b.increment(), 2);
            assert_ne!(a, b);
        }

        #[test]
        fn renew_id_restarts_version_history() {
            let generator = Incremint::default();
            let mut pair = IdPair::new(&generator);
            pair.increment();
            let old_id = pair.id();
            pair.renew_id(&generator);
            assert_ne!(pair.id(), old_id);
            assert_eq!(pair.version(), 0);
        }

        #[test]
        fn id_triple_tracks_major_and_minor() {
            let generator = Incremint::default();
            let mut triple = IdTriple::new(&generator);
            triple.increment_minor();
            assert_eq!(triple.version(), Version::new(0, 1));
            triple.increment_major();
            assert_eq!(triple.version(), Version::new(1, 0));
        }
    }
}
