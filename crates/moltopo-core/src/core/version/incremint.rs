use std::sync::atomic::{AtomicU64, Ordering};

/// A lock-free, monotonically increasing counter.
///
/// Several threads may call [`Incremint::increment`] on the same instance and
/// each is guaranteed to receive a distinct value.
#[derive(Debug, Default)]
pub struct Incremint {
    value: AtomicU64,
}

impl Incremint {
    pub fn new(start: u64) -> Self {
        Self {
            value: AtomicU64::new(start),
        }
    }

    /// Increments the counter and returns the new value.
    #[inline]
    pub fn increment(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// The most recently handed-out value.
    #[inline]
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}
