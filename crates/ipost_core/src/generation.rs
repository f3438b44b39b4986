//! Monotonic tags for post-list requests.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tag attached to each post-list request. Later requests compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Wraps a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Hands out strictly increasing generations, starting at 1.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    last: AtomicU64,
}

impl GenerationCounter {
    /// Creates a counter that has issued nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next generation.
    pub fn next(&self) -> Generation {
        Generation(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The most recently issued generation.
    #[must_use]
    pub fn latest(&self) -> Option<Generation> {
        match self.last.load(Ordering::SeqCst) {
            0 => None,
            n => Some(Generation(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_at_one_and_increases() {
        let counter = GenerationCounter::new();
        assert_eq!(counter.latest(), None);
        let a = counter.next();
        let b = counter.next();
        assert_eq!(a, Generation::new(1));
        assert!(b > a);
        assert_eq!(counter.latest(), Some(b));
        assert_eq!(b.to_string(), "gen#2");
    }

    #[test]
    fn unique_across_threads() {
        let counter = Arc::new(GenerationCounter::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || (0..100).map(|_| counter.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<_> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(all.last().copied(), Some(Generation::new(400)));
    }
}
