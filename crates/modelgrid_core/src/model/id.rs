//! Identifier allocation for model instances.
//!
//! # Responsibility
//! - Issue process-unique, strictly increasing identifiers.
//! - Absorb externally issued identifiers so later allocations stay unique.
//!
//! # Invariants
//! - `next` never returns the same value twice for one allocator.
//! - `observe` never moves the counter backwards.

use super::ModelId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Allocator handing out stable item identifiers.
///
/// One allocator is shared (via `Arc`) by everything that constructs items
/// for the same store: provider new-item factories, import paths, fixtures.
/// Identifiers start at 1; 0 is never issued.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicU64,
}

impl IdAllocator {
    /// Creates an allocator whose first issued identifier is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator that will issue identifiers greater than `last`.
    pub fn starting_after(last: ModelId) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Issues the next identifier.
    pub fn next(&self) -> ModelId {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Records an identifier issued elsewhere (a re-hydrated row, an import)
    /// so future `next` calls stay above it.
    pub fn observe(&self, existing: ModelId) {
        self.last.fetch_max(existing, Ordering::Relaxed);
    }

    /// Highest identifier issued or observed so far.
    pub fn high_water_mark(&self) -> ModelId {
        self.last.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::IdAllocator;

    #[test]
    fn next_is_strictly_increasing() {
        let allocator = IdAllocator::new();
        let mut previous = 0;
        for _ in 0..100 {
            let id = allocator.next();
            assert!(id > previous);
            previous = id;
        }
    }

    #[test]
    fn observe_advances_the_counter() {
        let allocator = IdAllocator::new();
        allocator.observe(41);
        assert_eq!(allocator.next(), 42);
    }

    #[test]
    fn observe_never_moves_backwards() {
        let allocator = IdAllocator::starting_after(10);
        allocator.observe(3);
        assert_eq!(allocator.next(), 11);
    }
}
