//! Identity stack for cycle detection.
//!
//! Holds the identities of the containers currently being expanded, in
//! entry order. Every `push` must be matched by a `pop` on every exit path,
//! otherwise siblings of the leaked entry are reported as recursion.

/// Stack of container identities for one top-level encode.
#[derive(Debug, Default)]
pub struct CycleGuard {
    stack: Vec<usize>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is currently being expanded.
    #[inline]
    pub fn contains(&self, id: usize) -> bool {
        self.stack.contains(&id)
    }

    #[inline]
    pub fn push(&mut self, id: usize) {
        self.stack.push(id);
    }

    /// Pop the innermost identity, which must be `id`.
    #[inline]
    pub fn pop(&mut self, id: usize) {
        let popped = self.stack.pop();
        debug_assert_eq!(popped, Some(id), "cycle guard push/pop mismatch");
    }

    /// Number of containers being expanded.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut guard = CycleGuard::new();
        guard.push(1);
        guard.push(2);
        assert!(guard.contains(1));
        assert!(guard.contains(2));
        assert_eq!(guard.depth(), 2);

        guard.pop(2);
        assert!(!guard.contains(2));
        guard.pop(1);
        assert!(guard.is_empty());
    }

    #[test]
    #[should_panic(expected = "cycle guard push/pop mismatch")]
    #[cfg(debug_assertions)]
    fn test_mismatched_pop_panics_in_debug() {
        let mut guard = CycleGuard::new();
        guard.push(1);
        guard.pop(2);
    }

    #[test]
    fn test_clear() {
        let mut guard = CycleGuard::new();
        guard.push(7);
        guard.clear();
        assert!(!guard.contains(7));
    }
}
