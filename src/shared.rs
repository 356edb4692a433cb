//! Thread-safe concept memory.
//!
//! [`SharedPatternSpace`] is a cloneable handle around one [`PatternSpace`].
//! Lookups of already-encoded identifiers take the read lock only; a miss
//! upgrades to the write lock and re-checks before inserting, so two threads
//! racing on the same new identifier end up holding the same `Arc<Pattern>`.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::error::ResonanceResult;
use crate::pattern::{Pattern, PatternSpace, PatternSpaceConfig};

/// Cloneable, lock-protected [`PatternSpace`].
#[derive(Clone, Debug, Default)]
pub struct SharedPatternSpace {
    inner: Arc<RwLock<PatternSpace>>,
}

impl SharedPatternSpace {
    /// Wrap a new space built from `config`.
    pub fn new(config: PatternSpaceConfig) -> ResonanceResult<Self> {
        Ok(Self::from_space(PatternSpace::new(config)?))
    }

    /// Wrap an existing space, e.g. one restored from a snapshot.
    pub fn from_space(space: PatternSpace) -> Self {
        Self {
            inner: Arc::new(RwLock::new(space)),
        }
    }

    /// Encode `id`, sharing the stored pattern with every other caller.
    pub fn encode(&self, id: &str) -> Arc<Pattern> {
        if let Some(hit) = self.inner.read().get(id) {
            return hit;
        }
        // `encode` re-checks memory, so a concurrent writer's pattern wins.
        self.inner.write().encode(id)
    }

    /// Bind a composed pattern to `id`; the first binding wins.
    pub fn remember(&self, id: &str, pattern: Pattern) -> ResonanceResult<Arc<Pattern>> {
        self.inner.write().remember(id, pattern)
    }

    /// Read guard for the pure operations (superpose, decode, ...).
    pub fn read(&self) -> RwLockReadGuard<'_, PatternSpace> {
        self.inner.read()
    }

    /// Number of remembered concepts.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// True when nothing has been encoded yet.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn shared() -> SharedPatternSpace {
        SharedPatternSpace::new(PatternSpaceConfig {
            dim: 4096,
            sparsity: 0.02,
            ..PatternSpaceConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_concurrent_first_use_shares_one_pattern() {
        let space = shared();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = space.clone();
                thread::spawn(move || s.encode("river"))
            })
            .collect();
        let patterns: Vec<Arc<Pattern>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for p in &patterns[1..] {
            assert!(Arc::ptr_eq(&patterns[0], p));
        }
        assert_eq!(space.len(), 1);
    }

    #[test]
    fn test_read_guard_decodes() {
        let space = shared();
        let cat = space.encode("cat");
        space.encode("dog");
        let hits = space.read().decode(&cat, 0.9).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "cat");
    }

    #[test]
    fn test_remember_first_binding_wins() {
        let space = shared();
        let first = space.remember("blend", Pattern::from_indices(4096, [1, 2]).unwrap()).unwrap();
        let second = space.remember("blend", Pattern::from_indices(4096, [3]).unwrap()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(space.remember("wide", Pattern::empty(8192)).is_err());
    }
}
