//! Lock-free holder for the key set in use.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::jwks::KeySet;

/// The current [`KeySet`], swapped atomically on rotation.
///
/// Readers take a snapshot with [`SharedKeySet::current`] and keep using it for
/// the whole encode or decode call, even if a rotation lands meanwhile.
#[derive(Debug)]
pub struct SharedKeySet {
    current: ArcSwap<KeySet>,
}

impl SharedKeySet {
    pub fn new(keys: KeySet) -> Self {
        Self {
            current: ArcSwap::from_pointee(keys),
        }
    }

    pub fn current(&self) -> Arc<KeySet> {
        self.current.load_full()
    }

    /// Replace the whole set.
    pub fn rotate(&self, keys: KeySet) {
        tracing::debug!(keys = keys.len(), "rotating key set");
        self.current.store(Arc::new(keys));
    }

    /// Swap in the union of the current set and `keys`.
    pub fn merge_in(&self, keys: &KeySet) {
        self.current.rcu(|current| current.merge(keys));
    }
}

impl Default for SharedKeySet {
    fn default() -> Self {
        Self::new(KeySet::default())
    }
}
