//! Process-wide cache of loaded similarity stores.
//!
//! Similarity files do not change while the service runs, so a store is
//! loaded at most once per key and then shared read-only. The map lock is
//! only held long enough to find the per-key cell; the load itself happens
//! under that cell so concurrent requests for the same partition wait for a
//! single read instead of each parsing the file. A failed load drops its
//! cell, so unknown keys never accumulate.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

pub struct StoreCache<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<Arc<V>>>>>,
}

impl<K, V> Default for StoreCache<K, V> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> StoreCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, running `load` if there is none yet.
    ///
    /// A failed load leaves the key empty so a later call tries again.
    pub fn get_or_try_load<E>(
        &self,
        key: &K,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            cells.entry(key.clone()).or_default().clone()
        };

        let result = cell.get_or_try_init(|| load().map(Arc::new)).cloned();

        if result.is_err() {
            let mut cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // another caller may have loaded or replaced the cell meanwhile
            if cells
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, &cell) && current.get().is_none())
            {
                cells.remove(key);
            }
        }

        result
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.len()
    }
}
