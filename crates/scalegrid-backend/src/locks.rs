//! Per-name mutual exclusion.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

/// Serializes operations that share a name.
///
/// Different names never block each other.
#[derive(Debug, Default)]
pub struct NameLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Releases its name on drop.
#[derive(Debug)]
pub struct NameGuard<'a> {
    locks: &'a NameLocks,
    name: String,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `name` is free, then hold it.
    pub fn lock(&self, name: &str) -> NameGuard<'_> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(name) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(name.to_string());
        NameGuard {
            locks: self,
            name: name.to_string(),
        }
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.name);
        self.locks.released.notify_all();
    }
}
