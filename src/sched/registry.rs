// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread registry
//!
//! Owns every live thread record and hands out thread IDs.
//!
//! # Design
//!
//! - **Monotonic IDs**: the counter starts at 0 (main) and never goes back
//! - **Ceiling**: allocation past `max_id` fails instead of wrapping
//! - **Reaping**: [`Registry::remove`] is the only place records are freed

use alloc::boxed::Box;
use alloc::collections::BTreeMap;

use super::thread::{Thread, ThreadId};
use crate::error::{Result, SchedError};

/// Thread registry
#[derive(Debug)]
pub struct Registry {
    /// Live thread records; boxed so saved contexts never move
    threads: BTreeMap<ThreadId, Box<Thread>>,
    /// Next ID to hand out
    next_id: ThreadId,
    /// Largest ID that may be handed out
    max_id: ThreadId,
}

impl Registry {
    /// Create an empty registry
    pub const fn new(max_id: ThreadId) -> Self {
        Self {
            threads: BTreeMap::new(),
            next_id: 0,
            max_id,
        }
    }

    /// Allocate the next thread ID
    pub fn allocate_id(&mut self) -> Result<ThreadId> {
        self.check_capacity()?;
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    /// Fail if the next allocation would pass the ceiling
    pub fn check_capacity(&self) -> Result<()> {
        if self.next_id > self.max_id {
            return Err(SchedError::IdentifierExhaustion);
        }
        Ok(())
    }

    /// Check if `id` was ever handed out
    pub fn is_allocated(&self, id: ThreadId) -> bool {
        id < self.next_id
    }

    /// Next ID that would be handed out
    pub fn next_id(&self) -> ThreadId {
        self.next_id
    }

    /// Add a thread record
    pub fn insert(&mut self, thread: Box<Thread>) {
        let previous = self.threads.insert(thread.id(), thread);
        debug_assert!(previous.is_none(), "thread id registered twice");
    }

    /// Get an immutable reference to a thread
    pub fn get(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.get(&id).map(|thread| &**thread)
    }

    /// Get a mutable reference to a thread
    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut Thread> {
        self.threads.get_mut(&id).map(|thread| &mut **thread)
    }

    /// Remove a thread record, releasing it when the box is dropped
    pub fn remove(&mut self, id: ThreadId) -> Option<Box<Thread>> {
        self.threads.remove(&id)
    }

    /// Number of live threads
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Check if no thread is registered
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// IDs of all live threads in ascending order
    pub fn ids(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.threads.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut registry = Registry::new(100);
        let ids: alloc::vec::Vec<_> = (0..5).map(|_| registry.allocate_id().unwrap()).collect();
        assert_eq!(ids, [0, 1, 2, 3, 4]);
        assert!(registry.is_allocated(4));
        assert!(!registry.is_allocated(5));
    }

    #[test]
    fn test_ceiling() {
        let mut registry = Registry::new(2);
        assert_eq!(registry.allocate_id(), Ok(0));
        assert_eq!(registry.allocate_id(), Ok(1));
        assert_eq!(registry.allocate_id(), Ok(2));
        assert_eq!(registry.allocate_id(), Err(SchedError::IdentifierExhaustion));
        assert_eq!(registry.next_id(), 3);
    }

    #[test]
    fn test_remove_never_reuses_id() {
        let mut registry = Registry::new(10);
        let id = registry.allocate_id().unwrap();
        registry.insert(Box::new(Thread::main(id)));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id).is_some());
        assert!(registry.get(id).is_none());
        assert!(registry.is_empty());
        assert!(registry.is_allocated(id));
        assert_eq!(registry.allocate_id(), Ok(1));
    }
}
