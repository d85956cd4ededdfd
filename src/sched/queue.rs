// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Ordered queue
//!
//! FIFO container backing the ready, blocked and zombie sets. Insertion order
//! is scheduling order: there are no priorities.
//!
//! # Design
//!
//! - **Tail insert / head removal**: O(1) amortized
//! - **Targeted delete**: removes the first equal item anywhere, the rest keep
//!   their relative order
//! - **Search**: [`Queue::iterate`] visits in order and stops at the first match

use alloc::collections::VecDeque;

use crate::error::QueueError;

/// Ordered FIFO queue
#[derive(Debug, Clone)]
pub struct Queue<T> {
    items: VecDeque<T>,
}

impl<T> Queue<T> {
    /// Create a new empty queue
    pub const fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Destroy the queue
    ///
    /// A queue that still holds items is handed back instead of being dropped.
    pub fn destroy(self) -> Result<(), Self> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Append an item at the tail
    pub fn enqueue(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Remove the item at the head
    pub fn dequeue(&mut self) -> Result<T, QueueError> {
        self.items.pop_front().ok_or(QueueError::Empty)
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Visit items head to tail, returning the first one `predicate` accepts
    pub fn iterate<F>(&self, mut predicate: F) -> Option<&T>
    where
        F: FnMut(&T) -> bool,
    {
        self.items.iter().find(|item| predicate(item))
    }

    /// Iterate over the items head to tail
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }
}

impl<T: PartialEq> Queue<T> {
    /// Remove the first item equal to `item`
    pub fn delete(&mut self, item: &T) -> Result<T, QueueError> {
        let index = self
            .items
            .iter()
            .position(|queued| queued == item)
            .ok_or(QueueError::NotFound)?;
        // `remove` shifts the shorter side, the order of the rest is unchanged
        self.items.remove(index).ok_or(QueueError::NotFound)
    }

    /// Check whether an equal item is queued
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}
