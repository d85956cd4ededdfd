// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread stacks
//!
//! Stacks are heap-allocated when a thread is created and freed when the
//! owning thread record is reaped. [`Stack`] is move-only, so the memory is
//! released exactly once, on drop.

use alloc::alloc as heap_alloc;
use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::{Result, SchedError};

/// Stack alignment required by both supported ABIs
pub const STACK_ALIGNMENT: usize = 16;

/// Owned stack memory of one thread
#[derive(Debug)]
pub struct Stack {
    /// Lowest address of the allocation
    base: NonNull<u8>,
    /// Allocation layout, needed again on release
    layout: Layout,
}

impl Stack {
    /// Allocate a stack of `size` bytes
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(SchedError::AllocationFailure);
        }
        let layout = Layout::from_size_align(size, STACK_ALIGNMENT)
            .map_err(|_| SchedError::AllocationFailure)?;

        // SAFETY: layout has non-zero size.
        let ptr = unsafe { heap_alloc::alloc(layout) };
        let base = NonNull::new(ptr).ok_or(SchedError::AllocationFailure)?;

        Ok(Self { base, layout })
    }

    /// Size of the stack in bytes
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Lowest address of the stack
    pub fn base(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    /// One past the highest address (stacks grow down)
    pub fn top(&self) -> *mut u8 {
        // SAFETY: one-past-the-end of the same allocation.
        unsafe { self.base.as_ptr().add(self.layout.size()) }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with this exact layout, dropped once.
        unsafe { heap_alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}
