// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread representation
//!
//! Defines the thread control block and related types.

use alloc::boxed::Box;
use core::fmt;

use bitflags::bitflags;

use super::state::ThreadState;
use crate::arch::{Bootstrap, Context};
use crate::error::Result;
use crate::mm::Stack;

/// Thread ID type
pub type ThreadId = u64;

/// Exit code handed from an exiting thread to its joiner
pub type ExitCode = i32;

/// Thread entry point: the function together with its captured argument
pub type EntryPoint = Box<dyn FnOnce() -> ExitCode + 'static>;

/// ID of the implicit main thread
pub const MAIN_THREAD_ID: ThreadId = 0;

bitflags! {
    /// Per-thread flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ThreadFlags: u8 {
        /// The thread runs on the OS-provided stack
        const MAIN = 1 << 0;
        /// A join claim was taken on this thread; no second joiner allowed
        const JOIN_CLAIMED = 1 << 1;
        /// The entry point has been handed to the thread
        const STARTED = 1 << 2;
    }
}

/// Thread control block
pub struct Thread {
    /// Unique thread ID
    pub(crate) id: ThreadId,
    /// Saved registers while not running
    pub(crate) context: Context,
    /// Owned stack, `None` for the main thread
    stack: Option<Stack>,
    /// Entry point, taken at first dispatch
    entry: Option<EntryPoint>,
    /// Own exit code, or the code of the joined thread for a woken joiner
    pub(crate) exit_code: ExitCode,
    /// Thread blocked joining this one
    pub(crate) watcher: Option<ThreadId>,
    /// Thread this one is blocked joining
    pub(crate) waiting_for: Option<ThreadId>,
    /// Thread flags
    pub(crate) flags: ThreadFlags,
    /// Thread state, mirrors queue membership
    pub(crate) state: ThreadState,
}

impl Thread {
    /// Create the record for the thread already running on the OS stack
    ///
    /// Its context is filled in by the first switch away from it.
    pub fn main(id: ThreadId) -> Self {
        Self {
            id,
            context: Context::default(),
            stack: None,
            entry: None,
            exit_code: 0,
            watcher: None,
            waiting_for: None,
            flags: ThreadFlags::MAIN | ThreadFlags::STARTED,
            state: ThreadState::Running,
        }
    }

    /// Create a new thread that will run `bootstrap(id)` on a fresh stack
    ///
    /// The thread starts out ready; nothing runs until it is dispatched.
    pub fn new(id: ThreadId, entry: EntryPoint, stack_size: usize, bootstrap: Bootstrap) -> Result<Self> {
        let stack = Stack::new(stack_size)?;

        // SAFETY: the stack is owned by this record and outlives the context.
        let context = unsafe { Context::prepare(stack.top(), bootstrap, id as usize) };

        Ok(Self {
            id,
            context,
            stack: Some(stack),
            entry: Some(entry),
            exit_code: 0,
            watcher: None,
            waiting_for: None,
            flags: ThreadFlags::empty(),
            state: ThreadState::Ready,
        })
    }

    /// Get the thread ID
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Get the thread state
    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// Set the thread state
    pub fn set_state(&mut self, state: ThreadState) {
        self.state = state;
    }

    /// Get the thread flags
    pub fn flags(&self) -> ThreadFlags {
        self.flags
    }

    /// Get the exit code
    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    /// Thread currently blocked joining this one
    pub fn watcher(&self) -> Option<ThreadId> {
        self.watcher
    }

    /// Thread this one waits for
    pub fn waiting_for(&self) -> Option<ThreadId> {
        self.waiting_for
    }

    /// Check whether a join claim exists on this thread
    pub fn is_join_claimed(&self) -> bool {
        self.flags.contains(ThreadFlags::JOIN_CLAIMED)
    }

    /// Check whether this is the main thread
    pub fn is_main(&self) -> bool {
        self.flags.contains(ThreadFlags::MAIN)
    }

    /// Stack size in bytes, 0 for the main thread
    pub fn stack_size(&self) -> usize {
        self.stack.as_ref().map_or(0, Stack::size)
    }

    /// Take the entry point; `None` once started
    pub(crate) fn take_entry(&mut self) -> Option<EntryPoint> {
        let entry = self.entry.take();
        if entry.is_some() {
            self.flags.insert(ThreadFlags::STARTED);
        }
        entry
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("flags", &self.flags)
            .field("exit_code", &self.exit_code)
            .field("watcher", &self.watcher)
            .field("waiting_for", &self.waiting_for)
            .field("stack_size", &self.stack_size())
            .finish()
    }
}
