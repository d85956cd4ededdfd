// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Error types
//!
//! Every fallible operation returns a distinguishable error before it touches
//! scheduler state, so none of these leave the ready/blocked/zombie bookkeeping
//! half-updated.
//!
//! # Error Categories
//!
//! ## Thread creation
//! - [`SchedError::AllocationFailure`] - stack or thread record could not be built
//! - [`SchedError::IdentifierExhaustion`] - thread id ceiling reached
//!
//! ## Join
//! - [`SchedError::InvalidTarget`] - id 0, self, never allocated, or already reaped
//! - [`SchedError::AlreadyJoined`] - another thread holds the join claim
//! - [`SchedError::UnjoinableState`] - the target is itself blocked
//!
//! ## Setup
//! - [`SchedError::AlreadyInitialized`] - configuration after the first `create`
//! - [`SchedError::InvalidConfig`] - rejected configuration value

use thiserror::Error;

use crate::sched::ThreadId;

/// Errors returned by the scheduler API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedError {
    /// The thread record, its stack, or its initial context could not be built.
    #[error("failed to allocate thread resources")]
    AllocationFailure,

    /// The thread id counter passed the configured ceiling.
    #[error("thread identifier space exhausted")]
    IdentifierExhaustion,

    /// Join target is the main thread, the caller, or an id that is not live.
    #[error("thread {0} is not a valid join target")]
    InvalidTarget(ThreadId),

    /// Another thread already claimed the join on this target.
    #[error("thread {0} is already being joined")]
    AlreadyJoined(ThreadId),

    /// The target is blocked on a join of its own.
    #[error("thread {0} is blocked and cannot be joined")]
    UnjoinableState(ThreadId),

    /// The scheduler on this OS thread has already been created.
    #[error("scheduler is already initialized")]
    AlreadyInitialized,

    /// A configuration value is out of range.
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Errors returned by [`Queue`](crate::sched::Queue) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Dequeue on an empty queue.
    #[error("queue is empty")]
    Empty,

    /// Delete of an item the queue does not hold.
    #[error("item not found in queue")]
    NotFound,
}

/// Errors from arming the preemption timer.
///
/// These are reported, never fatal: the runtime falls back to cooperative
/// scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreemptError {
    /// `sigaction` for the timer signal failed.
    #[error("failed to install timer signal handler: {0}")]
    HandlerInstall(nix::Error),

    /// `setitimer` refused the interval.
    #[error("failed to arm preemption timer: {0}")]
    TimerSetup(nix::Error),

    /// Frequency outside the supported range.
    #[error("unsupported timer frequency {0} Hz")]
    Frequency(u32),
}

/// Result alias for scheduler operations.
pub type Result<T> = core::result::Result<T, SchedError>;
