// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler and thread management
//!
//! [`Scheduler`] does the bookkeeping, [`runtime`] drives it from the
//! running thread and performs the context switches.
//!
//! # Example
//! ```ignore
//! use uthread::sched::{create, join, yield_now};
//!
//! let worker = create(|| {
//!     yield_now();
//!     3
//! })?;
//! assert_eq!(join(worker)?, 3);
//! ```

pub mod queue;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod state;
pub mod thread;

pub use queue::Queue;
pub use registry::Registry;
pub use runtime::{
    configure, create, current, exit, is_initialized, join, yield_now, PANIC_EXIT_CODE,
};
pub use scheduler::{ExitStep, JoinStep, Scheduler, Switch};
pub use state::ThreadState;
pub use thread::{EntryPoint, ExitCode, Thread, ThreadFlags, ThreadId, MAIN_THREAD_ID};
