// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! # uthread - User-space threads for Rust
//!
//! Many lightweight threads multiplexed onto one OS thread:
//!
//! - **Round-robin**: threads run in FIFO order of becoming ready
//! - **Cooperative and preemptive**: threads give up the CPU with
//!   [`yield_now`], and optionally a virtual-time timer forces yields
//! - **Join**: any thread can wait for another and collect its exit code
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── arch/              # Context record and switch (x86_64, AArch64)
//! ├── config.rs          # SchedulerConfig
//! ├── error.rs           # Error types
//! ├── interrupt/         # Preemption timer and signal mask
//! ├── mm/                # Thread stacks
//! ├── sched/             # Queues, registry, scheduler, public API
//! └── lib.rs             # This file
//! ```
//!
//! ## Thread Lifecycle
//!
//! A thread is created ready, runs when dispatched, and ends as a zombie
//! once its entry returns or it calls [`exit`]. The zombie is reaped when
//! its exit code is collected by [`join`]. The first OS-level caller of
//! [`create`] becomes the main thread with ID 0, which cannot be joined.
//!
//! ## Using the Scheduler
//!
//! ```ignore
//! let a = uthread::create(|| {
//!     uthread::yield_now();
//!     7
//! })?;
//! let b = uthread::create(|| 0)?;
//!
//! assert_eq!(uthread::join(a)?, 7);
//! assert_eq!(uthread::join(b)?, 0);
//! ```

// Alloc crate for heap allocations
extern crate alloc;

// Architecture-specific context switching
pub mod arch;

// Configuration
pub mod config;

// Error types
pub mod error;

// Preemption timer
pub mod interrupt;

// Stack memory
pub mod mm;

// Scheduler and thread management
pub mod sched;

// Testing infrastructure
#[cfg(test)]
pub mod testing;

// Re-export the thread API
pub use sched::{
    configure,
    create,
    current,
    exit,
    is_initialized,
    join,
    yield_now,
    PANIC_EXIT_CODE,
};

// Re-export scheduler types
pub use sched::{
    EntryPoint,
    ExitCode,
    Scheduler,
    Thread,
    ThreadId,
    ThreadState,
    MAIN_THREAD_ID,
};

// Re-export configuration and error types
pub use config::SchedulerConfig;
pub use error::{PreemptError, QueueError, Result, SchedError};

// Integration tests (only compiled in test mode)
#[cfg(test)]
mod tests;
