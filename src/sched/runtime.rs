// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler API functions
//!
//! Every OS thread that calls [`create`] gets its own [`Scheduler`], created
//! on that first call and kept for the lifetime of the OS thread. The caller
//! becomes the main thread (ID 0).
//!
//! Each function below disables preemption, updates the scheduler, performs
//! at most one context switch, and re-enables preemption once the calling
//! thread runs again.
//!
//! # Usage
//!
//! ```ignore
//! let worker = uthread::create(|| {
//!     uthread::yield_now();
//!     7
//! })?;
//! assert_eq!(uthread::join(worker)?, 7);
//! ```

use alloc::boxed::Box;
use core::cell::Cell;
use core::ptr;
use std::panic::{self, AssertUnwindSafe};
use std::process;

use super::scheduler::{ExitStep, JoinStep, Scheduler};
use super::thread::{EntryPoint, ExitCode, ThreadId, MAIN_THREAD_ID};
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedError};
use crate::interrupt::preempt::{self, PreemptGuard};

/// Exit code of a thread whose entry point panicked
pub const PANIC_EXIT_CODE: ExitCode = -1;

thread_local! {
    /// Scheduler of this OS thread; leaked on creation, never freed
    static SCHEDULER: Cell<*mut Scheduler> = const { Cell::new(ptr::null_mut()) };

    /// Configuration picked up by the first `create`
    static PENDING_CONFIG: Cell<Option<SchedulerConfig>> = const { Cell::new(None) };
}

/// ============================================================================
/// Scheduler Instance
/// ============================================================================

fn scheduler_ptr() -> *mut Scheduler {
    SCHEDULER.with(Cell::get)
}

/// Run `f` on this OS thread's scheduler, `None` before the first `create`
///
/// The borrow must end before any context switch.
pub(crate) fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> Option<R> {
    let sched = scheduler_ptr();
    if sched.is_null() {
        return None;
    }
    // SAFETY: set once by `init` and never freed; callers hold the
    // preemption mask, so the timer handler cannot create a second borrow.
    Some(f(unsafe { &mut *sched }))
}

/// Create the scheduler and main thread of this OS thread
fn init() -> Result<()> {
    if !scheduler_ptr().is_null() {
        return Ok(());
    }

    let config = PENDING_CONFIG.with(Cell::get).unwrap_or_default();
    let mut sched = Scheduler::new(config, thread_start)?;

    if config.preemption {
        match preempt::start(config.timer_hz) {
            Ok(()) => sched.set_preemptive(true),
            Err(err) => log::warn!("{}; continuing with cooperative scheduling", err),
        }
    }

    log::debug!(
        "scheduler initialized (stack {} bytes, preemptive: {})",
        config.stack_size,
        sched.is_preemptive()
    );
    SCHEDULER.with(|cell| cell.set(Box::into_raw(Box::new(sched))));
    Ok(())
}

/// Check whether this OS thread already has a scheduler
pub fn is_initialized() -> bool {
    !scheduler_ptr().is_null()
}

/// Set the configuration used when this OS thread's scheduler is created
///
/// Must be called before the first [`create`] on the OS thread.
pub fn configure(config: SchedulerConfig) -> Result<()> {
    if is_initialized() {
        return Err(SchedError::AlreadyInitialized);
    }
    config.validate()?;
    PENDING_CONFIG.with(|cell| cell.set(Some(config)));
    Ok(())
}

/// ============================================================================
/// Thread API
/// ============================================================================

/// Create a new thread running `entry`
///
/// The first call on an OS thread also creates its scheduler and main
/// thread. The new thread is only queued; it first runs when the caller
/// yields, joins, or exits. Returning from `entry` is the same as calling
/// [`exit`] with the returned code.
pub fn create<F>(entry: F) -> Result<ThreadId>
where
    F: FnOnce() -> ExitCode + 'static,
{
    let _masked = PreemptGuard::new();
    init()?;
    with_scheduler(|sched| sched.spawn(Box::new(entry)))
        .unwrap_or(Err(SchedError::AllocationFailure))
}

/// Give the CPU to the next ready thread
///
/// Returns immediately when no other thread is ready.
pub fn yield_now() {
    let _masked = PreemptGuard::new();
    let Some(switch) = with_scheduler(Scheduler::yield_current).flatten() else {
        return;
    };
    // SAFETY: on the running thread's stack, masked, both records registered.
    unsafe { switch.perform() };
}

/// ID of the running thread
///
/// Before the first [`create`] the caller is the future main thread.
pub fn current() -> ThreadId {
    let _masked = PreemptGuard::new();
    with_scheduler(|sched| sched.current()).unwrap_or(MAIN_THREAD_ID)
}

/// Terminate the running thread with `code`
///
/// A thread joining this one is woken with `code`; otherwise the code waits
/// for a later [`join`]. When no other thread is left at all the process
/// exits with `code`.
pub fn exit(code: ExitCode) -> ! {
    preempt::disable();
    match with_scheduler(|sched| sched.exit_current(code)) {
        Some(ExitStep::Switch(switch)) => {
            // SAFETY: masked, the zombie record stays registered until reaped
            // by a joiner, which can only run after this switch.
            unsafe { switch.perform() };
            log::error!("exited thread was resumed");
            process::abort()
        }
        Some(ExitStep::Deadlock) => {
            log::error!("thread exited with {} while every other thread is blocked", code);
            process::abort()
        }
        Some(ExitStep::Finished) | None => {
            preempt::enable();
            process::exit(code)
        }
    }
}

/// Wait for `target` to exit and collect its exit code
///
/// Fails without blocking when `target` is the main thread, the caller, not
/// a live thread, already being joined, or itself blocked in a join.
pub fn join(target: ThreadId) -> Result<ExitCode> {
    let _masked = PreemptGuard::new();
    let step = with_scheduler(|sched| sched.start_join(target))
        .unwrap_or(Err(SchedError::InvalidTarget(target)))?;

    match step {
        JoinStep::Collected(code) => Ok(code),
        JoinStep::Wait(switch) => {
            // SAFETY: on the running thread's stack, masked, both records registered.
            unsafe { switch.perform() };
            with_scheduler(|sched| sched.finish_join(target))
                .ok_or(SchedError::InvalidTarget(target))
        }
    }
}

/// Timer handler entry: yield if this OS thread's scheduler is preemptive
pub(crate) fn preempt_tick() {
    if with_scheduler(|sched| sched.is_preemptive()).unwrap_or(false) {
        yield_now();
    }
}

/// ============================================================================
/// Thread Bootstrap
/// ============================================================================

/// First Rust code of every created thread, entered masked
extern "C" fn thread_start(arg: usize) -> ! {
    let id = arg as ThreadId;
    let entry = with_scheduler(|sched| sched.take_entry(id)).flatten();
    preempt::enable();

    let code = match entry {
        Some(entry) => run_entry(id, entry),
        None => {
            log::error!("thread {} dispatched without an entry point", id);
            PANIC_EXIT_CODE
        }
    };
    exit(code)
}

/// Run an entry point; a panic must not unwind into the bootstrap frame
fn run_entry(id: ThreadId, entry: EntryPoint) -> ExitCode {
    match panic::catch_unwind(AssertUnwindSafe(entry)) {
        Ok(code) => code,
        Err(_) => {
            log::error!("thread {} panicked, exiting with {}", id, PANIC_EXIT_CODE);
            PANIC_EXIT_CODE
        }
    }
}
