// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Timer preemption
//!
//! A recurring `ITIMER_VIRTUAL` timer raises `SIGVTALRM` every `1/hz`
//! seconds of process CPU time. The handler forces the running thread to
//! yield.
//!
//! # Design
//!
//! - **Mask**: [`disable`] blocks `SIGVTALRM` for the calling OS thread,
//!   [`enable`] unblocks it. They do not nest: one `enable` undoes any number
//!   of `disable` calls.
//! - **Critical sections**: every scheduler mutation runs masked. The mask is
//!   held across a context switch and dropped by the thread that resumes, so
//!   a switch is never interrupted half-way and application code never runs
//!   masked.
//! - **Handler**: installed once per process; it only re-enters the scheduler
//!   through the same yield path application code uses.

use core::marker::PhantomData;
use core::ptr;

use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use spin::Once;

use crate::error::PreemptError;

/// Signal raised by the preemption timer
pub const TIMER_SIGNAL: Signal = Signal::SIGVTALRM;

/// Highest frequency `setitimer` can express (1 µs interval)
const MAX_HZ: u32 = 1_000_000;

const MICROS_PER_SEC: i64 = 1_000_000;

/// Handler installation outcome, shared by every OS thread of the process
static HANDLER: Once<Result<(), PreemptError>> = Once::new();

fn timer_signals() -> SigSet {
    let mut set = SigSet::empty();
    set.add(TIMER_SIGNAL);
    set
}

/// Mask the timer signal on the calling OS thread
pub fn disable() {
    let result = timer_signals().thread_block();
    debug_assert!(result.is_ok(), "pthread_sigmask(SIG_BLOCK) failed: {:?}", result);
}

/// Unmask the timer signal on the calling OS thread
pub fn enable() {
    let result = timer_signals().thread_unblock();
    debug_assert!(result.is_ok(), "pthread_sigmask(SIG_UNBLOCK) failed: {:?}", result);
}

/// Check if the timer signal is masked on the calling OS thread
pub fn is_disabled() -> bool {
    SigSet::thread_get_mask().is_ok_and(|mask| mask.contains(TIMER_SIGNAL))
}

/// RAII critical section: preemption is disabled while the guard lives
///
/// Dropping the guard always re-enables preemption, see [`enable`].
#[must_use = "preemption is re-enabled as soon as the guard is dropped"]
pub struct PreemptGuard {
    /// The mask is per OS thread
    _not_send: PhantomData<*const ()>,
}

impl PreemptGuard {
    /// Disable preemption until the guard is dropped
    pub fn new() -> Self {
        disable();
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Default for PreemptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PreemptGuard {
    fn drop(&mut self) {
        enable();
    }
}

/// Install the handler (once per process) and arm the timer at `hz`
pub fn start(hz: u32) -> Result<(), PreemptError> {
    if hz == 0 || hz > MAX_HZ {
        return Err(PreemptError::Frequency(hz));
    }
    (*HANDLER.call_once(install_handler))?;
    set_interval(MICROS_PER_SEC / i64::from(hz))?;
    log::info!("preemption armed at {} Hz", hz);
    Ok(())
}

/// Disarm the timer; the handler stays installed
pub fn stop() -> Result<(), PreemptError> {
    set_interval(0)
}

fn install_handler() -> Result<(), PreemptError> {
    let action = SigAction::new(
        SigHandler::Handler(on_timer),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler only enters the scheduler when the interrupted code
    // runs unmasked, i.e. outside every scheduler critical section.
    unsafe { sigaction(TIMER_SIGNAL, &action) }
        .map(drop)
        .map_err(PreemptError::HandlerInstall)
}

/// Program the virtual interval timer; `0` disarms it
fn set_interval(micros: i64) -> Result<(), PreemptError> {
    let interval = libc::timeval {
        tv_sec: (micros / MICROS_PER_SEC) as libc::time_t,
        tv_usec: (micros % MICROS_PER_SEC) as libc::suseconds_t,
    };
    let timer = libc::itimerval {
        it_interval: interval,
        it_value: interval,
    };
    // SAFETY: `timer` is fully initialized; the old value is not requested.
    let rc = unsafe { libc::setitimer(libc::ITIMER_VIRTUAL, &timer, ptr::null_mut()) };
    Errno::result(rc).map(drop).map_err(PreemptError::TimerSetup)
}

extern "C" fn on_timer(_signal: libc::c_int) {
    // The yield path issues syscalls of its own
    // SAFETY: `__errno_location` returns the calling thread's errno slot.
    let saved = unsafe { *libc::__errno_location() };
    crate::sched::runtime::preempt_tick();
    // SAFETY: as above.
    unsafe { *libc::__errno_location() = saved };
}
