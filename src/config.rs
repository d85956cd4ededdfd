// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler configuration
//!
//! A [`SchedulerConfig`] is fixed when the scheduler of an OS thread is
//! created, which happens on the first [`create`](crate::create). Call
//! [`configure`](crate::configure) before that to override the defaults.
//!
//! # Usage
//!
//! ```ignore
//! let config = SchedulerConfig::default()
//!     .with_stack_size(64 * 1024)
//!     .with_preemption(false);
//! uthread::configure(config)?;
//! ```

use crate::error::{Result, SchedError};
use crate::sched::ThreadId;

/// Default stack size for new threads
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// Smallest stack a thread may be given
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Default thread id ceiling (ids 0..=65535)
pub const DEFAULT_MAX_THREAD_ID: ThreadId = u16::MAX as ThreadId;

/// Default preemption frequency (10 ms of process CPU time)
pub const DEFAULT_TIMER_HZ: u32 = 100;

/// Highest supported preemption frequency
pub const MAX_TIMER_HZ: u32 = 1000;

/// Scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Stack size in bytes for every created thread
    pub stack_size: usize,
    /// Largest thread id that may be handed out
    pub max_thread_id: ThreadId,
    /// Arm the periodic timer that forces yields
    pub preemption: bool,
    /// Timer frequency in Hz
    pub timer_hz: u32,
}

impl SchedulerConfig {
    /// Create the default configuration
    pub const fn new() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            max_thread_id: DEFAULT_MAX_THREAD_ID,
            preemption: true,
            timer_hz: DEFAULT_TIMER_HZ,
        }
    }

    /// Set the thread stack size
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Set the thread id ceiling
    pub const fn with_max_thread_id(mut self, max_thread_id: ThreadId) -> Self {
        self.max_thread_id = max_thread_id;
        self
    }

    /// Enable or disable timer preemption
    pub const fn with_preemption(mut self, preemption: bool) -> Self {
        self.preemption = preemption;
        self
    }

    /// Set the timer frequency
    pub const fn with_timer_hz(mut self, timer_hz: u32) -> Self {
        self.timer_hz = timer_hz;
        self
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        if self.stack_size < MIN_STACK_SIZE {
            return Err(SchedError::InvalidConfig("stack size below minimum"));
        }
        if self.max_thread_id == 0 {
            return Err(SchedError::InvalidConfig("thread id ceiling leaves no room"));
        }
        if self.timer_hz == 0 || self.timer_hz > MAX_TIMER_HZ {
            return Err(SchedError::InvalidConfig("timer frequency out of range"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}
