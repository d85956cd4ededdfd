// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Testing infrastructure for scheduler scenarios
//!
//! Schedulers are per OS thread, so every scenario runs on a fresh OS thread
//! and starts from an empty scheduler.
//!
//! # Usage
//! ```ignore
//! use crate::testing::run_isolated;
//!
//! run_isolated(|| {
//!     let id = crate::create(|| 0).unwrap();
//!     assert_eq!(crate::join(id), Ok(0));
//! });
//! ```

use std::thread;

use crate::config::{SchedulerConfig, MIN_STACK_SIZE};

/// Stack size used by test threads
pub const TEST_STACK_SIZE: usize = 4 * MIN_STACK_SIZE;

/// Install the test logger; repeated calls are no-ops
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Cooperative configuration used by scenarios
pub fn cooperative() -> SchedulerConfig {
    SchedulerConfig::new()
        .with_stack_size(TEST_STACK_SIZE)
        .with_preemption(false)
}

/// Run `scenario` on a fresh OS thread with a cooperative scheduler
///
/// Panics if the scenario panics on its main thread.
pub fn run_isolated<F>(scenario: F)
where
    F: FnOnce() + Send + 'static,
{
    run_isolated_with(cooperative(), scenario);
}

/// Run `scenario` on a fresh OS thread whose scheduler uses `config`
pub fn run_isolated_with<F>(config: SchedulerConfig, scenario: F)
where
    F: FnOnce() + Send + 'static,
{
    init_logger();
    let handle = thread::spawn(move || {
        crate::configure(config).unwrap();
        scenario();
    });
    if let Err(panic) = handle.join() {
        std::panic::resume_unwind(panic);
    }
}
