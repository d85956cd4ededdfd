// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Interrupt handling
//!
//! The only interrupt source is the preemption timer, see [`preempt`].

pub mod preempt;

pub use preempt::{disable, enable, is_disabled, start, stop, PreemptGuard, TIMER_SIGNAL};
