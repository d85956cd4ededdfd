// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Architecture-specific execution contexts
//!
//! Each architecture provides the same three pieces:
//!
//! - `Context`: the saved callee-saved register state of a suspended thread
//! - `Context::prepare`: a fresh context that calls a [`Bootstrap`] function
//!   on a given stack
//! - `switch_context`: save the current state into one context and resume
//!   another; it returns only when something switches back
//!
//! ```text
//! arch/
//! ├── amd64.rs   # x86_64 System V
//! └── arm64.rs   # AArch64 AAPCS64
//! ```

/// Function a new context starts in; receives the argument given to `prepare`
pub type Bootstrap = extern "C" fn(usize) -> !;

#[cfg(target_arch = "x86_64")]
mod amd64;
#[cfg(target_arch = "x86_64")]
pub use amd64::{switch_context, Context};

#[cfg(target_arch = "aarch64")]
mod arm64;
#[cfg(target_arch = "aarch64")]
pub use arm64::{switch_context, Context};

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("uthread supports x86_64 and aarch64 only");
