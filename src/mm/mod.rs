// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Memory management for thread stacks

pub mod stack;

pub use stack::{Stack, STACK_ALIGNMENT};
