// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Integration Tests
//!
//! These tests drive the public thread API with real context switches.
//! Every scenario runs on its own OS thread, see [`crate::testing`].
