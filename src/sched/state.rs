// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread states

/// Thread states
///
/// ```text
///            create                yield / timer
///   (new) ──────────▶ Ready ◀──────────────────▶ Running
///                       ▲                          │ │
///                       │ joined thread exits      │ │ exit
///                       │                join      │ ▼
///                    Blocked ◀──────────────────── ┘ Zombie ──▶ (reaped)
/// ```
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Thread is in the ready queue
    Ready,
    /// Thread occupies the running slot
    Running,
    /// Thread is waiting for a join target to exit
    Blocked,
    /// Thread has exited, its exit code is not collected yet
    Zombie,
}

impl ThreadState {
    /// Check if the thread can be dispatched
    pub fn is_runnable(self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runnable_states() {
        assert!(ThreadState::Ready.is_runnable());
        assert!(ThreadState::Running.is_runnable());
        assert!(!ThreadState::Blocked.is_runnable());
        assert!(!ThreadState::Zombie.is_runnable());
    }
}
