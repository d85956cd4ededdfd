// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! AArch64 context switch
//!
//! Saves x19-x30, sp and the low halves of v8-v15 (d8-d15), the AAPCS64
//! callee-saved set.

use core::arch::naked_asm;

/// Saved CPU registers
///
/// Field offsets are used by [`switch_context`]; keep them in sync.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    /// x19..=x28, x29 (fp), x30 (lr) at 0x00..0x60
    pub regs: [u64; 12],
    /// Stack pointer (0x60)
    pub sp: u64,
    /// d8..=d15 (0x68..0xA8)
    pub fp_regs: [u64; 8],
}

/// Index of the link register in `regs`
const LR: usize = 11;

impl Context {
    /// Build a context that starts `entry(arg)` on the stack ending at `stack_top`
    ///
    /// # Safety
    ///
    /// `stack_top` must be the one-past-the-end address of a writable stack
    /// that outlives the context.
    pub unsafe fn prepare(stack_top: *mut u8, entry: super::Bootstrap, arg: usize) -> Self {
        let mut ctx = Self::default();
        ctx.regs[0] = arg as u64;
        ctx.regs[1] = entry as usize as u64;
        ctx.regs[LR] = thread_trampoline as usize as u64;
        ctx.sp = ((stack_top as usize) & !0xF) as u64;
        ctx
    }
}

/// Save the current state into `from` and resume `to`
///
/// # Safety
///
/// Both pointers must be valid, `to` must hold a context built by
/// [`Context::prepare`] or saved by a previous switch.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(from: *mut Context, to: *const Context) {
    naked_asm!(
        "stp x19, x20, [x0, #0]",
        "stp x21, x22, [x0, #16]",
        "stp x23, x24, [x0, #32]",
        "stp x25, x26, [x0, #48]",
        "stp x27, x28, [x0, #64]",
        "stp x29, x30, [x0, #80]",
        "mov x9, sp",
        "str x9, [x0, #96]",
        "stp d8, d9, [x0, #104]",
        "stp d10, d11, [x0, #120]",
        "stp d12, d13, [x0, #136]",
        "stp d14, d15, [x0, #152]",
        "ldp x19, x20, [x1, #0]",
        "ldp x21, x22, [x1, #16]",
        "ldp x23, x24, [x1, #32]",
        "ldp x25, x26, [x1, #48]",
        "ldp x27, x28, [x1, #64]",
        "ldp x29, x30, [x1, #80]",
        "ldr x9, [x1, #96]",
        "mov sp, x9",
        "ldp d8, d9, [x1, #104]",
        "ldp d10, d11, [x1, #120]",
        "ldp d12, d13, [x1, #136]",
        "ldp d14, d15, [x1, #152]",
        "ret",
    )
}

/// First code a new thread runs: `x20(x19)`, which never returns
#[unsafe(naked)]
unsafe extern "C" fn thread_trampoline() -> ! {
    naked_asm!(
        "mov x0, x19",
        "blr x20",
        "brk #0",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    #[test]
    fn test_context_layout() {
        assert_eq!(offset_of!(Context, sp), 96);
        assert_eq!(offset_of!(Context, fp_regs), 104);
        assert_eq!(size_of::<Context>(), 168);
    }
}
