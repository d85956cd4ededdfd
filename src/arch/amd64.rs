// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! x86_64 context switch
//!
//! Only the System V callee-saved state is kept: the switch is an ordinary
//! function call, so the caller already spilled everything else.

use core::arch::naked_asm;

/// Default MXCSR: all exceptions masked, round to nearest
const MXCSR_DEFAULT: u32 = 0x1F80;

/// Default x87 control word: all exceptions masked, 64-bit precision
const FPU_CW_DEFAULT: u16 = 0x037F;

/// Saved CPU registers
///
/// Field offsets are used by [`switch_context`]; keep them in sync.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    /// Stack pointer (0x00); the resume address sits at its top
    pub rsp: u64,
    /// General purpose callee-saved registers (0x08..0x38)
    pub rbx: u64,
    pub rbp: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    /// SSE control/status (0x38)
    pub mxcsr: u32,
    /// x87 control word (0x3C)
    pub fpu_cw: u16,
    _pad: u16,
}

impl Context {
    /// Build a context that starts `entry(arg)` on the stack ending at `stack_top`
    ///
    /// # Safety
    ///
    /// `stack_top` must be the one-past-the-end address of a writable stack of
    /// at least a few hundred bytes that outlives the context.
    pub unsafe fn prepare(stack_top: *mut u8, entry: super::Bootstrap, arg: usize) -> Self {
        // 16-byte aligned top, then one slot for the resume address: after the
        // `ret` in `switch_context` pops it, rsp is aligned for the `call`
        let top = (stack_top as usize) & !0xF;
        let rsp = top - 24;
        // SAFETY: `rsp` lies inside the caller-provided stack.
        unsafe { (rsp as *mut u64).write(thread_trampoline as usize as u64) };

        Self {
            rsp: rsp as u64,
            r12: arg as u64,
            r13: entry as usize as u64,
            mxcsr: MXCSR_DEFAULT,
            fpu_cw: FPU_CW_DEFAULT,
            ..Self::default()
        }
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
        "mov [rdi + 0x00], rsp",
        "mov [rdi + 0x08], rbx",
        "mov [rdi + 0x10], rbp",
        "mov [rdi + 0x18], r12",
        "mov [rdi + 0x20], r13",
        "mov [rdi + 0x28], r14",
        "mov [rdi + 0x30], r15",
        "stmxcsr dword ptr [rdi + 0x38]",
        "fnstcw word ptr [rdi + 0x3c]",
        "mov rsp, [rsi + 0x00]",
        "mov rbx, [rsi + 0x08]",
        "mov rbp, [rsi + 0x10]",
        "mov r12, [rsi + 0x18]",
        "mov r13, [rsi + 0x20]",
        "mov r14, [rsi + 0x28]",
        "mov r15, [rsi + 0x30]",
        "ldmxcsr dword ptr [rsi + 0x38]",
        "fldcw word ptr [rsi + 0x3c]",
        "ret",
    )
}

/// First code a new thread runs: `r13(r12)`, which never returns
#[unsafe(naked)]
unsafe extern "C" fn thread_trampoline() -> ! {
    naked_asm!(
        "mov rdi, r12",
        "call r13",
        "ud2",
    )
}
