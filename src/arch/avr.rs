//! # AVR port
//!
//! Hardware-specific code for the ATmega328P-class target: the
//! timer-compare interrupt vector that drives preemption, the naked
//! register save/restore routines, and the one-time jump into the first
//! process.
//!
//! ## Context switch mechanism
//!
//! AVR has no hardware exception-frame push like Cortex-M — on interrupt
//! entry only the return address is pushed by the core. Everything else
//! (all 32 general-purpose registers plus `SREG`) is saved and restored
//! by hand, exactly as the original `ISR(TIMER2_COMPA_vect)
//! __attribute__((naked))` does: the hardware-pushed 2-byte return
//! address stays on the interrupted process's stack underneath our 33
//! manually-saved bytes, so the final `reti` picks it back up once those
//! 33 bytes are popped again.
//!
//! The interrupt vector is wired as a raw, naked handler rather than
//! through `#[avr_device::interrupt]`: that attribute generates its own
//! prologue/epilogue for an ordinary interrupt handler, which is exactly
//! the automatic save/restore this scheduler replaces with its own
//! process-table-aware version.
//!
//! [`save_context`] and [`restore_context`] are exported as the named
//! primitives, but [`TIMER2_COMPA`] inlines their bodies directly rather
//! than calling them: `restore_context` ends in `reti`, so it must be
//! reached by a tail jump, never a `call`/`rcall` (which would push an
//! extra return address the epilogue doesn't expect).

use core::arch::naked_asm;

use crate::scheduler;

/// Bottom of the small stack the ISR itself runs on between "switch off
/// the interrupted process's stack" and "switch onto the next
/// process's stack" (steps 4–8 of the scheduler ISR). A fixed, modest
/// region — the scheduler's own bookkeeping never recurses or calls
/// back into process code while using it.
pub const BOTTOM_OF_ISR_STACK: u16 = 0x08FF;

/// Save all 32 general-purpose registers and `SREG` onto whatever stack
/// is currently active, for a total of 33 bytes — the exact frame size
/// [`crate::process::Process::init_and_prime`] primes onto a fresh slot.
/// Ends in `ret`, so it is safe to reach via `rcall`/`call`.
///
/// # Safety
/// Must only be called as the first action after an interrupt, before
/// any register is clobbered.
#[naked]
pub unsafe extern "avr-interrupt" fn save_context() {
    unsafe {
        naked_asm!(
            "push r0",
            "in r0, 0x3f",
            "push r0",
            "push r1",
            ".irp reg, 2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24,25,26,27,28,29,30,31",
            "push r\\reg",
            ".endr",
            "ret",
        );
    }
}

/// Pop `SREG` and all 32 general-purpose registers from whatever stack
/// is currently active and return from interrupt. Ends in `reti` — must
/// be reached by a tail jump, never `call`/`rcall`.
///
/// # Safety
/// Must only be called once the target process's `sp` has been loaded
/// into the hardware stack pointer.
#[naked]
pub unsafe extern "avr-interrupt" fn restore_context() {
    unsafe {
        naked_asm!(
            ".irp reg, 31,30,29,28,27,26,25,24,23,22,21,20,19,18,17,16,15,14,13,12,11,10,9,8,7,6,5,4,3,2",
            "pop r\\reg",
            ".endr",
            "pop r1",
            "pop r0",
            "out 0x3f, r0",
            "pop r0",
            "reti",
        );
    }
}

/// Launch the very first process. Loads `sp` into the hardware stack
/// pointer and tail-jumps into [`restore_context`], which pops the
/// idle/autostart process's primed fake frame and `reti`s straight into
/// its trampoline entry point.
///
/// `sp` arrives in `r24` (low byte) / `r25` (high byte) per the AVR
/// calling convention for a 16-bit argument.
///
/// # Safety
/// Must be called exactly once, with interrupts still disabled, and
/// `sp` pointing at a slot primed by
/// [`crate::process::Process::init_and_prime`].
#[naked]
pub unsafe extern "avr-interrupt" fn start_first_process(_sp: *mut u8) -> ! {
    unsafe {
        naked_asm!(
            "out 0x3e, r25",
            "out 0x3d, r24",
            "rjmp {restore}",
            restore = sym restore_context,
        );
    }
}

/// Write `sp` into the hardware stack pointer (`SPL`/`SPH`).
///
/// # Safety
/// Caller must ensure `sp` points into a stack region that is valid to
/// switch onto right now.
#[inline(always)]
unsafe fn set_hardware_sp(sp: *mut u8) {
    unsafe {
        let addr = sp as u16;
        core::arch::asm!(
            "out 0x3d, {lo}",
            "out 0x3e, {hi}",
            lo = in(reg) (addr & 0xFF) as u8,
            hi = in(reg) (addr >> 8) as u8,
        );
    }
}

/// Read the current hardware stack pointer.
#[inline(always)]
fn current_hardware_sp() -> *mut u8 {
    let lo: u8;
    let hi: u8;
    unsafe {
        core::arch::asm!(
            "in {lo}, 0x3d",
            "in {hi}, 0x3e",
            lo = out(reg) lo,
            hi = out(reg) hi,
        );
    }
    (((hi as u16) << 8) | lo as u16) as *mut u8
}

/// The scheduler's timer-compare interrupt vector.
///
/// Implements the ten-step protocol around the hand-written
/// save/restore: push everything, hand off to plain Rust
/// ([`scheduler::on_tick`]) for table bookkeeping, strategy dispatch,
/// and the stack pointer swap, then pop the new process's frame and
/// `reti`.
///
/// # Safety
/// Installed directly as the `TIMER2_COMPA` vector; never called except
/// by the hardware.
#[naked]
#[no_mangle]
pub unsafe extern "avr-interrupt" fn TIMER2_COMPA() {
    unsafe {
        naked_asm!(
            "push r0",
            "in r0, 0x3f",
            "push r0",
            "push r1",
            ".irp reg, 2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24,25,26,27,28,29,30,31",
            "push r\\reg",
            ".endr",
            "call {on_tick}",
            ".irp reg, 31,30,29,28,27,26,25,24,23,22,21,20,19,18,17,16,15,14,13,12,11,10,9,8,7,6,5,4,3,2",
            "pop r\\reg",
            ".endr",
            "pop r1",
            "pop r0",
            "out 0x3f, r0",
            "pop r0",
            "reti",
            on_tick = sym on_tick_shim,
        );
    }
}

/// The ordinary (non-naked) Rust side of the ISR: steps 3–8 of the
/// protocol. Called once the full register file is already safely on
/// the interrupted process's stack, so this can use normal Rust calling
/// conventions — including its own stack use — without disturbing
/// anything the naked prologue saved above it.
///
/// Leaves the hardware stack pointer loaded with the winning process's
/// `sp` before returning, so the naked epilogue pops the right frame.
extern "avr-interrupt" fn on_tick_shim() {
    let interrupted_sp = current_hardware_sp();
    // SAFETY: called exactly once per tick, from the naked vector above,
    // with the full register file already pushed and global interrupts
    // masked by virtue of being inside an ISR.
    let winner_sp = unsafe { scheduler::on_tick(interrupted_sp, BOTTOM_OF_ISR_STACK as *mut u8) };
    // SAFETY: `winner_sp` is the stack pointer `on_tick` selected for the
    // process about to run; it is valid by construction (either primed
    // or previously saved by this same routine).
    unsafe { set_hardware_sp(winner_sp) };
}
