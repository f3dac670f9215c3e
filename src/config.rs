//! # Compile-time configuration
//!
//! Every limit the scheduler needs is fixed at compile time — no dynamic
//! allocation beyond the static per-process stack carve-out.

/// Number of process slots the table can hold. Slot 0 is always the idle
/// process. Must stay small enough that `ProcessId` (a `u8`) and
/// `INVALID_PROCESS` don't collide: keep this below `0xFF`.
pub const N_MAX: u8 = 8;

/// Bytes of stack given to each process slot.
///
/// Sized for the deepest call chain the demo programs in `main.rs` need
/// plus the 33-byte saved-register frame `exec` primes onto a fresh slot.
/// AVR SRAM is scarce (2 KiB on an ATmega328P with 8 slots), so this is
/// far smaller than a desktop or Cortex-M stack would use.
pub const STACK_SIZE_PROC: usize = 64;

/// Priority assigned to every autostart program and to the idle process.
/// Scheduling strategies that ignore priority (`Even`, `Random`,
/// `RunToCompletion`) are unaffected by this value.
pub const DEFAULT_PRIORITY: u8 = 1;

/// Milliseconds the idle process sleeps between heartbeat characters.
pub const DEFAULT_OUTPUT_DELAY: u16 = 500;

/// The `read_input()` code that invokes the task manager (historically
/// "F12 to BIOS" in the original implementation).
pub const TASK_MANAGER_INPUT_CODE: u8 = 9;

/// Ceiling on critical-section nesting depth before a
/// `CriticalSectionOverflow` fatal error is raised.
pub const CRITICAL_SECTION_MAX_NESTING: u8 = 255;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_max_leaves_room_for_the_invalid_process_sentinel() {
        assert!((N_MAX as u16) < 0xFF);
    }
}
