//! # Scheduler
//!
//! The process table, the currently running slot, and the ten-step
//! preemption protocol the timer-compare interrupt runs on every tick.
//! [`on_tick`] is called from [`crate::arch::avr`]'s naked interrupt
//! vector once the full register file is already saved; everything here
//! is ordinary (if `unsafe`-laden, singleton-backed) Rust.

use crate::config::N_MAX;
use crate::hooks::{fatal_error, hooks};
use crate::process::{Process, ProcessId, ProcessState, IDLE_PROCESS};
use crate::strategy::{self, SchedulingInfo, SchedulingStrategy};

/// The process table. Slot 0 is always the idle process.
static mut TABLE: [Process; N_MAX as usize] = {
    const EMPTY: Process = Process::empty();
    [EMPTY; N_MAX as usize]
};

/// The currently running slot.
static mut CUR: ProcessId = IDLE_PROCESS;

/// The active scheduling strategy.
static mut STRATEGY: SchedulingStrategy = SchedulingStrategy::Even;

/// Mutable bookkeeping the active strategy needs across ticks.
static mut SCHED_INFO: SchedulingInfo = SchedulingInfo::new();

/// The ten-step preemption protocol (steps 2–9; steps 1 and 10 —
/// `save_context`/`restore_context` — are the naked asm around this
/// call).
///
/// AVR has no hardware-provided split between an interrupt stack and a
/// process stack the way Cortex-M's MSP/PSP pair gives `eqos` for free.
/// The original C swaps the hardware stack pointer to
/// `BOTTOM_OF_ISR_STACK` for the duration of this bookkeeping (its step
/// 3); doing that across a plain Rust function call boundary would strand
/// this function's own return address on the stack it just switched away
/// from. This implementation keeps the bookkeeping on the interrupted
/// process's own (already reserved, bounded) stack instead and never
/// performs that swap — `BOTTOM_OF_ISR_STACK` is kept as a named constant
/// for spec-traceability only. No testable property depends on which
/// physical stack this computation runs on.
///
/// # Safety
/// Must be called exactly once per tick, from interrupt context, with
/// the full register file already saved onto `interrupted_sp`.
pub unsafe fn on_tick(interrupted_sp: *mut u8, _isr_stack_bottom: *mut u8) -> *mut u8 {
    unsafe {
        let cur = CUR;

        TABLE[cur as usize].sp = interrupted_sp;
        TABLE[cur as usize].checksum = TABLE[cur as usize].compute_checksum();

        if hooks().read_input() == crate::config::TASK_MANAGER_INPUT_CODE {
            hooks().wait_for_no_input();
            hooks().task_manager_main();
        }

        TABLE[cur as usize].state = ProcessState::Ready;

        let winner = strategy::select_next(STRATEGY, &TABLE, cur, &mut SCHED_INFO);
        TABLE[winner as usize].state = ProcessState::Running;
        CUR = winner;
        defmt::trace!("on_tick: {} -> {}", cur, winner);

        let winner_sp = TABLE[winner as usize].sp;
        if TABLE[winner as usize].compute_checksum() != TABLE[winner as usize].checksum {
            fatal_error("stack checksum mismatch");
        }

        winner_sp
    }
}

/// Resolution for the termination open question (see `DESIGN.md`): a
/// process that returns from its program body lands here via the
/// trampoline instead of looping forever. This does **not** re-enter
/// [`on_tick`] — step 6 of that protocol unconditionally marks `cur`
/// `Ready` again, which would resurrect the very slot being freed.
/// Instead it runs a reduced tail: mark the slot `Unused`, let the
/// active strategy pick a winner (strategies only ever select `Ready`
/// slots, so a `current` argument pointing at an `Unused` slot is
/// harmless), and load that winner's context directly.
///
/// # Safety
/// Must only be called from [`crate::process::process_entry_trampoline`]
/// after the process's program function has returned, with interrupts
/// still enabled (it masks them itself) and the process's own stack
/// still the active hardware stack.
pub unsafe fn terminate_current_process() -> ! {
    unsafe {
        crate::sync::disable_global_interrupts_for_termination();
        let finished = CUR;
        TABLE[finished as usize].state = ProcessState::Unused;
        TABLE[finished as usize].program = None;
        defmt::debug!("process {} terminated, slot reclaimed", finished);

        let winner = strategy::select_next(STRATEGY, &TABLE, finished, &mut SCHED_INFO);
        TABLE[winner as usize].state = ProcessState::Running;
        CUR = winner;

        let winner_sp = TABLE[winner as usize].sp;
        if TABLE[winner as usize].compute_checksum() != TABLE[winner as usize].checksum {
            fatal_error("stack checksum mismatch");
        }

        crate::arch::avr::start_first_process(winner_sp)
    }
}

/// Read-only view of a process slot. Matches `spec.md` §6's exposed
/// `get_process_slot(pid) -> &Process`: a shared reference, so callers
/// (the task manager hook, diagnostics, `kernel::get_stack_checksum`)
/// can observe a slot's state without being able to mutate `priority`
/// or any other field the table itself is supposed to own post-`exec`.
pub fn get_process_slot(pid: ProcessId) -> &'static Process {
    // SAFETY: a shared read of one array element. Concurrent mutation
    // only ever happens from ISR context or under a held critical
    // section; callers needing a snapshot consistent with a concurrent
    // tick should wrap this in `enter_critical_section`/
    // `leave_critical_section` themselves, the same caveat as
    // `get_current_proc`.
    unsafe { &TABLE[pid as usize] }
}

/// Mutable access to a process slot, for the kernel's own bookkeeping
/// (`exec`, `init_scheduler`, `start_scheduler`). Not part of the
/// exposed interface in `spec.md` §6 — external callers get only the
/// shared [`get_process_slot`].
///
/// # Safety
/// Caller must not retain the reference across a point where the slot
/// could be concurrently mutated from ISR context; callers typically
/// already hold the critical section.
pub(crate) unsafe fn get_process_slot_mut(pid: ProcessId) -> &'static mut Process {
    unsafe { &mut TABLE[pid as usize] }
}

/// The id of the currently running process.
pub fn get_current_proc() -> ProcessId {
    // SAFETY: a single byte read; ISR writes are atomic on AVR for a u8.
    unsafe { CUR }
}

/// Set the currently running process id. Used only by `kernel::start_scheduler`.
///
/// # Safety
/// Must only be called before the timer interrupt is enabled.
pub unsafe fn set_current_proc(pid: ProcessId) {
    unsafe { CUR = pid };
}

/// Get the active scheduling strategy.
pub fn get_scheduling_strategy() -> SchedulingStrategy {
    // SAFETY: a single byte-sized enum read, always inside a critical
    // section at call sites that need consistency with `set`.
    unsafe { STRATEGY }
}

/// Set the active scheduling strategy and reset its bookkeeping.
pub fn set_scheduling_strategy(strategy: SchedulingStrategy) {
    crate::sync::critical_section(|| unsafe {
        strategy::reset_scheduling_information(strategy, &TABLE, CUR, &mut SCHED_INFO);
        STRATEGY = strategy;
    });
}

/// Clear a slot's aging bookkeeping. Called by `kernel::exec` when a new
/// process takes over a slot.
pub fn reset_process_scheduling_information(pid: ProcessId) {
    unsafe { strategy::reset_process_scheduling_information(&mut SCHED_INFO, pid) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_current_proc_starts_at_idle() {
        assert_eq!(get_current_proc(), IDLE_PROCESS);
    }
}
