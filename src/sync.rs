//! # Synchronization primitive
//!
//! The scheduler's critical section. Unlike a generic `interrupt::free`
//! that masks every interrupt source, this masks only the scheduler's
//! own timer-compare interrupt (`TIMER2_COMPA`) — other interrupts keep
//! running while the process table is being mutated. A nesting counter
//! lets critical sections compose: the interrupt is only re-enabled once
//! the outermost section exits.
//!
//! The real `OCIE2A`-masking body only compiles for the AVR target; host
//! unit tests (`cfg(test)`, built for the host triple per `SPEC_FULL.md`
//! §2.11) get a plain nesting counter with no hardware register access,
//! since `avr_device::interrupt::free` is AVR-only inline assembly and
//! cannot be linked into a host test binary.

use crate::config::CRITICAL_SECTION_MAX_NESTING;
use crate::hooks::fatal_error;

/// How many critical sections are currently nested. Only ever touched
/// with global interrupts masked, so plain reads/writes are sound.
static mut NESTING: u8 = 0;

#[cfg(not(test))]
mod hw {
    use super::{fatal_error, CRITICAL_SECTION_MAX_NESTING, NESTING};
    use avr_device::interrupt;

    /// Disable the scheduler's timer interrupt, entering (or deepening) a
    /// critical section.
    ///
    /// Mirrors the source's `os_enterCriticalSection`: save and clear the
    /// global interrupt flag, bump the nesting counter, clear `OCIE2A`,
    /// then restore the global flag to whatever it was on entry.
    pub fn enter_critical_section() {
        interrupt::free(|_cs| {
            // SAFETY: global interrupts are masked for the duration of
            // this closure, so `NESTING` cannot be touched concurrently.
            let nesting = unsafe { &mut NESTING };
            if *nesting == CRITICAL_SECTION_MAX_NESTING {
                fatal_error("critical section overflow");
            }
            *nesting += 1;

            // SAFETY: stealing the peripheral singleton here is sound —
            // we only ever write the single `OCIE2A` bit, and access is
            // already serialized by the outer `interrupt::free`.
            let tc2 = unsafe { avr_device::atmega328p::Peripherals::steal().TC2 };
            tc2.timsk2.modify(|_, w| w.ocie2a().clear_bit());
        });
    }

    /// Re-enable the scheduler's timer interrupt once the outermost
    /// critical section exits.
    ///
    /// Mirrors `os_leaveCriticalSection`: decrementing past the matching
    /// `enter_critical_section` is a programming error, not a
    /// recoverable one.
    pub fn leave_critical_section() {
        interrupt::free(|_cs| {
            // SAFETY: see `enter_critical_section`.
            let nesting = unsafe { &mut NESTING };
            if *nesting == 0 {
                fatal_error("critical sections don't match");
            }
            *nesting -= 1;

            if *nesting == 0 {
                // SAFETY: see `enter_critical_section`.
                let tc2 = unsafe { avr_device::atmega328p::Peripherals::steal().TC2 };
                tc2.timsk2.modify(|_, w| w.ocie2a().set_bit());
            }
        });
    }

    /// Clear the global interrupt flag without touching the nesting
    /// counter or `OCIE2A`.
    ///
    /// Used only by [`crate::scheduler::terminate_current_process`],
    /// which never returns: it jumps into a new process whose own
    /// interrupt return (`reti`) unconditionally re-enables global
    /// interrupts, the same way hardware auto-clears the flag on any
    /// interrupt entry. Going through the nested
    /// `enter_critical_section`/`leave_critical_section` pair here would
    /// leave the nesting counter permanently incremented and the
    /// scheduler's own tick masked forever, since the matching "leave"
    /// would never run.
    ///
    /// # Safety
    /// Caller must guarantee control reaches a `reti` (directly or via
    /// [`crate::arch::avr::restore_context`]) without returning here
    /// first.
    pub unsafe fn disable_global_interrupts_for_termination() {
        unsafe { interrupt::disable() };
    }
}

#[cfg(test)]
mod hw {
    use super::{fatal_error, CRITICAL_SECTION_MAX_NESTING, NESTING};

    /// Host stand-in: tracks nesting depth with the same over/underflow
    /// checks as the real implementation, without touching any hardware
    /// register (there is none on the host).
    pub fn enter_critical_section() {
        // SAFETY: host tests are single-threaded per test function; no
        // concurrent mutation of `NESTING` within one test.
        let nesting = unsafe { &mut NESTING };
        if *nesting == CRITICAL_SECTION_MAX_NESTING {
            fatal_error("critical section overflow");
        }
        *nesting += 1;
    }

    pub fn leave_critical_section() {
        // SAFETY: see `enter_critical_section`.
        let nesting = unsafe { &mut NESTING };
        if *nesting == 0 {
            fatal_error("critical sections don't match");
        }
        *nesting -= 1;
    }

    /// # Safety
    /// No hardware effect on the host; kept for API parity with the real
    /// implementation so callers compile unchanged under `cfg(test)`.
    pub unsafe fn disable_global_interrupts_for_termination() {}
}

pub use hw::{disable_global_interrupts_for_termination, enter_critical_section, leave_critical_section};

/// Run `f` inside a critical section, releasing it again on every exit
/// path (including early returns and panics that unwind — though a
/// `no_std` build aborts rather than unwinds).
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    enter_critical_section();
    let result = f();
    leave_critical_section();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_round_trips_and_detects_underflow() {
        // Reset any residual nesting from other tests sharing this
        // process's statics.
        while std::panic::catch_unwind(leave_critical_section).is_ok() {}

        enter_critical_section();
        enter_critical_section();
        leave_critical_section();
        leave_critical_section();

        let result = std::panic::catch_unwind(leave_critical_section);
        assert!(result.is_err());
    }
}
