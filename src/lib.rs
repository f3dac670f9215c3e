//! # tickcore
//!
//! A preemptive multitasking scheduler core for a single-core 8-bit
//! microcontroller (AVR ATmega328P-class target).
//!
//! ## Overview
//!
//! `tickcore` owns a fixed-capacity process table and drives it with a
//! periodic-timer interrupt that performs a full context switch on every
//! tick, picking the next process to run via one of five interchangeable
//! [`strategy::SchedulingStrategy`] implementations. Everything the core
//! needs but does not own — raw input, the task-manager UI, character
//! output, timing delays, and fatal-error reporting — is reached through
//! the [`hooks::Hooks`] trait, registered once by the firmware at boot.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              Firmware (main.rs, a Hooks impl)            │
//! ├────────────────────────────────────────────────────────┤
//! │            Kernel API (kernel.rs)                        │
//! │     exec() · init_scheduler() · start_scheduler()        │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Strategy          │  Sync Primitives  │
//! │  scheduler.rs│   strategy.rs       │  sync.rs          │
//! │  ─ on_tick() │   ─ even/random/... │  ─ critical_section│
//! │  ─ terminate │   ─ SchedulingInfo  │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │              Process Table (process.rs)                 │
//! │    Process · ProcessState · process_entry_trampoline    │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/avr.rs)                       │
//! │    TIMER2_COMPA · save/restore_context · first launch   │
//! ├────────────────────────────────────────────────────────┤
//! │          ATmega328P-class AVR Hardware                  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory model
//!
//! - **No heap, no `alloc`**: every process table and stack is statically
//!   allocated (`[Process; N_MAX]`, each with its stack inline).
//! - **Fixed process table**: `N_MAX` slots, slot 0 always idle.
//! - **Critical sections**: a reentrant nesting counter masking only the
//!   scheduler's own `TIMER2_COMPA` interrupt, not every interrupt source.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod error;
pub mod hooks;
pub mod kernel;
pub mod process;
pub mod scheduler;
pub mod strategy;
pub mod sync;

use process::Program;

/// The mandatory idle process every boot registers into slot 0.
///
/// Writes a heartbeat character through [`hooks::Hooks::output_char`]
/// every [`config::DEFAULT_OUTPUT_DELAY`] milliseconds, forever — unlike
/// every other program this crate schedules, idle is never expected to
/// return (though nothing stops it from being preempted and resumed like
/// any other `Ready` slot).
pub extern "C" fn idle_program() {
    loop {
        hooks::hooks().output_char('.');
        hooks::hooks().delay_ms(config::DEFAULT_OUTPUT_DELAY);
    }
}

/// Type alias re-exported at the crate root for firmware convenience —
/// `tickcore::Program` instead of `tickcore::process::Program`.
pub type EntryPoint = Program;
