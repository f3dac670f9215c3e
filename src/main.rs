//! # tickcore example firmware
//!
//! Wires a concrete [`tickcore::hooks::Hooks`] implementation against the
//! ATmega328P's USART0 (for `output_char`/`read_input`) and boots the
//! scheduler with three demo programs:
//!
//! | Program | Priority | Behaviour |
//! |---------|----------|-----------|
//! | `counter_task` | 1 | Loops forever, never returns — exercises ordinary preemption. |
//! | `one_shot_task` | 2 | Does a fixed amount of work, then returns — exercises the termination trampoline. |
//! | `burst_task` | 3 | A short burst of returning/re-registering itself, demonstrating `exec` called from a running program. |

#![no_std]
#![no_main]

use panic_halt as _;

use tickcore::strategy::SchedulingStrategy;
use tickcore::{hooks, kernel, process::Program};

/// Demo USART-backed `Hooks` implementation.
///
/// Every method here is a thin wrapper over `avr_device::atmega328p`
/// register access — no delay/serial HAL crate is in the dependency
/// stack (see `DESIGN.md`), matching the teacher's own preference for
/// talking to its peripherals (`SYST`, `NVIC`) directly through the PAC
/// rather than through a higher-level HAL.
struct UsartHooks;

impl UsartHooks {
    /// Busy-wait loop calibrated to roughly 1ms per 1000 iterations at a
    /// 16MHz clock. Approximate by design — `tickcore` has no timer
    /// hook of its own to borrow for delays, and pulling in a delay
    /// crate just for the demo firmware isn't worth a new dependency.
    fn spin(iterations: u32) {
        for _ in 0..iterations {
            // SAFETY: a single `nop`, no side effects beyond burning a cycle.
            unsafe { core::arch::asm!("nop") };
        }
    }
}

impl hooks::Hooks for UsartHooks {
    fn read_input(&self) -> u8 {
        // SAFETY: read-only status/data register access; UDR0 is safe to
        // read speculatively (returns stale data, never a fault) even
        // when RXC0 isn't set.
        unsafe {
            let usart = avr_device::atmega328p::Peripherals::steal().USART0;
            if usart.ucsr0a.read().rxc0().bit_is_set() {
                usart.udr0.read().bits()
            } else {
                0
            }
        }
    }

    fn wait_for_no_input(&self) {
        while self.read_input() != 0 {
            Self::spin(1000);
        }
    }

    fn task_manager_main(&self) {
        for c in "[task manager]".chars() {
            self.output_char(c);
        }
    }

    fn fatal_error(&self, message: &str) -> ! {
        for c in "FATAL: ".chars() {
            self.output_char(c);
        }
        for c in message.chars() {
            self.output_char(c);
        }
        loop {
            // SAFETY: halting spin with interrupts left as-is; there is
            // nothing left to recover.
            unsafe { core::arch::asm!("nop") };
        }
    }

    fn output_char(&self, c: char) {
        // SAFETY: polls UDRE0 before writing, the standard AVR USART
        // transmit sequence.
        unsafe {
            let usart = avr_device::atmega328p::Peripherals::steal().USART0;
            while usart.ucsr0a.read().udre0().bit_is_clear() {}
            usart.udr0.write(|w| w.bits(c as u8));
        }
    }

    fn delay_ms(&self, ms: u16) {
        for _ in 0..ms {
            Self::spin(1000);
        }
    }
}

static HOOKS: UsartHooks = UsartHooks;

/// Loops forever without ever returning — an ordinary preemptible
/// program, never reclaimed by the termination trampoline.
extern "C" fn counter_task() {
    let mut counter: u32 = 0;
    loop {
        counter = counter.wrapping_add(1);
    }
}

/// Does a bounded amount of work, then returns — its slot is reclaimed
/// by [`tickcore::process::process_entry_trampoline`] on return.
extern "C" fn one_shot_task() {
    let mut total: u32 = 0;
    for i in 0..10_000u32 {
        total = total.wrapping_add(i);
    }
    hooks::hooks().output_char('1');
}

/// Re-registers itself before returning, so the system always has the
/// same number of live programs despite this one terminating every run.
extern "C" fn burst_task() {
    for i in 0..2_000u32 {
        core::hint::black_box(i);
    }
    hooks::hooks().output_char('b');
    let _ = kernel::exec(Some(burst_task), 3);
}

const AUTOSTART: &[Program] = &[counter_task, one_shot_task, burst_task];

fn configure_timer2_compa() {
    // SAFETY: runs once at boot, before interrupts are enabled. Sets up
    // TIMER2 in CTC mode with a compare value chosen for a ~1ms tick at
    // 16MHz/1024 prescale; the exact reload value is a firmware-owned
    // choice per `SPEC_FULL.md` §1 ("hardware timer *configuration* ...
    // out of scope" for the core, but still needed somewhere for the
    // demo to actually tick).
    unsafe {
        let tc2 = avr_device::atmega328p::Peripherals::steal().TC2;
        tc2.tccr2a.write(|w| w.wgm2().ctc());
        tc2.tccr2b.write(|w| w.cs2().prescale_1024());
        tc2.ocr2a.write(|w| w.bits(124));
    }
}

#[avr_device::entry]
fn main() -> ! {
    hooks::register_hooks(&HOOKS);
    configure_timer2_compa();
    kernel::set_strategy(SchedulingStrategy::RoundRobin);

    // SAFETY: called once, before interrupts are enabled, from the main
    // thread — exactly `init_scheduler`'s contract.
    unsafe { kernel::init_scheduler(AUTOSTART) };

    // SAFETY: called exactly once, immediately after `init_scheduler`.
    unsafe { kernel::start_scheduler() }
}
