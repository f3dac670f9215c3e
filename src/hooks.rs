//! # Hooks
//!
//! The scheduler core deliberately knows nothing about the LCD, keyboard,
//! or timing hardware it runs alongside — those are out-of-scope
//! collaborators the surrounding firmware owns. This module is the single
//! seam between the two: a `Hooks` implementation is registered once at
//! boot, and the kernel and scheduler call through it instead of talking
//! to hardware directly. That keeps `process.rs`, `strategy.rs`, and
//! `scheduler.rs` host-testable without any AVR peripherals in scope.

/// Collaborators the scheduler core needs but does not own.
pub trait Hooks: Sync {
    /// Poll whatever input device the firmware uses, returning a code
    /// the scheduler compares against
    /// [`crate::config::TASK_MANAGER_INPUT_CODE`].
    fn read_input(&self) -> u8;

    /// Block until `read_input` would no longer report the task-manager
    /// code, so a held key doesn't retrigger the task manager every tick.
    fn wait_for_no_input(&self);

    /// Hand control to the task manager UI. Returns once the operator is
    /// done; the scheduler resumes the interrupted process afterwards.
    fn task_manager_main(&self);

    /// Report an unrecoverable error and halt. Does not return.
    fn fatal_error(&self, message: &str) -> !;

    /// Write one character of output (the idle process's heartbeat).
    fn output_char(&self, c: char);

    /// Busy- or sleep-wait for approximately `ms` milliseconds.
    fn delay_ms(&self, ms: u16);
}

/// The registered `Hooks` implementation. Set once by firmware startup
/// code before `kernel::init_scheduler` runs; read from ISR and non-ISR
/// context afterwards.
///
/// # Safety
/// Written exactly once, before interrupts are enabled, so no
/// synchronization is needed for the write. Reads afterwards only ever
/// observe the same `&'static dyn Hooks`.
static mut HOOKS: Option<&'static dyn Hooks> = None;

/// Register the firmware's `Hooks` implementation. Must be called before
/// `kernel::init_scheduler` and before interrupts are enabled.
pub fn register_hooks(hooks: &'static dyn Hooks) {
    // SAFETY: called from firmware startup, before interrupts are live.
    unsafe {
        HOOKS = Some(hooks);
    }
}

/// Fetch the registered hooks.
///
/// # Panics (well — halts)
/// If no hooks have been registered yet. This can only happen from a
/// firmware bug that starts the scheduler before `register_hooks`.
pub fn hooks() -> &'static dyn Hooks {
    // SAFETY: `HOOKS` is set once, before interrupts are enabled, and
    // never mutated again.
    match unsafe { HOOKS } {
        Some(h) => h,
        None => panic!("hooks not registered"),
    }
}

/// Convenience wrapper matching the shape of the original `os_errorPStr`
/// call sites: route straight through the registered hooks.
pub fn fatal_error(message: &str) -> ! {
    hooks().fatal_error(message)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use core::cell::RefCell;

    /// A `Hooks` implementation for host tests: records calls instead of
    /// touching hardware, and never actually halts on `fatal_error` so a
    /// test can assert it was invoked.
    pub struct RecordingHooks {
        pub input: RefCell<u8>,
        pub fatal: RefCell<Option<std::string::String>>,
        pub output: RefCell<std::string::String>,
    }

    impl RecordingHooks {
        pub fn new() -> Self {
            Self {
                input: RefCell::new(0),
                fatal: RefCell::new(None),
                output: RefCell::new(std::string::String::new()),
            }
        }
    }

    // SAFETY: test-only, exercised from a single host test thread at a
    // time — never shared with real interrupt context.
    unsafe impl Sync for RecordingHooks {}

    impl Hooks for RecordingHooks {
        fn read_input(&self) -> u8 {
            *self.input.borrow()
        }
        fn wait_for_no_input(&self) {}
        fn task_manager_main(&self) {}
        fn fatal_error(&self, message: &str) -> ! {
            *self.fatal.borrow_mut() = Some(message.into());
            panic!("fatal_error: {message}");
        }
        fn output_char(&self, c: char) {
            self.output.borrow_mut().push(c);
        }
        fn delay_ms(&self, _ms: u16) {}
    }
}
