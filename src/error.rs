//! # Error types
//!
//! `exec`'s two non-fatal failure modes, mapped onto a `Result` rather
//! than the `INVALID_PROCESS` sentinel the original C implementation
//! returns. [`crate::process::INVALID_PROCESS`] is kept only as a
//! documented constant for spec-traceability; fatal conditions that truly
//! have no recoverable caller go through [`crate::hooks::Hooks::fatal_error`].

/// Why [`crate::kernel::exec`] could not register a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ExecError {
    /// Every slot in the process table is occupied.
    TableFull,
    /// The caller passed `None` for the program to register. A bare
    /// Rust function pointer can never itself be null, so `exec` takes
    /// `Option<Program>` precisely so this failure is representable.
    InvalidProgram,
}
