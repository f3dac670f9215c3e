//! # Architecture abstraction layer
//!
//! Hardware-specific primitives the scheduler ISR needs and that cannot
//! go through an ordinary function call boundary: naked context
//! save/restore, the raw interrupt vector, and the one-time jump into
//! the first process. Currently implements the AVR port; extensible to
//! other architectures by adding sibling modules.

pub mod avr;

pub use avr::{restore_context, save_context, BOTTOM_OF_ISR_STACK};
