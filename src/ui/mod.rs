//! Terminal-facing helpers.
//!
//! - **keys**: function keys, key-bound callbacks and crossterm key encoding
//! - **terminal**: raw mode setup and restore

pub mod keys;
pub mod terminal;

pub use keys::{Completer, FunctionKey, FunctionKeyHandler, KeyMapper, LineEdit, TabBehavior};
pub use terminal::RawModeGuard;
