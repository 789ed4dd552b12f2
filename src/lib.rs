//! ttyline - line editing for raw-mode terminals
//!
//! ttyline turns the byte stream of a terminal in raw mode into finished
//! command lines. It decodes VT escape sequences one byte at a time, keeps an
//! editable line with a cursor, echoes exactly what the terminal needs to
//! show each edit, and records lines in a fixed-size history.
//!
//! # Features
//!
//! - **Emacs-style editing**: ^A ^E ^B ^F ^D ^K, arrows, Home/End, Delete
//! - **History**: up/down browsing, page up/down for oldest/newest, `!!` and `!N`
//! - **Non-blocking input**: partial escape sequences survive a dry channel
//! - **Latin-1 lines**: accented characters decoded from and echoed as UTF-8
//! - **Callbacks**: function keys F1-F12 and TAB completion
//! - **Control messages**: `0x80 <len> <payload>` delivered out of band
//!
//! # Example
//!
//! ```no_run
//! use ttyline::{Config, Input, RawModeGuard, Session, StdioChannel};
//!
//! # fn main() -> ttyline::Result<()> {
//! let _raw = RawModeGuard::enter()?;
//! let mut session = Session::new(&Config::default(), StdioChannel::blocking())?;
//!
//! while let Input::Line(line) = session.next_line()? {
//!     println!("got {:?}\r", line);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod history;
pub mod ui;

pub use crate::config::Config;
pub use crate::core::channel::{ByteChannel, ReadStatus, ScriptedChannel, StdioChannel};
pub use crate::core::fsm::Modes;
pub use crate::core::session::{Input, Session};
pub use crate::error::{LineError, Result};
pub use crate::history::{Browse, HistoryRing};
pub use crate::ui::{
    Completer, FunctionKey, FunctionKeyHandler, KeyMapper, LineEdit, RawModeGuard, TabBehavior,
};
