//! Core line editing components.
//!
//! - **channel**: byte source/sink abstraction with non-blocking reads
//! - **buffer**: the edited line, its cursor and the echo each edit needs
//! - **fsm**: escape-sequence decoder dispatching keys to edits
//! - **session**: drives the decoder and post-processes finished lines
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── ByteChannel (terminal bytes in, echo out)
//! └── Editor (decoder state machine)
//!     ├── LineBuffer (text + cursor + pending echo)
//!     ├── HistoryRing (recorded lines)
//!     └── Pushback (bytes to read again)
//! ```

pub mod buffer;
pub mod channel;
pub mod fsm;
pub mod session;
