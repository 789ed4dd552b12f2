//! Escape-sequence decoder and key dispatch
//!
//! Input arrives one byte at a time. Each call to [`Editor::step`] reads what
//! the current [`State`] needs, applies the edit and reports the next state
//! as a [`Transition`]. Bytes that turn out not to belong to a sequence are
//! pushed back and handled again from [`State::Start`].
//!
//! ```text
//!  Start ──^A ^B ^E ^F ESC──> EscDispatch ──ESC──> Esc ──[──> EscBracket ──1──> Pf5to8Digit2
//!    │                           ^   │              │              │ └──2x──> Pf9to12Digit2
//!    │                           │   └─other─┐      └──O──> EscO   │
//!    │                           └───A B C D H F 5~ 6~─────────────┘
//!    ├──C2 C3──> AccentByte2
//!    ├──0x80──> ControlMessage ──> LineComplete
//!    └──CR LF──> LineComplete
//! ```

use std::collections::VecDeque;
use std::io;

use bitflags::bitflags;

use super::buffer::{LineBuffer, Whence};
use super::channel::{read_byte, ByteChannel, Fetch};
use crate::config::Config;
use crate::error::LineError;
use crate::history::{Browse, HistoryRing};
use crate::ui::keys::{FunctionKey, FunctionKeyHandler, TabBehavior};

const fn ctrl(c: u8) -> u8 {
    c - b'@'
}

const CTRL_A: u8 = ctrl(b'A');
const CTRL_B: u8 = ctrl(b'B');
const CTRL_D: u8 = ctrl(b'D');
const CTRL_E: u8 = ctrl(b'E');
const CTRL_F: u8 = ctrl(b'F');
const CTRL_H: u8 = ctrl(b'H');
const CTRL_K: u8 = ctrl(b'K');
const ESC: u8 = 0x1B;
const DEL: u8 = 0x7F;

/// Lead byte of an out-of-band control message: `0x80 <len> <payload...>`
pub(crate) const CONTROL_MESSAGE: u8 = 0x80;

/// Decoder states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum State {
    #[default]
    Start,
    /// After a movement key or ESC; keeps handling movement keys
    EscDispatch,
    Esc,
    EscBracket,
    EscO,
    /// `ESC [ 1` read; F5 to F8 follow
    Pf5to8Digit2,
    /// `ESC [ 2` read; F9 to F12 follow
    Pf9to12Digit2,
    /// Second byte of a 2-byte Latin-1 character
    AccentByte2,
    /// Reading a control message payload
    ControlMessage,
    LineComplete,
    EndOfSession,
}

/// Outcome of one decoder step
#[derive(Debug)]
pub(crate) enum Transition {
    Stay,
    RevertToPrevious,
    MoveTo(State),
    /// No input available yet; resume in the same state
    Await,
    Fail(LineError),
}

bitflags! {
    /// Runtime switches of a session
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modes: u8 {
        const ECHO         = 0b01;
        const NON_BLOCKING = 0b10;
    }
}

/// Most bytes ever pending re-read
pub(crate) const PUSHBACK_CAPACITY: usize = 2;

/// Bytes returned to the input, read again before anything new
#[derive(Debug, Default)]
pub(crate) struct Pushback {
    bytes: VecDeque<u8>,
}

impl Pushback {
    pub fn push(&mut self, b: u8) {
        debug_assert!(
            self.bytes.len() < PUSHBACK_CAPACITY,
            "pushback overflow: {:?}",
            self.bytes
        );
        if self.bytes.len() >= PUSHBACK_CAPACITY {
            tracing::warn!("Pushback full, dropping 0x{:02x}", self.bytes[self.bytes.len() - 1]);
            self.bytes.truncate(PUSHBACK_CAPACITY - 1);
        }
        self.bytes.push_front(b);
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.bytes.pop_front()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

/// Read the next byte or leave the handler.
///
/// With `keep`, a byte already consumed by the handler is pushed back before
/// suspending so the handler sees the same sequence when it resumes.
macro_rules! next_byte_or_return {
    ($self:ident, $channel:ident) => {
        match $self.next_byte($channel) {
            Ok(Fetch::Byte(b)) => b,
            Ok(Fetch::WouldBlock) => return $self.would_block(),
            Ok(Fetch::Closed) => return Transition::MoveTo(State::EndOfSession),
            Err(e) => return Transition::Fail(e.into()),
        }
    };
    ($self:ident, $channel:ident, keep $first:expr) => {
        match $self.next_byte($channel) {
            Ok(Fetch::Byte(b)) => b,
            Ok(Fetch::WouldBlock) => {
                $self.pushback.push($first);
                return $self.would_block();
            }
            Ok(Fetch::Closed) => return Transition::MoveTo(State::EndOfSession),
            Err(e) => return Transition::Fail(e.into()),
        }
    };
}

/// Everything the decoder edits
pub(crate) struct Editor {
    pub line: LineBuffer,
    /// Line as it was before browsing started; the "below newest" history entry
    pub saved: Vec<u8>,
    pub history: HistoryRing,
    pub pushback: Pushback,
    pub modes: Modes,
    pub shortcut: Option<u8>,
    pub tab: TabBehavior,
    pub function_keys: Option<Box<dyn FunctionKeyHandler>>,
    /// The line holds a control message rather than typed text
    pub control: bool,
}

impl Editor {
    pub fn new(config: &Config) -> Self {
        let mut modes = Modes::empty();
        modes.set(Modes::ECHO, config.echo);
        modes.set(Modes::NON_BLOCKING, config.non_blocking);

        Self {
            line: LineBuffer::new(config.max_line_length, config.echo),
            saved: Vec::new(),
            history: HistoryRing::new(config.history.capacity),
            pushback: Pushback::default(),
            modes,
            shortcut: config.shortcut_byte(),
            tab: TabBehavior::Spaces(config.tab.spaces),
            function_keys: None,
            control: false,
        }
    }

    pub fn set_echo(&mut self, enabled: bool) -> bool {
        let prev = self.line.echo().is_enabled();
        self.modes.set(Modes::ECHO, enabled);
        self.line.echo_mut().set_enabled(enabled);
        prev
    }

    /// Drop the line in progress and everything tied to it
    pub fn reset(&mut self) {
        self.line.clear();
        self.line.echo_mut().discard();
        self.saved.clear();
        self.pushback.clear();
        self.control = false;
        self.history.reset();
    }

    /// Run the handler for `state` once
    pub fn step<C: ByteChannel + ?Sized>(&mut self, state: State, channel: &mut C) -> Transition {
        match state {
            State::Start => self.start(channel),
            State::EscDispatch => self.esc_dispatch(channel),
            State::Esc => self.esc(channel),
            State::EscBracket => self.esc_bracket(channel),
            State::EscO => self.esc_o(channel),
            State::Pf5to8Digit2 => self.pf5_to_8(channel),
            State::Pf9to12Digit2 => self.pf9_to_12(channel),
            State::AccentByte2 => self.accent(channel),
            State::ControlMessage => self.control_message(channel),
            // Terminal states are consumed by the session before stepping again
            State::LineComplete | State::EndOfSession => Transition::MoveTo(state),
        }
    }

    fn next_byte<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> io::Result<Fetch> {
        match self.pushback.pop() {
            Some(b) => Ok(Fetch::Byte(b)),
            None => read_byte(channel),
        }
    }

    fn would_block(&self) -> Transition {
        if self.modes.contains(Modes::NON_BLOCKING) {
            Transition::Await
        } else {
            Transition::Fail(io::Error::from(io::ErrorKind::WouldBlock).into())
        }
    }

    fn snapshot(&mut self) {
        self.saved.clear();
        self.saved.extend_from_slice(self.line.as_bytes());
    }

    fn start<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> Transition {
        let c = next_byte_or_return!(self, channel);
        tracing::trace!("start: 0x{:02x}", c);

        match c {
            // Some terminals send NUL in place of LF
            0x00 => Transition::Stay,

            CTRL_A | CTRL_B | CTRL_E | CTRL_F | ESC => {
                self.snapshot();
                self.pushback.push(c);
                Transition::MoveTo(State::EscDispatch)
            }

            0xC2 | 0xC3 => {
                self.snapshot();
                self.pushback.push(c);
                Transition::MoveTo(State::AccentByte2)
            }

            CONTROL_MESSAGE => {
                if !self.line.is_empty() {
                    // Finish the typed line; the message starts the next one
                    self.pushback.push(c);
                    self.line.echo_mut().push_raw(b"\n");
                    return Transition::MoveTo(State::LineComplete);
                }
                if !self.line.push_raw(c) {
                    return Transition::Fail(LineError::ControlMessageTooLong { len: 0, max: 0 });
                }
                self.control = true;
                Transition::MoveTo(State::ControlMessage)
            }

            b'\t' => {
                self.tab();
                Transition::Stay
            }

            b'\r' | b'\n' => {
                self.line.echo_mut().push_raw(b"\n");
                Transition::MoveTo(State::LineComplete)
            }

            CTRL_K => {
                self.line.truncate();
                Transition::Stay
            }

            CTRL_D => {
                if self.line.delete_at_cursor() {
                    Transition::Stay
                } else if self.line.is_empty() {
                    Transition::MoveTo(State::EndOfSession)
                } else {
                    self.line.echo_mut().bell();
                    Transition::Stay
                }
            }

            CTRL_H | DEL => {
                if self.line.cursor() > 0 {
                    self.line.move_cursor(-1, Whence::Cursor);
                    self.line.delete_at_cursor();
                } else {
                    self.line.echo_mut().bell();
                }
                Transition::Stay
            }

            _ => {
                self.line.insert(c);
                Transition::Stay
            }
        }
    }

    fn tab(&mut self) {
        match &mut self.tab {
            TabBehavior::Spaces(n) => {
                for _ in 0..*n {
                    self.line.insert(b' ');
                }
            }
            TabBehavior::Complete(completer) => {
                let edit = completer.complete(self.line.as_bytes(), self.line.cursor());
                if let Some(new_line) = edit.line {
                    self.line.replace_line(&new_line, edit.cursor);
                }
            }
        }
    }

    fn esc_dispatch<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> Transition {
        let c = next_byte_or_return!(self, channel);
        let cursor = self.line.cursor();
        let len = self.line.len();

        match c {
            CTRL_A => {
                if cursor > 0 {
                    self.line.move_cursor(0, Whence::Set);
                } else {
                    self.line.echo_mut().bell();
                }
                Transition::Stay
            }
            CTRL_B => {
                if cursor > 0 {
                    self.line.move_cursor(-1, Whence::Cursor);
                } else {
                    self.line.echo_mut().bell();
                }
                Transition::Stay
            }
            CTRL_F => {
                if cursor < len {
                    self.line.move_cursor(1, Whence::Cursor);
                } else {
                    self.line.echo_mut().bell();
                }
                Transition::Stay
            }
            CTRL_E => {
                if cursor < len {
                    self.line.move_cursor(0, Whence::End);
                } else {
                    self.line.echo_mut().bell();
                }
                Transition::Stay
            }
            ESC => Transition::MoveTo(State::Esc),
            _ => {
                self.pushback.push(c);
                Transition::MoveTo(State::Start)
            }
        }
    }

    fn esc<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> Transition {
        match next_byte_or_return!(self, channel) {
            b'[' => Transition::MoveTo(State::EscBracket),
            b'O' => Transition::MoveTo(State::EscO),
            c => {
                tracing::debug!("Unhandled ESC 0x{:02x}", c);
                self.pushback.push(c);
                Transition::MoveTo(State::Start)
            }
        }
    }

    fn esc_bracket<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> Transition {
        let c = next_byte_or_return!(self, channel);

        match c {
            b'A' | b'B' => self.recall(c),

            b'C' => {
                if self.line.cursor() < self.line.len() {
                    self.line.move_cursor(1, Whence::Cursor);
                } else {
                    self.line.echo_mut().bell();
                }
                Transition::MoveTo(State::EscDispatch)
            }
            b'D' => {
                if self.line.cursor() > 0 {
                    self.line.move_cursor(-1, Whence::Cursor);
                } else {
                    self.line.echo_mut().bell();
                }
                Transition::MoveTo(State::EscDispatch)
            }

            // Home and End behave as ^A and ^E
            b'H' => {
                self.pushback.push(CTRL_A);
                Transition::MoveTo(State::EscDispatch)
            }
            b'F' => {
                self.pushback.push(CTRL_E);
                Transition::MoveTo(State::EscDispatch)
            }

            // Page up / page down
            b'5' | b'6' => {
                let t = next_byte_or_return!(self, channel, keep c);
                if t != b'~' {
                    self.pushback.push(t);
                    return Transition::MoveTo(State::Start);
                }
                self.recall(c)
            }

            // Delete
            b'3' => {
                let t = next_byte_or_return!(self, channel, keep c);
                if t == b'~' {
                    if !self.line.delete_at_cursor() {
                        self.line.echo_mut().bell();
                    }
                } else {
                    self.pushback.push(t);
                }
                Transition::MoveTo(State::Start)
            }

            b'1' => Transition::MoveTo(State::Pf5to8Digit2),

            // Insert, or F9 to F12
            b'2' => {
                let t = next_byte_or_return!(self, channel, keep c);
                if t == b'~' {
                    return Transition::MoveTo(State::Start);
                }
                self.pushback.push(t);
                Transition::MoveTo(State::Pf9to12Digit2)
            }

            _ => {
                tracing::debug!("Unhandled CSI 0x{:02x}", c);
                self.pushback.push(c);
                Transition::MoveTo(State::Start)
            }
        }
    }

    /// History keys: up, down, oldest (page up), newest (page down)
    fn recall(&mut self, key: u8) -> Transition {
        if !self.history.is_enabled() {
            return Transition::MoveTo(State::Start);
        }

        let entry = match key {
            b'A' => match self.history.up() {
                Browse::Entry(line) => Some(line.to_vec()),
                Browse::Boundary => self.history.oldest().map(<[u8]>::to_vec),
                Browse::Empty => None,
            },
            b'B' => match self.history.down() {
                Browse::Entry(line) => Some(line.to_vec()),
                Browse::Boundary => Some(self.saved.clone()),
                Browse::Empty => None,
            },
            b'5' => self.history.oldest().map(<[u8]>::to_vec),
            _ => self.history.newest().map(<[u8]>::to_vec),
        };

        match entry {
            Some(line) => {
                self.line.replace_line(&line, line.len());
                Transition::MoveTo(State::EscDispatch)
            }
            None => Transition::MoveTo(State::Start),
        }
    }

    fn esc_o<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> Transition {
        let c = next_byte_or_return!(self, channel);

        match c {
            b'P'..=b'S' => {
                if let Some(key) = FunctionKey::from_number(c - b'P' + 1) {
                    self.function_key(key);
                }
            }
            _ => {
                tracing::debug!("Unhandled SS3 0x{:02x}", c);
                self.pushback.push(c);
            }
        }
        Transition::MoveTo(State::Start)
    }

    fn pf5_to_8<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> Transition {
        let digit = match self.pf_digits(channel) {
            Ok(Some(digit)) => digit,
            Ok(None) => return Transition::MoveTo(State::Start),
            Err(transition) => return transition,
        };
        let key = match digit {
            b'5' => Some(FunctionKey::F5),
            b'7' => Some(FunctionKey::F6),
            b'8' => Some(FunctionKey::F7),
            b'9' => Some(FunctionKey::F8),
            _ => None,
        };
        self.finish_pf(key, b'1', digit)
    }

    fn pf9_to_12<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> Transition {
        let digit = match self.pf_digits(channel) {
            Ok(Some(digit)) => digit,
            Ok(None) => return Transition::MoveTo(State::Start),
            Err(transition) => return transition,
        };
        let key = match digit {
            b'0' => Some(FunctionKey::F9),
            b'1' => Some(FunctionKey::F10),
            b'3' => Some(FunctionKey::F11),
            b'4' => Some(FunctionKey::F12),
            _ => None,
        };
        self.finish_pf(key, b'2', digit)
    }

    /// Read `<digit> ~`. `Ok(None)` when the `~` is missing; the byte found
    /// instead is pushed back.
    fn pf_digits<C: ByteChannel + ?Sized>(
        &mut self,
        channel: &mut C,
    ) -> Result<Option<u8>, Transition> {
        let digit = match self.next_byte(channel) {
            Ok(Fetch::Byte(b)) => b,
            Ok(Fetch::WouldBlock) => return Err(self.would_block()),
            Ok(Fetch::Closed) => return Err(Transition::MoveTo(State::EndOfSession)),
            Err(e) => return Err(Transition::Fail(e.into())),
        };
        let tilde = match self.next_byte(channel) {
            Ok(Fetch::Byte(b)) => b,
            Ok(Fetch::WouldBlock) => {
                self.pushback.push(digit);
                return Err(self.would_block());
            }
            Ok(Fetch::Closed) => return Err(Transition::MoveTo(State::EndOfSession)),
            Err(e) => return Err(Transition::Fail(e.into())),
        };

        if tilde != b'~' {
            self.pushback.push(tilde);
            return Ok(None);
        }
        Ok(Some(digit))
    }

    /// An unknown digit is read again from `Start`; its `~` is dropped.
    fn finish_pf(&mut self, key: Option<FunctionKey>, first: u8, digit: u8) -> Transition {
        match key {
            Some(key) => self.function_key(key),
            None => {
                tracing::debug!(
                    "Unhandled function key sequence ESC [ {} {} ~",
                    first as char,
                    digit as char
                );
                self.pushback.push(digit);
            }
        }
        Transition::MoveTo(State::Start)
    }

    fn function_key(&mut self, key: FunctionKey) {
        let Some(handler) = self.function_keys.as_mut() else {
            tracing::debug!("{} pressed, no handler installed", key);
            return;
        };

        let edit = handler.on_function_key(key, self.line.as_bytes(), self.line.cursor());

        // The handler may have printed anything; redraw from column 0
        self.line.assume_column_zero();
        match edit.line {
            Some(new_line) => self.line.replace_line(&new_line, edit.cursor),
            None => {
                let current = self.line.as_bytes().to_vec();
                self.line.replace_line(&current, edit.cursor);
            }
        }
    }

    fn accent<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> Transition {
        let first = next_byte_or_return!(self, channel);
        let second = next_byte_or_return!(self, channel, keep first);

        let decoded = match (first, second) {
            (0xC3, 0x80..=0xBF) => Some(second + 0x40),
            (0xC2, 0xA0..=0xBF) => Some(second),
            _ => None,
        };

        match decoded {
            Some(c) => {
                self.line.insert(c);
            }
            None => tracing::debug!("Dropping 0x{:02x} 0x{:02x}", first, second),
        }
        Transition::RevertToPrevious
    }

    fn control_message<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> Transition {
        let b = next_byte_or_return!(self, channel);

        if self.line.len() == 1 {
            let len = usize::from(b);
            let max = self.line.limit().saturating_sub(2);
            if len > max {
                return Transition::Fail(LineError::ControlMessageTooLong { len, max });
            }
        }

        if !self.line.push_raw(b) {
            let max = self.line.limit().saturating_sub(2);
            let len = match self.line.as_bytes() {
                [_, len, ..] => usize::from(*len),
                _ => usize::from(b),
            };
            return Transition::Fail(LineError::ControlMessageTooLong { len, max });
        }

        match self.line.as_bytes() {
            [_, len, payload @ ..] if payload.len() == usize::from(*len) => {
                Transition::MoveTo(State::LineComplete)
            }
            _ => Transition::Stay,
        }
    }
}
