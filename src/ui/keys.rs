//! Function keys, key-bound callbacks and key encoding
//!
//! The decoder recognizes a fixed set of VT sequences. [`KeyMapper`] produces
//! exactly those sequences from crossterm key events, which lets a host that
//! already receives `KeyEvent`s feed a session, and lets tests speak in keys
//! rather than raw bytes.

use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Function keys F1 to F12
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKey {
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl FunctionKey {
    const ALL: [FunctionKey; 12] = [
        FunctionKey::F1,
        FunctionKey::F2,
        FunctionKey::F3,
        FunctionKey::F4,
        FunctionKey::F5,
        FunctionKey::F6,
        FunctionKey::F7,
        FunctionKey::F8,
        FunctionKey::F9,
        FunctionKey::F10,
        FunctionKey::F11,
        FunctionKey::F12,
    ];

    /// Key number as printed on the keyboard, F1 = 1
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    /// VT sequence sent by the terminal for this key
    pub fn sequence(self) -> &'static [u8] {
        match self {
            FunctionKey::F1 => b"\x1bOP",
            FunctionKey::F2 => b"\x1bOQ",
            FunctionKey::F3 => b"\x1bOR",
            FunctionKey::F4 => b"\x1bOS",
            FunctionKey::F5 => b"\x1b[15~",
            FunctionKey::F6 => b"\x1b[17~",
            FunctionKey::F7 => b"\x1b[18~",
            FunctionKey::F8 => b"\x1b[19~",
            FunctionKey::F9 => b"\x1b[20~",
            FunctionKey::F10 => b"\x1b[21~",
            FunctionKey::F11 => b"\x1b[23~",
            FunctionKey::F12 => b"\x1b[24~",
        }
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.number())
    }
}

/// What a callback wants done with the current line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineEdit {
    /// Replacement text; `None` keeps the current line
    pub line: Option<Vec<u8>>,
    /// Cursor position after the edit
    pub cursor: usize,
}

impl LineEdit {
    pub fn keep(cursor: usize) -> Self {
        Self { line: None, cursor }
    }

    pub fn replace(line: impl Into<Vec<u8>>, cursor: usize) -> Self {
        Self {
            line: Some(line.into()),
            cursor,
        }
    }
}

/// Called when a function key is decoded.
///
/// The handler may write anything to the terminal; the line is redrawn
/// from column 0 afterwards, so a handler that prints should leave the
/// terminal where the line is expected to start (after a prompt, say).
pub trait FunctionKeyHandler {
    fn on_function_key(&mut self, key: FunctionKey, line: &[u8], cursor: usize) -> LineEdit;
}

impl<F> FunctionKeyHandler for F
where
    F: FnMut(FunctionKey, &[u8], usize) -> LineEdit,
{
    fn on_function_key(&mut self, key: FunctionKey, line: &[u8], cursor: usize) -> LineEdit {
        self(key, line, cursor)
    }
}

/// Called on TAB when completion is configured
pub trait Completer {
    fn complete(&mut self, line: &[u8], cursor: usize) -> LineEdit;
}

impl<F> Completer for F
where
    F: FnMut(&[u8], usize) -> LineEdit,
{
    fn complete(&mut self, line: &[u8], cursor: usize) -> LineEdit {
        self(line, cursor)
    }
}

/// TAB key behavior
pub enum TabBehavior {
    /// Insert this many spaces
    Spaces(usize),
    /// Ask a completer for a replacement line
    Complete(Box<dyn Completer>),
}

impl Default for TabBehavior {
    fn default() -> Self {
        TabBehavior::Spaces(4)
    }
}

impl fmt::Debug for TabBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabBehavior::Spaces(n) => f.debug_tuple("Spaces").field(n).finish(),
            TabBehavior::Complete(_) => f.write_str("Complete(..)"),
        }
    }
}

/// Key mapper for converting key events to the bytes the decoder understands
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent to input bytes
    pub fn map(event: &KeyEvent) -> Option<Vec<u8>> {
        match event.code {
            KeyCode::Char(ch) => Self::map_char(ch, event.modifiers),
            KeyCode::Enter => Some(vec![b'\r']),
            KeyCode::Backspace => Some(vec![0x7F]),
            KeyCode::Tab => Some(vec![b'\t']),
            KeyCode::Esc => Some(vec![0x1B]),

            // Arrow keys
            KeyCode::Up => Some(b"\x1b[A".to_vec()),
            KeyCode::Down => Some(b"\x1b[B".to_vec()),
            KeyCode::Right => Some(b"\x1b[C".to_vec()),
            KeyCode::Left => Some(b"\x1b[D".to_vec()),

            // Navigation keys
            KeyCode::Home => Some(b"\x1b[H".to_vec()),
            KeyCode::End => Some(b"\x1b[F".to_vec()),
            KeyCode::PageUp => Some(b"\x1b[5~".to_vec()),
            KeyCode::PageDown => Some(b"\x1b[6~".to_vec()),
            KeyCode::Insert => Some(b"\x1b[2~".to_vec()),
            KeyCode::Delete => Some(b"\x1b[3~".to_vec()),

            KeyCode::F(n) => FunctionKey::from_number(n).map(|key| key.sequence().to_vec()),

            _ => None,
        }
    }

    /// Map a string of plain characters
    pub fn map_str(text: &str) -> Vec<u8> {
        text.chars()
            .filter_map(|ch| Self::map_char(ch, KeyModifiers::NONE))
            .flatten()
            .collect()
    }

    /// Map a character; only Latin-1 characters can be typed into a line
    fn map_char(ch: char, mods: KeyModifiers) -> Option<Vec<u8>> {
        if mods.contains(KeyModifiers::CONTROL) {
            return match ch {
                'a'..='z' => Some(vec![ch as u8 - b'a' + 1]),
                'A'..='Z' => Some(vec![ch as u8 - b'A' + 1]),
                '@' | ' ' => Some(vec![0x00]),
                '[' => Some(vec![0x1B]),
                _ => None,
            };
        }

        if u32::from(ch) > 0xFF {
            return None;
        }

        let mut buf = [0u8; 4];
        Some(ch.encode_utf8(&mut buf).as_bytes().to_vec())
    }
}
