//! Editable line and its terminal echo
//!
//! Every edit updates the stored bytes and queues the exact output needed to
//! make the terminal display match, assuming the terminal cursor sits at the
//! buffer cursor. Stored bytes are Latin-1; anything above 0x7F is echoed as
//! its 2-byte UTF-8 form.

/// Terminal alert
pub(crate) const BELL: u8 = 0x07;
/// Moves the terminal cursor one column left
pub(crate) const BACKSPACE: u8 = 0x08;

/// Append the terminal encoding of a Latin-1 byte
pub(crate) fn encode_latin1(c: u8, out: &mut Vec<u8>) {
    match c {
        0x00..=0x7F => out.push(c),
        0x80..=0xBF => out.extend_from_slice(&[0xC2, c]),
        0xC0..=0xFF => out.extend_from_slice(&[0xC3, c - 0x40]),
    }
}

/// Decode a stored line into text
pub(crate) fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Output queued by edits, written out by the session after each step
#[derive(Debug)]
pub(crate) struct Echo {
    enabled: bool,
    pending: Vec<u8>,
}

impl Echo {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            pending: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn push_char(&mut self, c: u8) {
        if self.enabled {
            encode_latin1(c, &mut self.pending);
        }
    }

    pub fn push_raw(&mut self, bytes: &[u8]) {
        if self.enabled {
            self.pending.extend_from_slice(bytes);
        }
    }

    pub fn backspaces(&mut self, n: usize) {
        if self.enabled {
            self.pending.extend(std::iter::repeat(BACKSPACE).take(n));
        }
    }

    pub fn spaces(&mut self, n: usize) {
        if self.enabled {
            self.pending.extend(std::iter::repeat(b' ').take(n));
        }
    }

    /// Alert the user; sent even when echo is off
    pub fn bell(&mut self) {
        self.pending.push(BELL);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }

    pub fn discard(&mut self) {
        self.pending.clear();
    }
}

/// Reference point for [`LineBuffer::move_cursor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Whence {
    /// Absolute column
    Set,
    /// Relative to the cursor
    Cursor,
    /// Columns back from the end of the line
    End,
}

/// The line being edited.
///
/// Invariant: `cursor <= bytes.len() <= limit`.
#[derive(Debug)]
pub(crate) struct LineBuffer {
    bytes: Vec<u8>,
    cursor: usize,
    limit: usize,
    echo: Echo,
}

impl LineBuffer {
    /// Buffer for lines of `capacity` slots; one is reserved, so `capacity - 1` are editable
    pub fn new(capacity: usize, echo: bool) -> Self {
        let limit = capacity.saturating_sub(1);
        Self {
            bytes: Vec::with_capacity(limit),
            cursor: 0,
            limit,
            echo: Echo::new(echo),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Most bytes the line can hold
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn echo(&self) -> &Echo {
        &self.echo
    }

    pub fn echo_mut(&mut self) -> &mut Echo {
        &mut self.echo
    }

    /// Insert `c` at the cursor. Rings the bell and returns false when the line is full.
    pub fn insert(&mut self, c: u8) -> bool {
        if self.bytes.len() >= self.limit {
            self.echo.bell();
            return false;
        }

        self.bytes.insert(self.cursor, c);

        // Redraw from the new byte to the end, then walk back over the tail
        for &b in &self.bytes[self.cursor..] {
            self.echo.push_char(b);
        }
        self.cursor += 1;
        self.echo.backspaces(self.bytes.len() - self.cursor);

        true
    }

    /// Delete the byte under the cursor. Returns false at end of line.
    pub fn delete_at_cursor(&mut self) -> bool {
        if self.cursor >= self.bytes.len() {
            return false;
        }

        self.bytes.remove(self.cursor);

        for &b in &self.bytes[self.cursor..] {
            self.echo.push_char(b);
        }
        // Blank the column freed at the end
        self.echo.spaces(1);
        self.echo.backspaces(self.bytes.len() - self.cursor + 1);

        true
    }

    /// Erase from the cursor to end of line
    pub fn truncate(&mut self) {
        let tail = self.bytes.len() - self.cursor;
        if tail == 0 {
            return;
        }

        self.echo.spaces(tail);
        self.echo.backspaces(tail);
        self.bytes.truncate(self.cursor);
    }

    /// Move the cursor, clamped to the line
    pub fn move_cursor(&mut self, offset: isize, whence: Whence) {
        let cursor = self.cursor as isize;
        let len = self.bytes.len() as isize;

        let delta = match whence {
            Whence::Set => offset.max(0) - cursor,
            Whence::Cursor => offset,
            Whence::End => len - offset - cursor,
        };

        if delta > 0 {
            // Forward: re-echo the characters passed over
            let end = self.cursor + (delta.min(len - cursor) as usize);
            for &b in &self.bytes[self.cursor..end] {
                self.echo.push_char(b);
            }
            self.cursor = end;
        } else if delta < 0 {
            let steps = (-delta).min(cursor) as usize;
            self.cursor -= steps;
            self.echo.backspaces(steps);
        }
    }

    /// Redraw with `line` in place of the current text and put the cursor at `cursor`
    pub fn replace_line(&mut self, line: &[u8], cursor: usize) {
        let old_len = self.bytes.len();

        self.move_cursor(0, Whence::Set);

        let keep = line.len().min(self.limit);
        self.bytes.clear();
        self.bytes.extend_from_slice(&line[..keep]);

        for &b in &self.bytes {
            self.echo.push_char(b);
        }
        self.cursor = self.bytes.len();

        // Erase what is left of a longer previous line
        if old_len > self.bytes.len() {
            let excess = old_len - self.bytes.len();
            self.echo.spaces(excess);
            self.echo.backspaces(excess);
        }

        self.move_cursor(cursor as isize, Whence::Set);
    }

    /// Forget where the terminal cursor is and take it to be at column 0
    pub fn assume_column_zero(&mut self) {
        self.cursor = 0;
    }

    /// Append a byte with no echo, for verbatim payloads. False when full.
    pub fn push_raw(&mut self, b: u8) -> bool {
        if self.bytes.len() >= self.limit {
            return false;
        }
        self.bytes.push(b);
        self.cursor = self.bytes.len();
        true
    }

    /// Hand over the finished line and start an empty one
    pub fn take(&mut self) -> Vec<u8> {
        self.cursor = 0;
        std::mem::take(&mut self.bytes)
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.cursor = 0;
    }
}
