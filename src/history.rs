//! Command history for ttyline
//!
//! A fixed-capacity circular store of finalized lines with relative
//! up/down browsing and `!!` / `!N` shortcut recall.
//!
//! The browse cursor `cur` is signed. Until the ring wraps, entries live in
//! `slots[0..insert]` and `0 <= cur <= insert`. Once full, the oldest entries
//! sit at and after `insert`, and they are addressed with negative values of
//! `cur` (`slots[size + cur]`). Both cases reduce to:
//!
//! ```text
//!     -(size - insert) <= cur <= insert
//! ```
//!
//! where `cur == insert` is the reset position, just past the newest entry.

/// Result of moving the browse cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browse<'a> {
    /// The entry the cursor now points at
    Entry(&'a [u8]),
    /// Already at the oldest (up) or past the newest (down) entry
    Boundary,
    /// Nothing recorded yet
    Empty,
}

/// Circular history storage
#[derive(Debug, Clone)]
pub struct HistoryRing {
    /// Ring slots, `capacity` of them
    slots: Vec<Vec<u8>>,
    /// Next write slot
    insert: usize,
    /// Number of valid entries
    size: usize,
    /// Browse cursor
    cur: isize,
    /// Recording and browsing switched on
    enabled: bool,
}

impl HistoryRing {
    /// Create a ring holding up to `capacity` lines; 0 disables history
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Vec::new(); capacity],
            insert: 0,
            size: 0,
            cur: 0,
            enabled: capacity > 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch history on or off, returning the previous setting.
    /// A zero-capacity ring stays disabled.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        let prev = self.enabled;
        self.enabled = enabled && self.capacity() > 0;
        prev
    }

    /// Point the browse cursor just past the newest entry
    pub fn reset(&mut self) {
        self.cur = self.insert as isize;
    }

    /// Record a finalized line. Blank lines and repeats of the newest entry are skipped.
    pub fn add(&mut self, line: &[u8]) -> bool {
        if !self.enabled || is_blank(line) {
            return false;
        }

        if self.peek_newest() == Some(line) {
            return false;
        }

        let capacity = self.capacity();
        self.slots[self.insert] = line.to_vec();
        self.insert = (self.insert + 1) % capacity;
        if self.size < capacity {
            self.size += 1;
        }

        true
    }

    /// Step towards older entries
    pub fn up(&mut self) -> Browse<'_> {
        if self.size == 0 {
            return Browse::Empty;
        }

        if self.cur > self.lowest() {
            self.cur -= 1;
        } else {
            return Browse::Boundary;
        }

        Browse::Entry(&self.slots[self.physical(self.cur)])
    }

    /// Step towards newer entries; past the newest the cursor parks at the reset position
    pub fn down(&mut self) -> Browse<'_> {
        if self.size == 0 {
            return Browse::Empty;
        }

        if self.cur < self.insert as isize - 1 {
            self.cur += 1;
        } else {
            self.cur = self.insert as isize;
            return Browse::Boundary;
        }

        Browse::Entry(&self.slots[self.physical(self.cur)])
    }

    /// Oldest entry; moves the browse cursor onto it
    pub fn oldest(&mut self) -> Option<&[u8]> {
        if self.size == 0 {
            return None;
        }
        self.cur = self.lowest();
        Some(&self.slots[self.physical(self.cur)])
    }

    /// Newest entry; moves the browse cursor onto it
    pub fn newest(&mut self) -> Option<&[u8]> {
        if self.size == 0 {
            return None;
        }
        self.cur = self.insert as isize - 1;
        Some(&self.slots[self.physical(self.cur)])
    }

    /// Entry by logical index, 0 being the oldest
    pub fn get(&self, idx: usize) -> Option<&[u8]> {
        if idx >= self.size {
            return None;
        }
        let capacity = self.capacity();
        let first = (self.insert + capacity - self.size) % capacity;
        Some(&self.slots[(first + idx) % capacity])
    }

    /// All entries oldest first, with the indices accepted by [`get`](Self::get)
    pub fn list(&self) -> Vec<(usize, &[u8])> {
        (0..self.size)
            .filter_map(|idx| self.get(idx).map(|line| (idx, line)))
            .collect()
    }

    /// Resolve a `!!` or `!N` reference at the first non-blank byte of `line`.
    ///
    /// Returns `None` when the line is not a valid reference, in which case the
    /// line is used literally.
    pub fn expand_shortcut(&self, line: &[u8], shortcut: u8) -> Option<Vec<u8>> {
        if !self.enabled {
            return None;
        }

        let start = line.iter().position(|&b| !is_blank_byte(b))?;
        let rest = line[start..].strip_prefix(&[shortcut])?;

        if rest.is_empty() {
            return None;
        }

        if rest == [shortcut] {
            return self.peek_newest().map(<[u8]>::to_vec);
        }

        if !rest.iter().all(u8::is_ascii_digit) {
            return None;
        }

        let idx: usize = std::str::from_utf8(rest).ok()?.parse().ok()?;
        self.get(idx).map(<[u8]>::to_vec)
    }

    /// Lowest reachable value of the browse cursor
    fn lowest(&self) -> isize {
        -(self.size as isize - self.insert as isize)
    }

    /// Slot index for a browse cursor value
    fn physical(&self, cur: isize) -> usize {
        if cur < 0 {
            (self.size as isize + cur) as usize
        } else {
            cur as usize
        }
    }

    fn peek_newest(&self) -> Option<&[u8]> {
        if self.size == 0 {
            return None;
        }
        self.get(self.size - 1)
    }
}

fn is_blank_byte(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Empty or only spaces and tabs
pub fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|&b| is_blank_byte(b))
}
