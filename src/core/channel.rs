//! Byte-level I/O for the line editor
//!
//! The engine never touches a file descriptor directly. It reads and writes
//! through a [`ByteChannel`], which distinguishes "no data yet" from
//! "closed" so that non-blocking sessions can suspend mid-line.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// Outcome of a channel read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// This many bytes were stored in the buffer
    Data(usize),
    /// Non-blocking channel with nothing available right now
    WouldBlock,
    /// End of input
    Closed,
}

/// Source and sink of raw terminal bytes
pub trait ByteChannel {
    /// Read up to `buf.len()` bytes.
    ///
    /// `ErrorKind::Interrupted` errors are retried by the engine.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus>;

    /// Write some prefix of `buf`, returning how much was taken.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Result of fetching one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fetch {
    Byte(u8),
    WouldBlock,
    Closed,
}

/// Read a single byte, retrying interrupted reads
pub(crate) fn read_byte<C: ByteChannel + ?Sized>(channel: &mut C) -> io::Result<Fetch> {
    let mut byte = [0u8; 1];
    loop {
        match channel.read(&mut byte) {
            Ok(ReadStatus::Data(0)) | Ok(ReadStatus::Closed) => return Ok(Fetch::Closed),
            Ok(ReadStatus::Data(_)) => return Ok(Fetch::Byte(byte[0])),
            Ok(ReadStatus::WouldBlock) => return Ok(Fetch::WouldBlock),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Write all of `bytes`, resuming partial writes and retrying interrupted ones
pub(crate) fn write_all<C: ByteChannel + ?Sized>(channel: &mut C, bytes: &[u8]) -> io::Result<()> {
    let mut written = 0;
    while written < bytes.len() {
        match channel.write(&bytes[written..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "byte channel accepted no data",
                ))
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    channel.flush()
}

/// Where [`StdioChannel`] gets its bytes from
enum StdinSource {
    /// Read stdin on the calling thread
    Direct(io::Stdin),
    /// Reader thread forwarding chunks; lets reads report `WouldBlock`
    Threaded {
        rx: Receiver<Vec<u8>>,
        pending: VecDeque<u8>,
    },
}

/// Channel over the process's stdin and stdout.
///
/// Output `\n` is written as `\r\n`, since raw mode turns off the
/// terminal's own translation.
pub struct StdioChannel {
    input: StdinSource,
    stdout: io::Stdout,
}

impl StdioChannel {
    /// Blocking channel: reads wait for a byte
    pub fn blocking() -> Self {
        Self {
            input: StdinSource::Direct(io::stdin()),
            stdout: io::stdout(),
        }
    }

    /// Non-blocking channel: a reader thread drains stdin and reads never wait
    pub fn non_blocking() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();

        thread::Builder::new()
            .name("ttyline-stdin".to_string())
            .spawn(move || {
                let mut stdin = io::stdin();
                let mut buffer = vec![0u8; 256];

                loop {
                    match stdin.read(&mut buffer) {
                        Ok(0) => break,
                        Ok(n) => {
                            if tx.send(buffer[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            tracing::warn!("stdin reader stopped: {}", e);
                            break;
                        }
                    }
                }
                // Dropping tx reports the channel as closed
            })?;

        Ok(Self {
            input: StdinSource::Threaded {
                rx,
                pending: VecDeque::new(),
            },
            stdout: io::stdout(),
        })
    }
}

impl ByteChannel for StdioChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        if buf.is_empty() {
            return Ok(ReadStatus::Data(0));
        }

        match &mut self.input {
            StdinSource::Direct(stdin) => match stdin.read(buf)? {
                0 => Ok(ReadStatus::Closed),
                n => Ok(ReadStatus::Data(n)),
            },
            StdinSource::Threaded { rx, pending } => {
                if pending.is_empty() {
                    match rx.try_recv() {
                        Ok(chunk) => pending.extend(chunk),
                        Err(TryRecvError::Empty) => return Ok(ReadStatus::WouldBlock),
                        Err(TryRecvError::Disconnected) => return Ok(ReadStatus::Closed),
                    }
                }

                let n = buf.len().min(pending.len());
                for (slot, byte) in buf.iter_mut().zip(pending.drain(..n)) {
                    *slot = byte;
                }
                Ok(ReadStatus::Data(n))
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !buf.contains(&b'\n') {
            return self.stdout.write(buf);
        }

        let mut translated = Vec::with_capacity(buf.len() + 8);
        for &b in buf {
            if b == b'\n' {
                translated.push(b'\r');
            }
            translated.push(b);
        }
        self.stdout.write_all(&translated)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

/// In-memory channel with scripted input and captured output.
///
/// Reads report `WouldBlock` once the script runs dry, until [`close`](Self::close)
/// is called. Useful for tests and for hosts that receive terminal bytes from
/// somewhere other than a file descriptor.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    input: VecDeque<u8>,
    output: Vec<u8>,
    closed: bool,
    /// Accept at most this many bytes per write call
    write_chunk: Option<usize>,
    /// Interrupted errors to report before the next successful read
    interrupts: usize,
    write_failures: usize,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel preloaded with `input`
    pub fn with_input(input: &[u8]) -> Self {
        let mut channel = Self::new();
        channel.feed(input);
        channel
    }

    /// Append bytes to the input script
    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    /// Report end of input once the script is consumed
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Limit writes to `n` bytes per call
    pub fn set_write_chunk(&mut self, n: usize) {
        self.write_chunk = Some(n.max(1));
    }

    /// Make the next `n` reads fail with `ErrorKind::Interrupted`
    pub fn interrupt_reads(&mut self, n: usize) {
        self.interrupts = n;
    }

    /// Make the next `n` writes fail with `ErrorKind::BrokenPipe`
    pub fn fail_writes(&mut self, n: usize) {
        self.write_failures = n;
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl ByteChannel for ScriptedChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        if self.interrupts > 0 {
            self.interrupts -= 1;
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }

        if self.input.is_empty() {
            return Ok(if self.closed {
                ReadStatus::Closed
            } else {
                ReadStatus::WouldBlock
            });
        }

        let n = buf.len().min(self.input.len());
        for (slot, byte) in buf.iter_mut().zip(self.input.drain(..n)) {
            *slot = byte;
        }
        Ok(ReadStatus::Data(n))
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.write_failures > 0 {
            self.write_failures -= 1;
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        let n = self.write_chunk.map_or(buf.len(), |chunk| chunk.min(buf.len()));
        self.output.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}
