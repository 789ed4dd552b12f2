//! Line editing session
//!
//! Drives the decoder over a byte channel until a line, a control message or
//! end of input is recognized, then post-processes the result.

use super::buffer::latin1_to_string;
use super::channel::{write_all, ByteChannel};
use super::fsm::{Editor, Modes, State, Transition, PUSHBACK_CAPACITY};
use crate::config::Config;
use crate::error::Result;
use crate::ui::keys::{FunctionKeyHandler, TabBehavior};

/// What [`Session::next_line`] produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A finished command line
    Line(String),
    /// Payload of an out-of-band control message
    ControlMessage(Vec<u8>),
    /// Input closed, or ^D on an empty line
    EndOfSession,
    /// Non-blocking session with no byte available; call again later
    AwaitingInput,
}

/// A line editor bound to one byte channel
pub struct Session<C: ByteChannel> {
    channel: C,
    editor: Editor,
    state: State,
    prev_state: State,
}

impl<C: ByteChannel> Session<C> {
    /// Create a session over `channel`
    pub fn new(config: &Config, channel: C) -> Result<Self> {
        config.validate()?;

        tracing::debug!(
            "New session: line length {}, history {}, non-blocking {}",
            config.max_line_length,
            config.history.capacity,
            config.non_blocking
        );

        Ok(Self {
            channel,
            editor: Editor::new(config),
            state: State::Start,
            prev_state: State::Start,
        })
    }

    /// Read input until something complete is available.
    ///
    /// In non-blocking mode this returns [`Input::AwaitingInput`] as soon as
    /// the channel runs dry; the partial line is kept and the next call
    /// resumes exactly where this one stopped. After an error the line in
    /// progress is dropped and the session starts over.
    pub fn next_line(&mut self) -> Result<Input> {
        loop {
            let transition = self.editor.step(self.state, &mut self.channel);
            debug_assert!(self.editor.pushback.len() < PUSHBACK_CAPACITY);

            if let Err(e) = self.flush_echo() {
                tracing::warn!("Failed to echo: {}", e);
                self.abort();
                return Err(e);
            }

            match transition {
                Transition::Stay => self.prev_state = self.state,
                Transition::RevertToPrevious => {
                    std::mem::swap(&mut self.state, &mut self.prev_state);
                }
                Transition::MoveTo(next) => {
                    self.prev_state = self.state;
                    self.state = next;
                }
                Transition::Await => return Ok(Input::AwaitingInput),
                Transition::Fail(e) => {
                    tracing::warn!("Line aborted in {:?}: {}", self.state, e);
                    self.abort();
                    return Err(e);
                }
            }

            match self.state {
                State::LineComplete => return Ok(self.finish_line()),
                State::EndOfSession => {
                    tracing::debug!("End of session");
                    self.abort();
                    return Ok(Input::EndOfSession);
                }
                _ => {}
            }
        }
    }

    fn flush_echo(&mut self) -> Result<()> {
        if self.editor.line.echo().has_pending() {
            let pending = self.editor.line.echo_mut().take();
            write_all(&mut self.channel, &pending)?;
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.editor.reset();
        self.state = State::Start;
        self.prev_state = State::Start;
    }

    fn finish_line(&mut self) -> Input {
        self.state = State::Start;
        self.prev_state = State::Start;

        let editor = &mut self.editor;
        let bytes = editor.line.take();
        editor.saved.clear();

        let input = if std::mem::take(&mut editor.control) {
            Input::ControlMessage(bytes.get(2..).map(<[u8]>::to_vec).unwrap_or_default())
        } else {
            let expanded = editor
                .shortcut
                .and_then(|shortcut| editor.history.expand_shortcut(&bytes, shortcut));
            let bytes = match expanded {
                Some(expanded) => {
                    tracing::debug!(
                        "{} expanded to {}",
                        latin1_to_string(&bytes),
                        latin1_to_string(&expanded)
                    );
                    expanded
                }
                None => bytes,
            };

            editor.history.add(&bytes);
            Input::Line(latin1_to_string(&bytes))
        };

        editor.history.reset();
        input
    }

    /// Switch echo on or off, returning the previous setting
    pub fn set_echo(&mut self, enabled: bool) -> bool {
        self.editor.set_echo(enabled)
    }

    /// Switch history on or off, returning the previous setting.
    /// History stays off for a session created with no history capacity.
    pub fn set_history(&mut self, enabled: bool) -> bool {
        self.editor.history.set_enabled(enabled)
    }

    /// Install the function key handler, returning the one it replaces
    pub fn set_function_key_handler(
        &mut self,
        handler: Option<Box<dyn FunctionKeyHandler>>,
    ) -> Option<Box<dyn FunctionKeyHandler>> {
        std::mem::replace(&mut self.editor.function_keys, handler)
    }

    /// Change what TAB does, returning the previous behavior
    pub fn set_tab_behavior(&mut self, tab: TabBehavior) -> TabBehavior {
        std::mem::replace(&mut self.editor.tab, tab)
    }

    /// Recorded lines, oldest first, with the numbers `!N` accepts
    pub fn history_list(&self) -> Vec<(usize, String)> {
        self.editor
            .history
            .list()
            .into_iter()
            .map(|(idx, line)| (idx, latin1_to_string(line)))
            .collect()
    }

    /// History entry `index`, 0 being the oldest
    pub fn history_entry(&self, index: usize) -> Option<String> {
        self.editor.history.get(index).map(latin1_to_string)
    }

    pub fn modes(&self) -> Modes {
        self.editor.modes
    }

    /// The line being edited, as stored
    pub fn line(&self) -> &[u8] {
        self.editor.line.as_bytes()
    }

    pub fn cursor(&self) -> usize {
        self.editor.line.cursor()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffer::{BACKSPACE, BELL};
    use crate::core::channel::ScriptedChannel;
    use crate::error::LineError;
    use crate::ui::keys::{FunctionKey, KeyMapper, LineEdit};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    fn non_blocking() -> Config {
        Config {
            non_blocking: true,
            ..Config::default()
        }
    }

    fn session_with(config: Config, input: &[u8]) -> Session<ScriptedChannel> {
        Session::new(&config, ScriptedChannel::with_input(input)).unwrap()
    }

    fn session(input: &[u8]) -> Session<ScriptedChannel> {
        session_with(non_blocking(), input)
    }

    fn line(text: &str) -> Input {
        Input::Line(text.to_string())
    }

    /// Enter `lines` and drop their echo
    fn with_history(lines: &[&str]) -> Session<ScriptedChannel> {
        let mut s = session(b"");
        for l in lines {
            s.channel_mut().feed(l.as_bytes());
            s.channel_mut().feed(b"\r");
            assert_eq!(s.next_line().unwrap(), line(l));
        }
        s.channel_mut().take_output();
        s
    }

    fn feed(s: &mut Session<ScriptedChannel>, bytes: &[u8]) -> Input {
        s.channel_mut().feed(bytes);
        s.next_line().unwrap()
    }

    fn assert_invariant(s: &Session<ScriptedChannel>) {
        assert!(s.cursor() <= s.line().len());
        assert!(s.line().len() < Config::default().max_line_length);
    }

    #[test]
    fn test_simple_line() {
        let mut s = session(b"ls -l\r");
        assert_eq!(s.next_line().unwrap(), line("ls -l"));
        assert_eq!(s.channel().output(), b"ls -l\n");
        assert!(s.line().is_empty());

        // Both CR and LF end a line
        assert_eq!(feed(&mut s, b"pwd\n"), line("pwd"));
        assert_eq!(feed(&mut s, b""), Input::AwaitingInput);
    }

    #[test]
    fn test_edits_keep_cursor_in_line() {
        let mut s = session(b"");
        let script: &[&[u8]] = &[
            b"hello",
            b"\x1b[D\x1b[D",
            b"XY",
            b"\x7f",
            b"\x01",
            b"\x1b[3~",
            b"\x05\x05",
            b"\x02\x02\x02",
            b"\x0b",
            b"\x06",
            b"\x1b[H\x1b[C\x1b[F",
        ];
        for chunk in script {
            assert_eq!(feed(&mut s, chunk), Input::AwaitingInput);
            assert_invariant(&s);
        }
        assert_eq!(feed(&mut s, b"\r"), line("el"));
    }

    #[test]
    fn test_insert_then_backspace_restores_line() {
        let mut s = session(b"abc\x1b[D");
        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert_eq!(feed(&mut s, b"Z\x08"), Input::AwaitingInput);
        assert_eq!(s.line(), b"abc");
        assert_eq!(s.cursor(), 2);
    }

    #[test]
    fn test_history_keeps_newest_entries() {
        let config = Config {
            non_blocking: true,
            history: crate::config::HistoryConfig {
                capacity: 3,
                shortcut: Some('!'),
            },
            ..Config::default()
        };
        let mut s = session_with(config, b"a\rb\r \r\rb\rc\rd\re\r");
        while !matches!(s.next_line().unwrap(), Input::AwaitingInput) {}

        assert_eq!(
            s.history_list(),
            vec![
                (0, "c".to_string()),
                (1, "d".to_string()),
                (2, "e".to_string())
            ]
        );
        assert_eq!(s.history_entry(1), Some("d".to_string()));
        assert_eq!(s.history_entry(3), None);
    }

    #[test]
    fn test_up_arrow_recalls_history() {
        let mut s = with_history(&["ls", "pwd"]);

        assert_eq!(feed(&mut s, b"\x1b[A"), Input::AwaitingInput);
        assert_eq!(s.line(), b"pwd");
        assert_eq!(s.cursor(), 3);
        assert_eq!(s.channel_mut().take_output(), b"pwd".to_vec());

        assert_eq!(feed(&mut s, b"\x1b[A"), Input::AwaitingInput);
        assert_eq!(s.line(), b"ls");
        assert_eq!(s.cursor(), 2);
        let mut redraw = vec![BACKSPACE; 3];
        redraw.extend_from_slice(b"ls \x08");
        assert_eq!(s.channel_mut().take_output(), redraw);

        // Boundary: stays on the oldest entry
        assert_eq!(feed(&mut s, b"\x1b[A"), Input::AwaitingInput);
        assert_eq!(s.line(), b"ls");

        assert_eq!(feed(&mut s, b"\r"), line("ls"));
    }

    #[test]
    fn test_down_arrow_returns_to_saved_line() {
        let mut s = with_history(&["ls", "pwd"]);

        assert_eq!(feed(&mut s, b"ec"), Input::AwaitingInput);
        assert_eq!(feed(&mut s, b"\x1b[A\x1b[A"), Input::AwaitingInput);
        assert_eq!(s.line(), b"ls");

        assert_eq!(feed(&mut s, b"\x1b[B"), Input::AwaitingInput);
        assert_eq!(s.line(), b"pwd");
        assert_eq!(feed(&mut s, b"\x1b[B"), Input::AwaitingInput);
        assert_eq!(s.line(), b"ec");

        assert_eq!(feed(&mut s, b"ho\r"), line("echo"));
    }

    #[test]
    fn test_page_keys_jump_to_ends_of_history() {
        let mut s = with_history(&["one", "two", "three"]);

        assert_eq!(feed(&mut s, b"\x1b[5~"), Input::AwaitingInput);
        assert_eq!(s.line(), b"one");
        assert_eq!(feed(&mut s, b"\x1b[6~"), Input::AwaitingInput);
        assert_eq!(s.line(), b"three");
        assert_eq!(feed(&mut s, b"\x1b[A"), Input::AwaitingInput);
        assert_eq!(s.line(), b"two");
    }

    #[test]
    fn test_history_keys_without_history() {
        let mut s = session(b"x\x1b[A\x1b[5~\r");
        assert_eq!(s.next_line().unwrap(), line("x"));

        let mut s = with_history(&["ls"]);
        assert!(s.set_history(false));
        assert_eq!(feed(&mut s, b"\x1b[Aab\r"), line("ab"));
        assert_eq!(s.history_list().len(), 1);
        assert!(!s.set_history(true));
    }

    #[test]
    fn test_history_cannot_be_enabled_without_capacity() {
        let mut config = non_blocking();
        config.history.capacity = 0;
        let mut s = session_with(config, b"ls\r");
        assert!(!s.set_history(true));
        assert_eq!(s.next_line().unwrap(), line("ls"));
        assert!(s.history_list().is_empty());
    }

    #[test]
    fn test_split_escape_matches_one_shot() {
        let mut one_shot = with_history(&["ls", "pwd"]);
        assert_eq!(feed(&mut one_shot, b"\x1b[A"), Input::AwaitingInput);

        let mut split = with_history(&["ls", "pwd"]);
        assert_eq!(feed(&mut split, b"\x1b"), Input::AwaitingInput);
        assert_eq!(feed(&mut split, b"["), Input::AwaitingInput);
        assert_eq!(feed(&mut split, b"A"), Input::AwaitingInput);

        assert_eq!(split.line(), one_shot.line());
        assert_eq!(split.cursor(), one_shot.cursor());
        assert_eq!(split.channel().output(), one_shot.channel().output());
    }

    #[test]
    fn test_split_tilde_sequence() {
        let mut s = session(b"abc\x01\x1b[3");
        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert_eq!(s.line(), b"abc");
        assert_eq!(feed(&mut s, b"~"), Input::AwaitingInput);
        assert_eq!(s.line(), b"bc");
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn test_latin1_input_and_echo() {
        let mut s = session(&[0xE9]);
        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert_eq!(s.line(), &[0xE9]);
        assert_eq!(s.channel_mut().take_output(), vec![0xC3, 0xA9]);

        assert_eq!(feed(&mut s, &[0xC3, 0xA9, b'\r']), line("éé"));

        let mut s = session(&[b'a', 0xC2, 0xA3, b'\r']);
        assert_eq!(s.next_line().unwrap(), line("a£"));
    }

    #[test]
    fn test_split_accent() {
        let mut s = session(&[0xC3]);
        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert!(s.line().is_empty());
        assert_eq!(feed(&mut s, &[0xA0, b'\r']), line("à"));
    }

    #[test]
    fn test_invalid_accent_dropped() {
        let mut s = session(&[b'a', 0xC2, 0x41, b'b', b'\r']);
        assert_eq!(s.next_line().unwrap(), line("ab"));
    }

    #[test]
    fn test_history_shortcuts() {
        let mut s = with_history(&["foo", "bar"]);
        assert_eq!(feed(&mut s, b"!!\r"), line("bar"));
        assert_eq!(feed(&mut s, b"!0\r"), line("foo"));
        assert_eq!(feed(&mut s, b"!9\r"), line("!9"));
        assert_eq!(feed(&mut s, b"  !1\r"), line("bar"));
    }

    #[test]
    fn test_shortcut_disabled() {
        let mut config = non_blocking();
        config.history.shortcut = None;
        let mut s = session_with(config, b"foo\r!!\r");
        assert_eq!(s.next_line().unwrap(), line("foo"));
        assert_eq!(s.next_line().unwrap(), line("!!"));
    }

    #[test]
    fn test_full_buffer_rings_once() {
        let mut config = non_blocking();
        config.max_line_length = 4;
        let mut s = session_with(config, b"abcd");
        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert_eq!(s.line(), b"abc");
        assert_eq!(s.channel().output(), b"abc\x07");
    }

    #[test]
    fn test_ctrl_d() {
        let mut s = session(b"\x04");
        assert_eq!(s.next_line().unwrap(), Input::EndOfSession);

        // At end of a non-empty line: alert only
        let mut s = session(b"ab\x04");
        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert_eq!(s.channel().output(), &[b'a', b'b', BELL]);

        // Under the cursor: delete
        assert_eq!(feed(&mut s, b"\x02\x04\r"), line("a"));
    }

    #[test]
    fn test_backspace_at_start_alerts() {
        let mut s = session(b"\x7f\x08");
        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert_eq!(s.channel().output(), &[BELL, BELL]);
    }

    #[test]
    fn test_ctrl_k_truncates() {
        let mut s = session(b"hello\x02\x02\x02\x0b\r");
        assert_eq!(s.next_line().unwrap(), line("he"));
    }

    #[test]
    fn test_arrows_alert_at_ends() {
        let mut s = session(b"a\x1b[C");
        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert_eq!(s.channel_mut().take_output(), vec![b'a', BELL]);

        assert_eq!(feed(&mut s, b"\x1b[D\x1b[D"), Input::AwaitingInput);
        assert_eq!(s.channel_mut().take_output(), vec![BACKSPACE, BELL]);
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn test_unknown_escape_bytes_reprocessed() {
        let mut s = session(b"a\x1b[Zb\x1bxc\r");
        assert_eq!(s.next_line().unwrap(), line("aZbxc"));

        // Insert key is ignored
        let mut s = session(b"a\x1b[2~b\r");
        assert_eq!(s.next_line().unwrap(), line("ab"));
    }

    #[test]
    fn test_unknown_function_key_digit_reprocessed() {
        let mut s = session(b"a\x1b[22~b\r");
        assert_eq!(s.next_line().unwrap(), line("a2b"));

        assert_eq!(feed(&mut s, b"a\x1b[16~b\r"), line("a6b"));
        assert!(s.line().is_empty());
    }

    #[test]
    fn test_nul_ignored() {
        let mut s = session(b"a\0b\r");
        assert_eq!(s.next_line().unwrap(), line("ab"));
    }

    #[test]
    fn test_tab_inserts_spaces() {
        let mut config = non_blocking();
        config.tab.spaces = 2;
        let mut s = session_with(config, b"a\tb\r");
        assert_eq!(s.next_line().unwrap(), line("a  b"));
    }

    #[test]
    fn test_tab_completion() {
        let mut s = session(b"he\t\r");
        s.set_tab_behavior(TabBehavior::Complete(Box::new(
            |line: &[u8], cursor: usize| {
                if line == b"he" && cursor == 2 {
                    LineEdit::replace("help", 4)
                } else {
                    LineEdit::keep(cursor)
                }
            },
        )));
        assert_eq!(s.next_line().unwrap(), line("help"));

        // No candidate: the line is left alone
        assert_eq!(feed(&mut s, b"x\t\r"), line("x"));
    }

    #[test]
    fn test_function_keys() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);

        let mut s = session(b"ab\x1bOP");
        let prev = s.set_function_key_handler(Some(Box::new(
            move |key: FunctionKey, line: &[u8], cursor: usize| {
                log.borrow_mut().push((key, line.to_vec(), cursor));
                LineEdit::replace("New cmd", 4)
            },
        )));
        assert!(prev.is_none());

        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert_eq!(s.line(), b"New cmd");
        assert_eq!(s.cursor(), 4);
        // Redrawn from column 0, cursor walked back from the end
        assert_eq!(s.channel_mut().take_output(), b"abNew cmd\x08\x08\x08".to_vec());

        assert_eq!(feed(&mut s, b"\x1b[15~\x1b[19~\x1b[20~\x1b[24~"), Input::AwaitingInput);
        let keys: Vec<FunctionKey> = seen.borrow().iter().map(|(k, _, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                FunctionKey::F1,
                FunctionKey::F5,
                FunctionKey::F8,
                FunctionKey::F9,
                FunctionKey::F12
            ]
        );
        assert_eq!(seen.borrow()[0].1, b"ab".to_vec());
        assert_eq!(seen.borrow()[0].2, 2);

        assert!(s.set_function_key_handler(None).is_some());
        assert_eq!(feed(&mut s, b"\x1bOQ\r"), line("New cmd"));
    }

    #[test]
    fn test_function_key_keeps_line() {
        let mut s = session(b"abc\x1b[18~");
        s.set_function_key_handler(Some(Box::new(
            |_key: FunctionKey, _line: &[u8], _cursor: usize| LineEdit::keep(1),
        )));
        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert_eq!(s.line(), b"abc");
        assert_eq!(s.cursor(), 1);
    }

    #[test]
    fn test_control_message() {
        let mut s = session(&[0x80, 3, b'x', 0, b'y']);
        assert_eq!(
            s.next_line().unwrap(),
            Input::ControlMessage(vec![b'x', 0, b'y'])
        );
        assert!(s.channel().output().is_empty());
        assert!(s.history_list().is_empty());

        assert_eq!(feed(&mut s, &[0x80, 0]), Input::ControlMessage(Vec::new()));
    }

    #[test]
    fn test_control_message_ends_typed_line() {
        let mut s = session(&[b'a', b'b', 0x80, 1, b'z']);
        assert_eq!(s.next_line().unwrap(), line("ab"));
        assert_eq!(s.channel().output(), b"ab\n");
        assert_eq!(s.next_line().unwrap(), Input::ControlMessage(vec![b'z']));
    }

    #[test]
    fn test_split_control_message() {
        let mut s = session(&[0x80, 2, b'a']);
        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert_eq!(feed(&mut s, b"b"), Input::ControlMessage(b"ab".to_vec()));
    }

    #[test]
    fn test_control_message_too_long() {
        let mut config = non_blocking();
        config.max_line_length = 8;
        let mut s = session_with(config, &[0x80, 6]);

        match s.next_line() {
            Err(LineError::ControlMessageTooLong { len, max }) => {
                assert_eq!((len, max), (6, 5));
            }
            other => panic!("unexpected result {:?}", other),
        }

        // The session starts over
        assert!(s.line().is_empty());
        assert_eq!(feed(&mut s, b"ok\r"), line("ok"));
    }

    #[test]
    fn test_control_message_length_byte_rejected() {
        let mut config = non_blocking();
        config.max_line_length = 2;
        let mut s = session_with(config, &[0x80, 0]);

        match s.next_line() {
            Err(LineError::ControlMessageTooLong { len, max }) => {
                assert_eq!((len, max), (0, 0));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(s.line().is_empty());
    }

    #[test]
    fn test_failed_echo_aborts_line() {
        let mut s = session(b"ab");
        s.channel_mut().fail_writes(1);

        match s.next_line() {
            Err(LineError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(s.line().is_empty());
        assert_eq!(s.cursor(), 0);

        // The rest of the input starts a fresh line
        assert_eq!(feed(&mut s, b"cd\r"), line("bcd"));
        assert_eq!(s.channel().output(), b"bcd\n");
    }

    #[test]
    fn test_key_events_drive_session() {
        let keys = [
            KeyEvent::new(KeyCode::Char('l'), KeyModifiers::NONE),
            KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE),
            KeyEvent::new(KeyCode::Home, KeyModifiers::NONE),
            KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE),
            KeyEvent::new(KeyCode::Delete, KeyModifiers::NONE),
            KeyEvent::new(KeyCode::End, KeyModifiers::NONE),
            KeyEvent::new(KeyCode::Left, KeyModifiers::NONE),
            KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL),
            KeyEvent::new(KeyCode::Insert, KeyModifiers::NONE),
            KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
        ];

        let mut s = session(b"");
        for key in &keys {
            let bytes = KeyMapper::map(key).unwrap();
            s.channel_mut().feed(&bytes);
        }
        assert_eq!(s.next_line().unwrap(), line("x"));

        s.channel_mut().feed(&KeyMapper::map_str("café"));
        let up = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        s.channel_mut().feed(&KeyMapper::map(&up).unwrap());
        assert_eq!(s.next_line().unwrap(), Input::AwaitingInput);
        assert_eq!(s.line(), b"x");

        let down = KeyEvent::new(KeyCode::Down, KeyModifiers::NONE);
        s.channel_mut().feed(&KeyMapper::map(&down).unwrap());
        s.channel_mut().feed(b"\r");
        assert_eq!(s.next_line().unwrap(), line("café"));
    }

    #[test]
    fn test_echo_off() {
        let mut config = non_blocking();
        config.echo = false;
        let mut s = session_with(config, b"secret\r");
        assert_eq!(s.next_line().unwrap(), line("secret"));
        assert!(s.channel().output().is_empty());
        assert!(!s.modes().contains(Modes::ECHO));

        assert!(!s.set_echo(true));
        assert_eq!(feed(&mut s, b"x\r"), line("x"));
        assert_eq!(s.channel().output(), b"x\n");
    }

    #[test]
    fn test_closed_input() {
        let mut s = session(b"partial");
        s.channel_mut().close();
        assert_eq!(s.next_line().unwrap(), Input::EndOfSession);
        assert!(s.line().is_empty());
    }

    #[test]
    fn test_blocking_session_without_data() {
        let mut s = session_with(Config::default(), b"ab");
        match s.next_line() {
            Err(LineError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::WouldBlock),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(s.line().is_empty());

        assert_eq!(feed(&mut s, b"cd\r"), line("cd"));
    }

    #[test]
    fn test_interrupted_io_is_retried() {
        let mut s = session(b"hi\r");
        s.channel_mut().interrupt_reads(2);
        s.channel_mut().set_write_chunk(1);
        assert_eq!(s.next_line().unwrap(), line("hi"));
        assert_eq!(s.channel().output(), b"hi\n");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            max_line_length: 0,
            ..Config::default()
        };
        let result = Session::new(&config, ScriptedChannel::new());
        assert!(matches!(result, Err(LineError::InvalidConfiguration(_))));
    }
}
