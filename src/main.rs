//! ttyline - interactive line editor demo
//!
//! Reads command lines from the terminal in raw mode and prints each one
//! back. Useful for trying the editing keys, the history and the callbacks.
//!
//! # Quick Start
//!
//! ```text
//! ttyline                 # Blocking input, echo on, 50 lines of history
//! ttyline -n              # Non-blocking input
//! ttyline -l 40 -H 5      # Short lines, small history
//! ```
//!
//! # Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | ^A / Home | Beginning of line |
//! | ^E / End | End of line |
//! | ^B ^F / Left Right | Move one character |
//! | ^D / Delete | Delete under cursor (^D on empty line exits) |
//! | ^K | Erase to end of line |
//! | Up / Down | Browse history |
//! | PgUp / PgDn | Oldest / newest history entry |
//! | F1-F12 | Function key callback |

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::level_filters::LevelFilter;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ttyline::{
    ByteChannel, Config, FunctionKey, Input, LineEdit, LineError, RawModeGuard, Session,
    StdioChannel,
};

const PROMPT: &str = "> ";

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command line options
#[derive(Debug, Default)]
struct Options {
    /// Log verbosity, 0 = warnings only
    debug: u8,
    non_blocking: bool,
    no_echo: bool,
    line_length: Option<usize>,
    history: Option<usize>,
    tab_spaces: Option<usize>,
    config_path: Option<PathBuf>,
}

impl Options {
    fn log_level(&self) -> Level {
        match self.debug {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Apply command line overrides to the file configuration
    fn apply(&self, config: &mut Config) {
        if self.non_blocking {
            config.non_blocking = true;
        }
        if self.no_echo {
            config.echo = false;
        }
        if let Some(len) = self.line_length {
            config.max_line_length = len;
        }
        if let Some(capacity) = self.history {
            config.history.capacity = capacity;
        }
        if let Some(spaces) = self.tab_spaces {
            config.tab.spaces = spaces;
        }
    }
}

fn print_version() {
    eprintln!("ttyline {}", VERSION);
}

fn print_help() {
    eprintln!("ttyline {} - interactive line editor demo", VERSION);
    eprintln!();
    eprintln!("Usage: ttyline [OPTIONS]");
    eprintln!();
    eprintln!("Input options:");
    eprintln!("  -n, --non-blocking       Poll for input instead of blocking");
    eprintln!("      --no-echo            Do not echo typed characters");
    eprintln!("  -l, --line-length <N>    Maximum command line length (default 128)");
    eprintln!("  -H, --history <N>        History size, 0 disables history (default 50)");
    eprintln!("  -t, --tab-spaces <N>     Spaces inserted by TAB (default 4)");
    eprintln!();
    eprintln!("Other options:");
    eprintln!("  -c, --config <FILE>      Configuration file (default ~/.ttyline/config.toml)");
    eprintln!("  -d, --debug <LEVEL>      Log level: 0 warn, 1 info, 2 debug, 3 trace");
    eprintln!("  -v, --version            Show version");
    eprintln!("  -h, --help               Show this help");
    eprintln!();
    eprintln!("Built-in commands:");
    eprintln!("  history                  List recorded lines");
    eprintln!("  !!, !N                   Repeat the newest line, or line N");
    eprintln!();
    eprintln!("Exit: ^D on an empty line");
    eprintln!();
    eprintln!("Log file: ~/.ttyline/ttyline.log");
}

fn parse_number<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, String> {
    let value = args
        .get(i)
        .ok_or_else(|| format!("Missing argument for {}", flag))?;
    value
        .parse()
        .map_err(|_| format!("Invalid value for {}: {}", flag, value))
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-d" | "--debug" => {
                i += 1;
                options.debug = parse_number(&args, i, "--debug")?;
            }
            "-n" | "--non-blocking" => {
                options.non_blocking = true;
            }
            "--no-echo" => {
                options.no_echo = true;
            }
            "-l" | "--line-length" => {
                i += 1;
                options.line_length = Some(parse_number(&args, i, "--line-length")?);
            }
            "-H" | "--history" => {
                i += 1;
                options.history = Some(parse_number(&args, i, "--history")?);
            }
            "-t" | "--tab-spaces" => {
                i += 1;
                options.tab_spaces = Some(parse_number(&args, i, "--tab-spaces")?);
            }
            "-c" | "--config" => {
                i += 1;
                let path = args
                    .get(i)
                    .ok_or_else(|| "Missing argument for --config".to_string())?;
                options.config_path = Some(PathBuf::from(path));
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(options)
}

fn init_logging(level: Level) {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from);

    let log_path = home
        .map(|h| h.join(".ttyline").join("ttyline.log"))
        .unwrap_or_else(|| PathBuf::from("ttyline.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    // RUST_LOG, when set, overrides the -d level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Write to the terminal; raw mode needs explicit carriage returns
fn say(text: &str) {
    let mut stdout = io::stdout();
    let _ = stdout.write_all(text.replace('\n', "\r\n").as_bytes());
    let _ = stdout.flush();
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging(options.log_level());
    info!("ttyline {} starting...", VERSION);

    let mut config = match &options.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    options.apply(&mut config);
    config.validate()?;

    let mut raw = RawModeGuard::enter()?;
    let result = if config.non_blocking {
        run(&config, StdioChannel::non_blocking()?)
    } else {
        run(&config, StdioChannel::blocking())
    };
    raw.restore()?;

    info!("ttyline exiting");
    result
}

fn run<C: ByteChannel>(config: &Config, channel: C) -> anyhow::Result<()> {
    let mut session = Session::new(config, channel)?;

    session.set_function_key_handler(Some(Box::new(
        |key: FunctionKey, _line: &[u8], cursor: usize| {
            say(&format!(
                "\nFunction key {} has been pressed (cursor pos = {})\n{}",
                key.number(),
                cursor,
                PROMPT
            ));
            LineEdit::replace("New cmd", 4)
        },
    )));

    say(PROMPT);

    loop {
        match session.next_line() {
            Ok(Input::Line(line)) => {
                say(&format!("The command line is: <{}>\n", line));
                if line.trim() == "history" {
                    for (n, entry) in session.history_list() {
                        say(&format!("{}. {}\n", n, entry));
                    }
                }
                say(PROMPT);
            }
            Ok(Input::ControlMessage(payload)) => {
                say(&format!("Control message: {:02x?}\n", payload));
                say(PROMPT);
            }
            Ok(Input::EndOfSession) => {
                say("\n");
                return Ok(());
            }
            Ok(Input::AwaitingInput) => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(LineError::Io(e)) => {
                error!("Terminal I/O failed: {}", e);
                return Err(e.into());
            }
            Err(e) => {
                error!("{}", e);
                say(&format!("\nError: {}\n", e));
                say(PROMPT);
            }
        }
    }
}
