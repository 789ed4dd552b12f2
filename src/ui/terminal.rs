//! Terminal mode setup and teardown
//!
//! The engine expects every keystroke to be delivered immediately with no
//! local echo or line buffering. [`RawModeGuard`] puts the controlling
//! terminal in that mode and restores the previous mode when dropped, even
//! on panic.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::terminal;
use crossterm::tty::IsTty;

static RESTORE_ON_PANIC: AtomicBool = AtomicBool::new(false);

/// Keeps the terminal in raw mode for its lifetime
#[derive(Debug)]
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    /// Enter raw mode. When stdin is not a terminal nothing is changed.
    pub fn enter() -> io::Result<Self> {
        if !io::stdin().is_tty() {
            tracing::info!("stdin is not a terminal, leaving its mode alone");
            return Ok(Self { active: false });
        }

        terminal::enable_raw_mode()?;
        install_panic_hook();
        RESTORE_ON_PANIC.store(true, Ordering::SeqCst);
        tracing::debug!("Raw mode enabled");

        Ok(Self { active: true })
    }

    /// Restore the previous terminal mode
    pub fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        RESTORE_ON_PANIC.store(false, Ordering::SeqCst);
        terminal::disable_raw_mode()?;
        tracing::debug!("Raw mode disabled");
        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::error!("Failed to restore terminal mode: {}", e);
        }
    }
}

fn install_panic_hook() {
    static INSTALLED: AtomicBool = AtomicBool::new(false);
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if RESTORE_ON_PANIC.swap(false, Ordering::SeqCst) {
            let _ = terminal::disable_raw_mode();
        }
        default_hook(info);
    }));
}
