//! Terminal user interface (TUI) for memex.
//!
//! ## Entry points
//!
//! - [`run_browser`]: the interactive journal browser (`mx`, `mx browse`).

mod browser;

pub use browser::BrowserView;

use crate::cmd;
use crate::output::OutputMode;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::ExecutableCommand as _;
use memex_core::Navigator;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::panic::{self, PanicHookInfo};
use std::path::Path;
use std::time::Duration;

/// Input poll interval; also bounds how long a finished task waits for
/// delivery.
const POLL_INTERVAL: Duration = Duration::from_millis(120);

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Raw mode plus the alternate screen, restored on drop. While held, panic
/// messages go to `tracing` instead of stderr, which would print over the
/// alternate screen.
struct TerminalGuard {
    _panics: PanicsToTracing,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        io::stdout().execute(EnterAlternateScreen)?;
        Ok(Self {
            _panics: PanicsToTracing::install(),
        })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Replaces the process panic hook with one that emits a `tracing` error.
/// The previous hook is reinstated on drop.
struct PanicsToTracing {
    previous: Option<PanicHook>,
}

impl PanicsToTracing {
    fn install() -> Self {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(log_panic));
        Self {
            previous: Some(previous),
        }
    }
}

impl Drop for PanicsToTracing {
    fn drop(&mut self) {
        // set_hook itself panics on a panicking thread.
        if std::thread::panicking() {
            return;
        }
        if let Some(previous) = self.previous.take() {
            panic::set_hook(previous);
        }
    }
}

fn log_panic(info: &PanicHookInfo<'_>) {
    let thread = std::thread::current();
    let message = info
        .payload()
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_default();
    tracing::error!(
        thread = thread.name().unwrap_or("unnamed"),
        location = %location,
        "panicked: {message}"
    );
}

/// Run the browser on the current thread until the user quits.
///
/// # Errors
///
/// Returns an error if the journal cannot be opened or the terminal cannot
/// be driven.
pub fn run_browser(output: OutputMode, project_root: &Path) -> Result<()> {
    let journal = cmd::open_journal(output, project_root)?;
    let client = cmd::service_client(&journal.config);
    let orch = cmd::orchestrator(&journal.config, &client);
    let mut view = BrowserView::new(Navigator::new(journal.store), orch, client)?;

    let _guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;
    tracing::info!(root = %project_root.display(), "browser started");

    loop {
        terminal.draw(|frame| view.render(frame, frame.area()))?;
        view.tick();

        if view.should_quit() {
            break;
        }

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => view.handle_key(key)?,
                _ => {}
            }
        }
    }

    tracing::info!(pending = view.pending_count(), "browser closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn panics_are_logged_while_hook_is_installed() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let hook = PanicsToTracing::install();
            let caught = panic::catch_unwind(|| panic!("worker exploded"));
            assert!(caught.is_err());
            drop(hook);
        });

        let text = String::from_utf8(captured.0.lock().expect("lock").clone()).expect("utf8");
        assert!(text.contains("panicked: worker exploded"), "log was: {text}");
    }
}
