//! Presenting panel state to the user

use clog_core::{Entry, EntryState};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::io::Write;
use std::time::{Duration, Instant};

/// How long a notice stays up unless closed
pub const NOTICE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A dismissible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    /// `None` keeps the notice until it is closed
    pub dismiss_after: Option<Duration>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Info,
            dismiss_after: Some(NOTICE_TIMEOUT),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Error,
            dismiss_after: Some(NOTICE_TIMEOUT),
        }
    }
}

/// Renders entry cards, per-entry status and notices
pub trait Presenter: Send + Sync {
    /// Full redraw; `entries` are oldest first
    fn render(&self, entries: &[Entry], autosave: bool);

    fn status(&self, entry_id: &str, state: EntryState);

    fn notify(&self, notice: Notice);

    /// Close the current notice early
    fn dismiss(&self) {}
}

/// Coloured terminal output
///
/// Notices print as they arrive and stay in the header of every redraw
/// until they expire or are dismissed.
pub struct TerminalPresenter {
    /// Show per-entry status lines as they happen
    verbose_status: bool,
    current: Mutex<Option<(Notice, Instant)>>,
}

impl TerminalPresenter {
    pub fn new(verbose_status: bool) -> Self {
        Self {
            verbose_status,
            current: Mutex::new(None),
        }
    }

    /// The notice still on screen at `now`, dropping it once expired
    fn active_notice(&self, now: Instant) -> Option<Notice> {
        let mut current = self.current.lock();
        let expired = match &*current {
            Some((notice, shown)) => notice
                .dismiss_after
                .is_some_and(|ttl| now.duration_since(*shown) >= ttl),
            None => return None,
        };
        if expired {
            *current = None;
        }
        current.as_ref().map(|(notice, _)| notice.clone())
    }
}

fn notice_line(notice: &Notice) -> String {
    match notice.kind {
        NoticeKind::Info => format!("{} {}", "🛈".blue(), notice.message),
        NoticeKind::Error => format!("{} {}", "Error:".red().bold(), notice.message),
    }
}

fn state_marker(state: EntryState) -> String {
    match state {
        EntryState::None => " ".to_string(),
        EntryState::Arrow => "←".to_string(),
        EntryState::Pending => "…".yellow().to_string(),
        EntryState::Saved => "✓".green().to_string(),
        EntryState::Error => "✗".red().to_string(),
    }
}

impl Presenter for TerminalPresenter {
    fn render(&self, entries: &[Entry], autosave: bool) {
        let mut out = std::io::stdout().lock();
        let mode = if autosave {
            "auto-save on".green().to_string()
        } else {
            "auto-save off".dimmed().to_string()
        };
        let _ = writeln!(out, "{} ({})", "Captured addresses".bold(), mode);
        if let Some(notice) = self.active_notice(Instant::now()) {
            let _ = writeln!(out, "  {}", notice_line(&notice));
        }

        if entries.is_empty() {
            let _ = writeln!(out, "  {}", "Run 'capture' to get started.".dimmed());
            return;
        }

        // Newest first, numbered by position in the store
        for (index, entry) in entries.iter().enumerate().rev() {
            let _ = writeln!(
                out,
                "  {} [{}] {} {}  {}",
                state_marker(entry.state),
                index + 1,
                entry.sheet_name.cyan(),
                entry.local_address.yellow(),
                entry.id.dimmed()
            );
            let _ = writeln!(out, "        {}", entry.description);
        }
    }

    fn status(&self, entry_id: &str, state: EntryState) {
        if self.verbose_status {
            println!("  {} {} {}", state_marker(state), entry_id.dimmed(), state.dimmed());
        }
    }

    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Info => println!("{}", notice_line(&notice)),
            NoticeKind::Error => eprintln!("{}", notice_line(&notice)),
        }
        *self.current.lock() = Some((notice, Instant::now()));
    }

    fn dismiss(&self) {
        self.current.lock().take();
    }
}
