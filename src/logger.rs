//! Terminal logging with colored prefixes and an overwriting status block.
//!
//! - `log!` / `debug!` macros print `[module] message` lines
//! - `status` keeps a single overwriting status block for watch mode
//! - `ProgressLine` shows the initial build counter on one line
//!
//! ```ignore
//! log!("build"; "compiling {} files", count);
//! debug!("cache"; "restored {} entries", n);
//!
//! let progress = ProgressLine::new("build", total);
//! progress.inc();
//! progress.finish();
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Lines occupied by an active progress line (for log coordination)
static BAR_COUNT: AtomicUsize = AtomicUsize::new(0);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix
///
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helpers
// ============================================================================

/// Log a message with a colored module prefix
#[allow(clippy::cast_possible_truncation)] // bar count is 0 or 1
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let mut stdout = stdout().lock();

    let bar_count = BAR_COUNT.load(Ordering::SeqCst);
    if bar_count > 0 {
        execute!(stdout, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
    }

    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "serve" | "bridge" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        "runtime" => prefix.bright_magenta().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

/// Format elapsed milliseconds the way file results show them (` 12ms`).
pub fn elapsed_ms(elapsed: Duration) -> String {
    format!(" {}ms", elapsed.as_millis().max(1))
}

/// Print a good-file line: ` ✓ app/main.view 12ms`
///
/// Suppressed while a progress line counts the files instead.
pub fn good_file(path: &str, elapsed: Option<Duration>) {
    if BAR_COUNT.load(Ordering::SeqCst) > 0 {
        return;
    }
    let time = elapsed.map(elapsed_ms).unwrap_or_default();
    println!(" {} {}{}", "✓".green(), path.bold(), time.dimmed());
}

/// Print a bad-file line: ` ✗ app/main.view`
pub fn bad_file(path: &str) {
    let mut stdout = stdout().lock();
    if BAR_COUNT.load(Ordering::SeqCst) > 0 {
        execute!(stdout, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
    }
    writeln!(stdout, " {} {}", "✗".red(), path.red()).ok();
    stdout.flush().ok();
}

// ============================================================================
// Watch Status
// ============================================================================

/// Outcome shown in the watch status block.
pub enum Status<'a> {
    /// A batch rebuilt files
    Rebuilt(&'a str),
    /// Nothing to do
    Idle(&'a str),
    /// Build or render failure, with an optional multi-line detail
    Failed { summary: &'a str, detail: &'a str },
    /// A render recovered by rolling a view back
    RolledBack(&'a str),
}

impl Status<'_> {
    fn text(&self) -> String {
        match self {
            Self::Rebuilt(msg) => format!("{} {msg}", "✓".green()),
            Self::Idle(msg) => msg.dimmed().to_string(),
            Self::Failed { summary, detail } if detail.is_empty() => format!("{} {summary}", "✗".red()),
            Self::Failed { summary, detail } => format!("{} {summary}\n{detail}", "✗".red()),
            Self::RolledBack(msg) => format!("{} {msg}", "↺".yellow()),
        }
    }
}

/// Terminal lines taken by the last status, overwritten by the next one.
static STATUS_LINES: Mutex<usize> = parking_lot::const_mutex(0);

/// Replace the previous status with `status`, stamped with UTC time.
pub fn status(status: Status<'_>) {
    let text = status.text();
    let mut lines = STATUS_LINES.lock();
    let mut out = stdout().lock();

    if let Ok(up) = u16::try_from(*lines)
        && up > 0
    {
        execute!(out, cursor::MoveUp(up), Clear(ClearType::FromCursorDown)).ok();
    }
    writeln!(out, "{} {text}", format!("[{}]", clock()).dimmed()).ok();
    out.flush().ok();
    *lines = line_count(&text);
}

/// `HH:MM:SS` of the current UTC time.
fn clock() -> String {
    let secs = crate::freshness::now_millis() / 1000;
    format!("{:02}:{:02}:{:02}", secs / 3600 % 24, secs / 60 % 60, secs % 60)
}

fn line_count(text: &str) -> usize {
    text.lines().count().max(1)
}

// ============================================================================
// Progress Line
// ============================================================================

/// Single-line counter: `[build] files(12/40)`
///
/// Updates use `try_lock` so worker threads never block on the terminal.
pub struct ProgressLine {
    label: &'static str,
    total: usize,
    current: AtomicUsize,
    lock: Mutex<()>,
}

impl ProgressLine {
    pub fn new(label: &'static str, total: usize) -> Self {
        BAR_COUNT.store(1, Ordering::SeqCst);
        let progress = Self {
            label,
            total,
            current: AtomicUsize::new(0),
            lock: Mutex::new(()),
        };
        progress.display(false);
        progress
    }

    pub fn inc(&self) {
        self.current.fetch_add(1, Ordering::Relaxed);
        if let Some(_guard) = self.lock.try_lock() {
            self.display(false);
        }
    }

    fn display(&self, newline: bool) {
        let current = self.current.load(Ordering::Relaxed).min(self.total);
        let line = format!("{}({}/{})", self.label, current, self.total);
        let prefix = colorize_prefix("build");

        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        if newline {
            writeln!(stdout, "{prefix} {line}").ok();
        } else {
            write!(stdout, "{prefix} {line}").ok();
        }
        stdout.flush().ok();
    }

    /// Keep the final line and move to the next one.
    pub fn finish(self) {
        BAR_COUNT.store(0, Ordering::SeqCst);
        {
            let _guard = self.lock.lock();
            self.display(true);
        }
        std::mem::forget(self);
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        BAR_COUNT.store(0, Ordering::SeqCst);
        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        stdout.flush().ok();
    }
}
