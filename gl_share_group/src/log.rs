//! Diagnostics for share group bookkeeping
//!
//! Groups report joins, departures, deferred deletions and teardown here.
//! Entries go to whichever [`Logger`] is installed on the [`Runtime`]
//! (colored stdout by default), after the runtime's severity filter.
//! Errors raised through `glshare_err!` / `glshare_bail!` also record the
//! file and line that raised them.
//!
//! [`Runtime`]: crate::glshare::Runtime

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Sink for share group diagnostics
///
/// Called from whichever thread logged, never while a group lock is held,
/// so an implementation may query groups.
///
/// # Example
///
/// ```no_run
/// use gl_share_group::glshare::log::{Logger, LogEntry};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("{}: {}", entry.source, entry.message);
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// One diagnostic, as handed to a [`Logger`]
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,

    /// Emitting component, e.g. "glshare::ContextGroup"
    pub source: String,

    pub message: String,

    /// Raising location; set for errors only
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

/// Ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    /// Per-resource bookkeeping (deferrals, individual flushes)
    Trace,

    /// Group and context lifecycle events
    Debug,

    Info,

    /// Recoverable problems (deferred deletions, unknown contexts)
    Warn,

    /// Failures returned as `Error` values
    Error,
}

impl LogSeverity {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            LogSeverity::Trace => 0,
            LogSeverity::Debug => 1,
            LogSeverity::Info => 2,
            LogSeverity::Warn => 3,
            LogSeverity::Error => 4,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => LogSeverity::Trace,
            1 => LogSeverity::Debug,
            2 => LogSeverity::Info,
            3 => LogSeverity::Warn,
            _ => LogSeverity::Error,
        }
    }
}

/// Prints one colored line per entry to stdout
///
/// Lines read `[local time] [SEVERITY] [source] message`, followed by
/// `(file:line)` when the entry carries a location.
pub struct DefaultLogger;

impl DefaultLogger {
    /// Render an entry to the line printed by [`Logger::log`]
    pub fn format_entry(entry: &LogEntry) -> String {
        let local: DateTime<Local> = entry.timestamp.into();
        let severity = match entry.severity {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        };
        let location = match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(" ({}:{})", file, line),
            _ => String::new(),
        };

        format!(
            "[{}] [{}] [{}] {}{}",
            local.format("%Y-%m-%d %H:%M:%S%.3f"),
            severity,
            entry.source.bright_blue(),
            entry.message,
            location
        )
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        println!("{}", Self::format_entry(entry));
    }
}

// ===== LOGGING MACROS =====

/// Trace one resource moving through the release path
///
/// # Example
///
/// ```no_run
/// gl_share_group::glshare_trace!("glshare::ContextGroup", "Deferred release of {} resource(s)", 3);
/// ```
#[macro_export]
macro_rules! glshare_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::glshare::Runtime::log(
            $crate::glshare::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Report a group or context lifecycle change
///
/// # Example
///
/// ```no_run
/// gl_share_group::glshare_debug!("glshare::ContextGroup", "Context {} joined", 1);
/// ```
#[macro_export]
macro_rules! glshare_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::glshare::Runtime::log(
            $crate::glshare::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log at INFO severity
#[macro_export]
macro_rules! glshare_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::glshare::Runtime::log(
            $crate::glshare::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Report a recoverable problem, such as a flush that had to be deferred
///
/// # Example
///
/// ```no_run
/// gl_share_group::glshare_warn!("glshare::ContextGroup", "make_current failed: {}", "lost surface");
/// ```
#[macro_export]
macro_rules! glshare_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::glshare::Runtime::log(
            $crate::glshare::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log at ERROR severity, recording the calling file and line
#[macro_export]
macro_rules! glshare_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::glshare::Runtime::log_detailed(
            $crate::glshare::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Build an [`Error`](crate::glshare::Error) variant and log it at ERROR severity
///
/// # Example
///
/// ```no_run
/// let err = gl_share_group::glshare_err!(BackendError, "glshare::headless", "bad name {}", 0);
/// ```
#[macro_export]
macro_rules! glshare_err {
    ($variant:ident, $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::glshare_error!($source, "{}", message);
        $crate::glshare::Error::$variant(message)
    }};
}

/// `return Err(glshare_err!(..))`
#[macro_export]
macro_rules! glshare_bail {
    ($variant:ident, $source:expr, $($arg:tt)*) => {
        return Err($crate::glshare_err!($variant, $source, $($arg)*))
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
