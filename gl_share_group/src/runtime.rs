/// Runtime - process-wide state for the share group subsystem
///
/// Holds the active logger, the minimum log severity and the number of
/// context groups that have not been torn down yet. Everything here is
/// global so that the logging macros can be used from any module without
/// threading a handle through every call.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::SystemTime;
use parking_lot::RwLock;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Entries below this severity are dropped before reaching the logger
static MIN_SEVERITY: AtomicU8 = AtomicU8::new(2); // Info

/// Context groups created and not yet torn down
static LIVE_GROUPS: AtomicUsize = AtomicUsize::new(0);

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

// ===== PUBLIC API =====

/// Process-wide runtime state
///
/// # Example
///
/// ```no_run
/// use gl_share_group::glshare::{Runtime, log::{Logger, LogEntry, LogSeverity}};
///
/// struct Quiet;
/// impl Logger for Quiet {
///     fn log(&self, _entry: &LogEntry) {}
/// }
///
/// Runtime::set_logger(Quiet);
/// Runtime::set_min_severity(LogSeverity::Warn);
/// ```
pub struct Runtime;

impl Runtime {
    // ===== LOGGING API =====

    /// Replace the active logger
    ///
    /// # Arguments
    ///
    /// * `new_logger` - Any type implementing the Logger trait
    pub fn set_logger<L: Logger + 'static>(new_logger: L) {
        *logger().write() = Box::new(new_logger);
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        *logger().write() = Box::new(DefaultLogger);
    }

    /// Set the minimum severity forwarded to the logger (default: Info)
    pub fn set_min_severity(severity: LogSeverity) {
        MIN_SEVERITY.store(severity.as_u8(), Ordering::Relaxed);
    }

    /// Current minimum severity
    pub fn min_severity() -> LogSeverity {
        LogSeverity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like glshare_debug!, glshare_warn!, etc.
    ///
    /// # Arguments
    ///
    /// * `severity` - Log severity level
    /// * `source` - Source module (e.g., "glshare::ContextGroup")
    /// * `message` - Log message
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(severity, source, message, None, None);
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by glshare_error! (and therefore glshare_err!/glshare_bail!)
    /// to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(severity, source, message, Some(file), Some(line));
    }

    fn dispatch(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: Option<&'static str>,
        line: Option<u32>,
    ) {
        if severity < Self::min_severity() {
            return;
        }
        logger().read().log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file,
            line,
        });
    }

    // ===== GROUP ACCOUNTING =====

    /// Number of context groups that still have members
    ///
    /// A group leaves this count when its last context is removed (or when
    /// it is dropped without ever being torn down).
    pub fn live_group_count() -> usize {
        LIVE_GROUPS.load(Ordering::SeqCst)
    }

    pub(crate) fn group_created() {
        LIVE_GROUPS.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn group_destroyed() {
        LIVE_GROUPS.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
