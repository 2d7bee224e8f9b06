//! Diagnostic logging
//!
//! Developer-facing console output, gated by a single enable flag held in
//! the application context. Messages beginning with [`ERROR_MARKER`] are
//! rendered in the alert style with the marker stripped. Each call site
//! names itself; the name becomes a `[name()] ` prefix.
//!
//! The logger renders records and hands them to a [`LogSink`]. The default
//! sink forwards to the `log` facade; the wasm binding writes styled lines
//! to the browser console.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Compile-time default for the enable flag. Not for production.
pub const DEBUG_DEFAULT: bool = false;

/// Prefix marking a message as error-class.
pub const ERROR_MARKER: &str = "ERROR: ";

/// Banner printed in front of every console line.
pub const BANNER: &str = "Old Google";

/// `log` target used by [`FacadeSink`].
pub const LOG_TARGET: &str = "old_google";

// =============================================================================
// Records
// =============================================================================

/// Rendering style of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Default,
    /// Rendered red
    Error,
}

impl Severity {
    /// CSS color for the message part of the console line.
    pub fn color(self) -> &'static str {
        match self {
            Self::Default => "reset",
            Self::Error => "#f00",
        }
    }
}

/// One rendered log line, before the banner is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub severity: Severity,
    /// Call-site name, `None` when the caller passed an empty name
    pub caller: Option<String>,
    /// Message with any error marker removed
    pub message: String,
}

impl LogRecord {
    /// Parse a raw message into a record.
    pub fn new(caller: &str, message: &str) -> Self {
        let (severity, message) = match message.strip_prefix(ERROR_MARKER) {
            Some(rest) => (Severity::Error, rest),
            None => (Severity::Default, message),
        };
        Self {
            severity,
            caller: (!caller.is_empty()).then(|| caller.to_string()),
            message: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(caller) = &self.caller {
            write!(f, "[{}()] ", caller)?;
        }
        f.write_str(&self.message)
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Destination for rendered records.
pub trait LogSink {
    fn write(&self, record: &LogRecord);
}

/// Forwards records to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeSink;

impl LogSink for FacadeSink {
    fn write(&self, record: &LogRecord) {
        match record.severity {
            Severity::Error => log::error!(target: LOG_TARGET, "[{}] {}", BANNER, record),
            Severity::Default => log::info!(target: LOG_TARGET, "[{}] {}", BANNER, record),
        }
    }
}

/// Keeps every record in memory. Used by the CLI simulator and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: RefCell<Vec<LogRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }

    pub fn error_count(&self) -> usize {
        self.records.borrow().iter().filter(|r| r.is_error()).count()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl LogSink for RecordingSink {
    fn write(&self, record: &LogRecord) {
        self.records.borrow_mut().push(record.clone());
    }
}

// =============================================================================
// Logger
// =============================================================================

/// Conditionally enabled diagnostic logger. Cheap to clone.
#[derive(Clone)]
pub struct DebugLog {
    enabled: bool,
    sink: Rc<dyn LogSink>,
}

impl DebugLog {
    pub fn new(enabled: bool, sink: Rc<dyn LogSink>) -> Self {
        Self { enabled, sink }
    }

    /// Logger that discards everything.
    pub fn disabled() -> Self {
        Self::new(false, Rc::new(FacadeSink))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log `message` tagged with `caller`. Pass `""` for no tag.
    pub fn log(&self, caller: &str, message: &str) {
        if !self.enabled {
            return;
        }
        self.sink.write(&LogRecord::new(caller, message));
    }

    /// Like [`DebugLog::log`], but the message is only built when enabled.
    pub fn log_with<F>(&self, caller: &str, message: F)
    where
        F: FnOnce() -> String,
    {
        if !self.enabled {
            return;
        }
        self.sink.write(&LogRecord::new(caller, &message()));
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new(DEBUG_DEFAULT, Rc::new(FacadeSink))
    }
}

impl fmt::Debug for DebugLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugLog")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// `debug_log!(logger, "caller", "format {}", args)`; formatting is skipped
/// when the logger is disabled.
#[macro_export]
macro_rules! debug_log {
    ($logger:expr, $caller:expr, $($t:tt)*) => {
        $logger.log_with($caller, || format!($($t)*))
    };
}
