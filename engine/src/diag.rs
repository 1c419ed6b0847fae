//! Leveled diagnostics with an injected policy.
//!
//! Every engine operation reports what it is doing through a [`Diagnostics`]
//! handle. The handle filters events below a configurable minimum level and,
//! when the `exit_on_error` policy is set, terminates the process after an
//! error-level event has been emitted. The sink is pluggable: production
//! code forwards to `tracing` via [`TracingSink`], tests install a
//! [`CaptureSink`] together with a non-terminating policy.

use {
    std::{fmt, process, sync::Arc, sync::Mutex},
    tracing::{debug, error, info, warn},
};

/// Severity of a diagnostic event, ordered `Debug < Info < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Fine-grained progress reporting.
    Debug,
    /// Recoverable per-candidate failures and similar notable events.
    Info,
    /// Failures that were skipped over.
    Warning,
    /// Failures that abort the current call.
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Diagnostics policy, passed in at construction rather than held in
/// process-wide mutable state.
#[derive(Debug, Clone, Copy)]
pub struct DiagConfig {
    /// Events below this level are suppressed.
    pub min_level: Level,
    /// Terminate the process after emitting an error-level event.
    pub exit_on_error: bool,
}

impl Default for DiagConfig {
    fn default() -> Self {
        Self {
            min_level: Level::Debug,
            exit_on_error: true,
        }
    }
}

/// Destination for diagnostic events.
///
/// `origin` names the operation reporting the event; `detail` carries the
/// underlying OS or resolver error text when there is one.
pub trait DiagSink: Send + Sync {
    /// Emit one event. Level filtering has already happened.
    fn emit(&self, level: Level, origin: &str, detail: Option<&str>, message: &str);
}

/// Default sink: forwards events to the `tracing` ecosystem.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagSink for TracingSink {
    fn emit(&self, level: Level, origin: &str, detail: Option<&str>, message: &str) {
        match level {
            Level::Debug => debug!(origin, detail, "{message}"),
            Level::Info => info!(origin, detail, "{message}"),
            Level::Warning => warn!(origin, detail, "{message}"),
            Level::Error => error!(origin, detail, "{message}"),
        }
    }
}

/// One event recorded by a [`CaptureSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Severity of the event.
    pub level: Level,
    /// Operation that reported it.
    pub origin: String,
    /// Underlying error text, if any.
    pub detail: Option<String>,
    /// Formatted message.
    pub message: String,
}

/// Sink that records events in memory, for tests and embedders that want to
/// inspect the engine's reporting.
#[derive(Debug, Default)]
pub struct CaptureSink {
    events: Mutex<Vec<CapturedEvent>>,
}

impl CaptureSink {
    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// True if any recorded event is at `level` or above.
    pub fn has_level(&self, level: Level) -> bool {
        self.events.lock().unwrap().iter().any(|e| e.level >= level)
    }
}

impl DiagSink for CaptureSink {
    fn emit(&self, level: Level, origin: &str, detail: Option<&str>, message: &str) {
        self.events.lock().unwrap().push(CapturedEvent {
            level,
            origin: origin.to_string(),
            detail: detail.map(str::to_string),
            message: message.to_string(),
        });
    }
}

/// Handle through which the engine reports progress and failures.
#[derive(Clone)]
pub struct Diagnostics {
    config: DiagConfig,
    sink: Arc<dyn DiagSink>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_config(DiagConfig::default())
    }
}

impl Diagnostics {
    /// Diagnostics with an explicit policy and sink.
    pub fn new(config: DiagConfig, sink: Arc<dyn DiagSink>) -> Self {
        Self { config, sink }
    }

    /// Diagnostics with an explicit policy and the default tracing sink.
    pub fn with_config(config: DiagConfig) -> Self {
        Self::new(config, Arc::new(TracingSink))
    }

    /// The active policy.
    pub fn config(&self) -> DiagConfig {
        self.config
    }

    /// Emit one event, applying level filtering and the error policy.
    pub fn report(&self, level: Level, origin: &str, detail: Option<&str>, message: &str) {
        if level < self.config.min_level {
            return;
        }

        self.sink.emit(level, origin, detail, message);

        if level == Level::Error && self.config.exit_on_error {
            process::exit(1);
        }
    }

    /// Debug-level event.
    pub fn debug(&self, origin: &str, message: &str) {
        self.report(Level::Debug, origin, None, message);
    }

    /// Info-level event carrying an underlying error.
    pub fn sys_info(&self, origin: &str, detail: &str, message: &str) {
        self.report(Level::Info, origin, Some(detail), message);
    }

    /// Warning-level event carrying an underlying error.
    pub fn sys_warning(&self, origin: &str, detail: &str, message: &str) {
        self.report(Level::Warning, origin, Some(detail), message);
    }

    /// Error-level event. May terminate the process, per the policy.
    pub fn error(&self, origin: &str, message: &str) {
        self.report(Level::Error, origin, None, message);
    }

    /// Error-level event carrying an underlying error. May terminate the
    /// process, per the policy.
    pub fn sys_error(&self, origin: &str, detail: &str, message: &str) {
        self.report(Level::Error, origin, Some(detail), message);
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
