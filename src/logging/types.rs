//! Core logging types: run entries, status, and the [`Log`] trait.

/// Outcome of one profile run, kept for the group summary.
#[derive(Debug, Clone)]
pub struct RunEntry {
    /// Profile name.
    pub name: String,
    /// Final status of the run.
    pub status: RunStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a completed profile run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The run completed successfully.
    Ok,
    /// The run was not attempted (e.g., the group was interrupted first).
    Skipped,
    /// The run happened in dry-run mode; nothing was executed.
    DryRun,
    /// The run ended with an error.
    Failed,
}

/// Abstraction over logging backends.
///
/// Components receive an `Arc<dyn Log>` instead of reaching for process-wide
/// state, so tests can substitute a recording implementation.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a command that would have run.
    fn dry_run(&self, msg: &str);
    /// Record a profile run result for the summary.
    fn record_run(&self, name: &str, status: RunStatus, message: Option<&str>);
}
