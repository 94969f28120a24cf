//! Structured logger with dry-run awareness and the group run summary.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{TARGET_DRY_RUN, TARGET_STAGE};
use super::types::{Log, RunEntry, RunStatus};
use super::utils::log_file_path;

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const GREY: &str = "\x1b[37m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Counts per [`RunStatus`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    ok: usize,
    skipped: usize,
    dry_run: usize,
    failed: usize,
}

impl Tally {
    fn add(&mut self, status: RunStatus) {
        match status {
            RunStatus::Ok => self.ok += 1,
            RunStatus::Skipped => self.skipped += 1,
            RunStatus::DryRun => self.dry_run += 1,
            RunStatus::Failed => self.failed += 1,
        }
    }

    const fn total(self) -> usize {
        self.ok + self.skipped + self.dry_run + self.failed
    }
}

const fn marker(status: RunStatus) -> (&'static str, &'static str) {
    match status {
        RunStatus::Ok => ("✓", GREEN),
        RunStatus::Skipped => ("○", YELLOW),
        RunStatus::DryRun => ("~", GREY),
        RunStatus::Failed => ("✗", RED),
    }
}

/// Logger handed to every component as `Arc<dyn Log>`.
///
/// Messages become [`tracing`] events; the subscriber installed by
/// [`init_subscriber`](super::subscriber::init_subscriber) routes them to the
/// console and the log file. Profile outcomes are kept for
/// [`print_summary`](Self::print_summary).
#[derive(Debug)]
pub struct Logger {
    runs: Mutex<Vec<RunEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a logger for the profile or group `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            runs: Mutex::new(Vec::new()),
            log_file: log_file_path(name),
        }
    }

    /// Log file path, if the cache directory was usable.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn run_entries(&self) -> Vec<RunEntry> {
        self.snapshot()
    }

    fn snapshot(&self) -> Vec<RunEntry> {
        self.runs.lock().map_or_else(|_| Vec::new(), |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a section header, e.g. the profile a group is about to run.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: TARGET_STAGE, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message. Hidden on the console unless verbose, always
    /// written to the log file.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a command that dry-run mode did not start.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: TARGET_DRY_RUN, "{msg}");
    }

    /// Record the outcome of one profile.
    pub fn record_run(&self, name: &str, status: RunStatus, message: Option<&str>) {
        if let Ok(mut runs) = self.runs.lock() {
            runs.push(RunEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Number of recorded profiles that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|r| r.status == RunStatus::Failed)
            .count()
    }

    /// Log one line per recorded profile, then the totals. Does nothing when
    /// no profile was recorded.
    pub fn print_summary(&self) {
        let runs = self.snapshot();
        if runs.is_empty() {
            return;
        }

        self.stage("Summary");
        let mut tally = Tally::default();
        for run in &runs {
            tally.add(run.status);
            let (icon, color) = marker(run.status);
            let suffix = run
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            self.info(&format!("{color}{icon} {}{suffix}{RESET}", run.name));
        }

        self.info(&format!(
            "{} profiles: {GREEN}{} ok{RESET}, {YELLOW}{} skipped{RESET}, {GREY}{} dry-run{RESET}, {RED}{} failed{RESET}",
            tally.total(),
            tally.ok,
            tally.skipped,
            tally.dry_run,
            tally.failed
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}{RESET}", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_run(&self, name: &str, status: RunStatus, message: Option<&str>) {
        self.record_run(name, status, message);
    }
}
