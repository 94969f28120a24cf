//! Observational record of backup, retention and check outcomes.
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::logging::Log;

/// Lifecycle phase an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The main backup command.
    Backup,
    /// The retention (`forget`) step around a backup.
    Retention,
    /// The `check` step around a backup.
    Check,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backup => write!(f, "backup"),
            Self::Retention => write!(f, "retention"),
            Self::Check => write!(f, "check"),
        }
    }
}

/// One recorded outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    /// Profile name.
    pub profile: String,
    /// Phase that finished.
    pub phase: Phase,
    /// Error message when the phase failed.
    pub error: Option<String>,
    /// When the phase finished.
    pub time: DateTime<Utc>,
}

impl StatusEntry {
    /// A successful outcome stamped now.
    #[must_use]
    pub fn success(profile: &str, phase: Phase) -> Self {
        Self {
            profile: profile.to_string(),
            phase,
            error: None,
            time: Utc::now(),
        }
    }

    /// A failed outcome stamped now.
    #[must_use]
    pub fn failure(profile: &str, phase: Phase, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::success(profile, phase)
        }
    }

    /// Whether the phase succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Receives phase outcomes. Never consulted for control flow.
#[cfg_attr(test, mockall::automock)]
pub trait StatusRecorder: Send + Sync {
    /// Record one outcome.
    fn record(&self, entry: &StatusEntry);
}

/// Default recorder: writes outcomes to the log.
pub struct LogStatus {
    log: Arc<dyn Log>,
}

impl fmt::Debug for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStatus").field("log", &"<dyn Log>").finish()
    }
}

impl LogStatus {
    /// Create a recorder that reports to `log`.
    #[must_use]
    pub fn new(log: Arc<dyn Log>) -> Self {
        Self { log }
    }
}

impl StatusRecorder for LogStatus {
    fn record(&self, entry: &StatusEntry) {
        let when = entry.time.format("%Y-%m-%d %H:%M:%S");
        match &entry.error {
            None => self.log.debug(&format!(
                "status: {} {} succeeded at {when}",
                entry.profile, entry.phase
            )),
            Some(error) => self.log.debug(&format!(
                "status: {} {} failed at {when}: {error}",
                entry.profile, entry.phase
            )),
        }
    }
}
