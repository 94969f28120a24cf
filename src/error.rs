//! Domain-specific error types for the profile runner.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Library modules return typed errors (e.g., [`ConfigError`], [`RunError`])
//! while command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! ConfigError: file parsing, decoding, profile/group resolution
//! LockError: profile lock held by another process, lock I/O
//! ProcessError: one external command: spawn, exit status, interruption
//! RunError: one profile run: lock, hook, command, post-fail hook
//! ```

use thiserror::Error;

use crate::orchestrator::HookStage;

/// Errors that arise from configuration loading and profile resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("cannot open configuration file {path} for reading: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file extension does not map to a supported format.
    #[error("unsupported configuration format '{0}'")]
    UnsupportedFormat(String),

    /// The document contains a syntax error.
    #[error("cannot parse {format} configuration: {message}")]
    Parse {
        /// Format name (`toml`, `json`).
        format: &'static str,
        /// Parser message.
        message: String,
    },

    /// A section exists but does not match the expected record shape.
    #[error("cannot decode section '{path}': {message}")]
    Decode {
        /// Dotted path of the section.
        path: String,
        /// Decoder message.
        message: String,
    },

    /// The requested profile is not defined.
    #[error("profile '{0}' not found")]
    ProfileNotFound(String),

    /// The requested group is not defined.
    #[error("group '{0}' not found")]
    GroupNotFound(String),

    /// A profile inherits from a profile that is not defined.
    #[error("error in profile '{profile}': parent profile '{parent}' not found")]
    ParentNotFound {
        /// Profile declaring the inheritance.
        profile: String,
        /// Missing parent name.
        parent: String,
    },

    /// A profile inherits (directly or transitively) from itself.
    #[error("error in profile '{profile}': inheritance cycle {chain}")]
    InheritanceCycle {
        /// Profile that was requested.
        profile: String,
        /// The chain of names, e.g. `a -> b -> a`.
        chain: String,
    },
}

/// Errors raised by the profile lock.
#[derive(Error, Debug)]
pub enum LockError {
    /// The lock file is present: another run owns this profile.
    #[error("another process is already running this profile: {holder}")]
    Held {
        /// Lock file path.
        path: String,
        /// Holder identity read from the lock file.
        holder: String,
    },

    /// The lock file could not be created for a reason other than being held.
    #[error("cannot create lock file {path}: {source}")]
    Io {
        /// Lock file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Failure of a single external command.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("cannot start '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("'{program}' failed: {status}")]
    Exit {
        /// Program that failed.
        program: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Exit code, when the process was not killed by a signal.
        code: Option<i32>,
    },

    /// The run was interrupted while the program was active.
    #[error("'{program}' was interrupted")]
    Cancelled {
        /// Program that was active when the interruption arrived.
        program: String,
    },
}

/// Errors that end a profile run.
#[derive(Error, Debug)]
pub enum RunError {
    /// The profile lock could not be taken; nothing was executed.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A lifecycle hook failed.
    #[error("{stage} on profile '{profile}': {source}")]
    Hook {
        /// Which hook list failed.
        stage: HookStage,
        /// Profile name.
        profile: String,
        /// The failing hook command.
        source: ProcessError,
    },

    /// A restic invocation (main command, check or retention) failed.
    #[error("{step} on profile '{profile}': {source}")]
    Command {
        /// Step label, e.g. `backup` or `backup retention`.
        step: String,
        /// Profile name.
        profile: String,
        /// The failing command.
        source: ProcessError,
    },

    /// The failure hooks themselves failed after an earlier error.
    #[error("{original} (run-after-fail on profile '{profile}' also failed: {source})")]
    PostFailHook {
        /// The error that triggered the failure hooks.
        original: Box<RunError>,
        /// Profile name.
        profile: String,
        /// The failing post-fail hook.
        source: ProcessError,
    },
}

impl RunError {
    /// The error that ended the lifecycle, looking through a post-fail hook
    /// failure.
    #[must_use]
    pub fn original(&self) -> &Self {
        match self {
            Self::PostFailHook { original, .. } => original.original(),
            other => other,
        }
    }

    /// Whether the run ended because it was interrupted.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.original(),
            Self::Hook {
                source: ProcessError::Cancelled { .. },
                ..
            } | Self::Command {
                source: ProcessError::Cancelled { .. },
                ..
            }
        )
    }
}
