//! Profile run lifecycle.
//!
//! One [`Orchestrator`] runs one profile through one command:
//!
//! ```text
//! lock -> run-before -> [init] -> (backup: run-before backup, check, retention)
//!      -> command -> (backup: retention, check, run-after backup) -> run-after -> unlock
//! ```
//!
//! Any failing step skips the rest and runs the `run-after-fail` hooks
//! instead. The lock is released on every path.
mod context;
mod hooks;

pub use context::ExecutionContext;
pub use hooks::HookStage;

use std::sync::Arc;

use crate::config::to_args;
use crate::error::{ProcessError, RunError};
use crate::exec::{CommandSpec, Runner, StderrMode, StdinMode};
use crate::lock::{self, FileLockBackend, LockBackend};
use crate::logging::Log;
use crate::status::{LogStatus, Phase, StatusEntry, StatusRecorder};

/// Restic `backup` command.
pub const COMMAND_BACKUP: &str = "backup";
/// Restic `check` command.
pub const COMMAND_CHECK: &str = "check";
/// Restic `forget` command, used by the retention step.
pub const COMMAND_FORGET: &str = "forget";
/// Restic `init` command.
pub const COMMAND_INIT: &str = "init";

/// Runs one profile through its lifecycle.
pub struct Orchestrator {
    ctx: ExecutionContext,
    runner: Arc<dyn Runner>,
    lock_backend: Arc<dyn LockBackend>,
    status: Arc<dyn StatusRecorder>,
    log: Arc<dyn Log>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("ctx", &self.ctx)
            .field("runner", &self.runner)
            .field("lock_backend", &self.lock_backend)
            .field("status", &"<dyn StatusRecorder>")
            .field("log", &"<dyn Log>")
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator using file locks and logging the phase status.
    #[must_use]
    pub fn new(ctx: ExecutionContext, runner: Arc<dyn Runner>, log: Arc<dyn Log>) -> Self {
        Self {
            ctx,
            runner,
            lock_backend: Arc::new(FileLockBackend),
            status: Arc::new(LogStatus::new(Arc::clone(&log))),
            log,
        }
    }

    /// Replace the lock storage.
    #[must_use]
    pub fn with_lock_backend(mut self, backend: Arc<dyn LockBackend>) -> Self {
        self.lock_backend = backend;
        self
    }

    /// Replace the status recorder.
    #[must_use]
    pub fn with_status(mut self, status: Arc<dyn StatusRecorder>) -> Self {
        self.status = status;
        self
    }

    /// The context this orchestrator runs.
    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Run the whole lifecycle once.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Lock`] without running anything when the profile is
    /// locked by someone else. Otherwise returns the error of the first
    /// failing step, wrapped in [`RunError::PostFailHook`] if the failure
    /// hooks failed too.
    pub fn run(&self) -> Result<(), RunError> {
        let identity = lock::holder_identity(&self.ctx.platform.hostname);
        let mut held = lock::acquire(
            &self.ctx.profile.lock,
            &identity,
            Arc::clone(&self.lock_backend),
            self.log.as_ref(),
        )?;

        let result = self.run_steps().map_err(|err| self.recover(err));

        if let Some(lock) = held.as_mut()
            && let Err(e) = lock.release()
        {
            self.log.warn(&format!(
                "cannot remove lock file {}: {e}",
                lock.path().display()
            ));
        }
        result
    }

    fn run_steps(&self) -> Result<(), RunError> {
        let profile = &self.ctx.profile;
        let is_backup = self.ctx.command == COMMAND_BACKUP;
        let backup = profile.backup.clone().unwrap_or_default();
        let retention = profile.retention.clone().unwrap_or_default();

        self.hook_step(HookStage::ProfileBefore, &profile.run_before)?;

        if self.ctx.initialize && self.ctx.command != COMMAND_INIT {
            self.initialize();
        }

        if is_backup {
            self.hook_step(HookStage::BackupBefore, &backup.run_before)?;
            if backup.check_before {
                self.check()?;
            }
            if retention.before_backup {
                self.retention()?;
            }
        }

        self.main_command()?;

        if is_backup {
            if retention.after_backup {
                self.retention()?;
            }
            if backup.check_after {
                self.check()?;
            }
            self.hook_step(HookStage::BackupAfter, &backup.run_after)?;
        }

        self.hook_step(HookStage::ProfileAfter, &profile.run_after)
    }

    /// Run the failure hooks for `err` and return the error to report.
    fn recover(&self, err: RunError) -> RunError {
        let name = &self.ctx.profile.name;
        if self.ctx.profile.run_after_fail.is_empty() {
            return err;
        }
        self.log
            .debug(&format!("profile '{name}': running failure hooks"));
        match self.run_hooks(
            HookStage::PostFail,
            &self.ctx.profile.run_after_fail,
            Some(&err.to_string()),
        ) {
            Ok(()) => err,
            Err(source) => RunError::PostFailHook {
                original: Box::new(err),
                profile: name.clone(),
                source,
            },
        }
    }

    /// Best effort: an existing repository makes `init` fail, which is fine.
    fn initialize(&self) {
        let name = &self.ctx.profile.name;
        self.log.info(&format!(
            "profile '{name}': initializing repository (if not existing)"
        ));
        let flags = self.ctx.profile.command_flags(COMMAND_INIT);
        let mut spec = self.restic_command(COMMAND_INIT, to_args(&flags));
        spec.stderr = StderrMode::Discard;
        if let Err(e) = self.runner.run(&spec, &self.ctx.cancel) {
            self.log.debug(&format!(
                "repository initialization on profile '{name}': {e}"
            ));
        }
    }

    fn check(&self) -> Result<(), RunError> {
        self.log.info(&format!(
            "profile '{}': checking repository consistency",
            self.ctx.profile.name
        ));
        let spec = self.restic_command(
            COMMAND_CHECK,
            to_args(&self.ctx.profile.command_flags(COMMAND_CHECK)),
        );
        let result = self.runner.run(&spec, &self.ctx.cancel);
        self.record(Phase::Check, result.as_ref().err());
        result.map_err(|source| self.command_error("backup check", source))
    }

    fn retention(&self) -> Result<(), RunError> {
        self.log.info(&format!(
            "profile '{}': cleaning up repository using retention information",
            self.ctx.profile.name
        ));
        let flags = self.ctx.profile.retention_flags();
        let spec = self.restic_command(COMMAND_FORGET, to_args(&flags));
        let result = self.runner.run(&spec, &self.ctx.cancel);
        self.record(Phase::Retention, result.as_ref().err());
        result.map_err(|source| self.command_error("backup retention", source))
    }

    fn main_command(&self) -> Result<(), RunError> {
        let profile = &self.ctx.profile;
        let command = self.ctx.command.as_str();
        self.log
            .info(&format!("profile '{}': starting '{command}'", profile.name));

        let mut spec = self.restic_command(command, to_args(&profile.command_flags(command)));
        if command == COMMAND_BACKUP {
            spec.args.extend(profile.backup_source());
            if profile.backup.as_ref().is_some_and(|b| b.stdin) {
                self.log.debug("redirecting stdin to the backup");
                spec.stdin = StdinMode::Inherit;
            }
        }

        let result = self.runner.run(&spec, &self.ctx.cancel);
        if command == COMMAND_BACKUP {
            self.record(Phase::Backup, result.as_ref().err());
        }
        result.map_err(|source| self.command_error(command, source))?;
        self.log
            .info(&format!("profile '{}': finished '{command}'", profile.name));
        Ok(())
    }

    /// `verb`, then `flag_args`, then the pass-through arguments.
    fn restic_command(&self, verb: &str, flag_args: Vec<String>) -> CommandSpec {
        let mut args = Vec::with_capacity(flag_args.len() + self.ctx.args.len() + 1);
        args.push(verb.to_string());
        args.extend(flag_args);
        args.extend(self.ctx.args.iter().cloned());
        let mut spec = CommandSpec::new(self.ctx.binary.clone(), args);
        spec.env = self.environment();
        spec.dry_run = self.ctx.dry_run;
        spec
    }

    /// Profile variables (names upper-cased) plus `PROFILE_NAME` and
    /// `PROFILE_COMMAND`.
    fn environment(&self) -> Vec<(String, String)> {
        let profile = &self.ctx.profile;
        let mut env: Vec<(String, String)> = profile
            .environment
            .iter()
            .map(|(k, v)| (k.to_uppercase(), v.clone()))
            .collect();
        env.push(("PROFILE_NAME".to_string(), profile.name.clone()));
        env.push(("PROFILE_COMMAND".to_string(), self.ctx.command.clone()));
        env
    }

    fn record(&self, phase: Phase, error: Option<&ProcessError>) {
        let name = &self.ctx.profile.name;
        let entry = match error {
            None => StatusEntry::success(name, phase),
            Some(e) => StatusEntry::failure(name, phase, &e.to_string()),
        };
        self.status.record(&entry);
    }

    fn command_error(&self, step: &str, source: ProcessError) -> RunError {
        RunError::Command {
            step: step.to_string(),
            profile: self.ctx.profile.name.clone(),
            source,
        }
    }
}
