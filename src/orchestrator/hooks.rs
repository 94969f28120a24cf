//! Shell hooks around a profile run.
use std::fmt;

use super::Orchestrator;
use crate::error::{ProcessError, RunError};
use crate::exec::CommandSpec;

/// Which hook list is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    /// Profile `run-before`.
    ProfileBefore,
    /// Profile `run-after`.
    ProfileAfter,
    /// Backup section `run-before`.
    BackupBefore,
    /// Backup section `run-after`.
    BackupAfter,
    /// Profile `run-after-fail`.
    PostFail,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ProfileBefore => "run-before",
            Self::ProfileAfter => "run-after",
            Self::BackupBefore => "run-before backup",
            Self::BackupAfter => "run-after backup",
            Self::PostFail => "run-after-fail",
        })
    }
}

impl Orchestrator {
    /// Run `commands` in order through the platform shell. The first failure
    /// stops the list.
    pub(super) fn run_hooks(
        &self,
        stage: HookStage,
        commands: &[String],
        error: Option<&str>,
    ) -> Result<(), ProcessError> {
        let total = commands.len();
        for (i, line) in commands.iter().enumerate() {
            self.log.debug(&format!(
                "starting '{stage}' command {}/{total}",
                i + 1
            ));
            let (program, args) = self.ctx.platform.shell_command(line);
            let mut spec = CommandSpec::new(program, args);
            spec.env = self.environment();
            if let Some(error) = error {
                spec.env.push(("ERROR".to_string(), error.to_string()));
            }
            spec.dry_run = self.ctx.dry_run;
            self.runner.run(&spec, &self.ctx.cancel)?;
        }
        Ok(())
    }

    /// Run a hook list as a lifecycle step.
    pub(super) fn hook_step(&self, stage: HookStage, commands: &[String]) -> Result<(), RunError> {
        self.run_hooks(stage, commands, None)
            .map_err(|source| RunError::Hook {
                stage,
                profile: self.ctx.profile.name.clone(),
                source,
            })
    }
}
