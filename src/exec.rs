//! External command execution with cancellation.
//!
//! [`Runner`] is the seam between the orchestrator and the operating system:
//! [`SystemRunner`] spawns real processes, tests substitute a recording
//! double.
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::ProcessError;
use crate::logging::Log;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Interrupt signal shared between the signal handler and the runner.
///
/// [`cancel`](Self::cancel) arms a pending interruption which the next
/// observer consumes with [`take_pending`](Self::take_pending), so only the
/// command that was active is interrupted. [`was_cancelled`](Self::was_cancelled)
/// keeps reporting that an interruption happened at all.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    pending: Arc<AtomicBool>,
    fired: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the "not cancelled" state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Called from the signal handler.
    pub fn cancel(&self) {
        self.fired.store(true, Ordering::Release);
        self.pending.store(true, Ordering::Release);
    }

    /// Consume a pending cancellation, returning whether there was one.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Returns `true` if [`Self::cancel`] has ever been called.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Where the child's stdin comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdinMode {
    /// No input.
    #[default]
    Null,
    /// The caller's stdin, e.g. `backup --stdin`.
    Inherit,
}

/// Where the child's stderr goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StderrMode {
    /// The caller's stderr.
    #[default]
    Inherit,
    /// Thrown away.
    Discard,
}

/// One external command to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to start.
    pub program: String,
    /// Arguments, already assembled.
    pub args: Vec<String>,
    /// Variables added on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Stdin connection.
    pub stdin: StdinMode,
    /// Stderr connection.
    pub stderr: StderrMode,
    /// Log the command instead of running it.
    pub dry_run: bool,
}

impl CommandSpec {
    /// A command with the default stream setup.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            ..Self::default()
        }
    }

    /// The command line as it would be typed, for logs.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs one external command to completion.
pub trait Runner: Send + Sync + std::fmt::Debug {
    /// Run `spec`, observing `cancel` while the command is active.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] if the command cannot start, exits
    /// unsuccessfully, or is interrupted.
    fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<(), ProcessError>;
}

/// Production [`Runner`] backed by [`std::process::Command`].
pub struct SystemRunner {
    log: Arc<dyn Log>,
    grace: Duration,
}

impl std::fmt::Debug for SystemRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRunner")
            .field("log", &"<dyn Log>")
            .field("grace", &self.grace)
            .finish()
    }
}

impl SystemRunner {
    /// Create a runner that reports dry-run commands to `log`.
    #[must_use]
    pub fn new(log: Arc<dyn Log>) -> Self {
        Self {
            log,
            grace: DEFAULT_GRACE,
        }
    }

    /// How long an interrupted child may take to exit before it is killed.
    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    fn interrupt(&self, child: &mut std::process::Child, program: &str) -> ProcessError {
        // The child shares our terminal and usually got the interrupt too.
        let deadline = Instant::now() + self.grace;
        while Instant::now() < deadline {
            if matches!(child.try_wait(), Ok(Some(_)) | Err(_)) {
                return ProcessError::Cancelled {
                    program: program.to_string(),
                };
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        self.log
            .debug(&format!("killing '{program}' (pid {})", child.id()));
        if let Err(e) = child.kill() {
            self.log
                .warn(&format!("failed to kill '{program}' (pid {}): {e}", child.id()));
        }
        child.wait().ok();
        ProcessError::Cancelled {
            program: program.to_string(),
        }
    }
}

impl Runner for SystemRunner {
    fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<(), ProcessError> {
        if spec.dry_run {
            self.log.dry_run(&spec.display());
            return Ok(());
        }
        if cancel.take_pending() {
            return Err(ProcessError::Cancelled {
                program: spec.program.clone(),
            });
        }

        self.log.debug(&format!("starting: {}", spec.display()));
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdout(Stdio::inherit());
        command.stdin(match spec.stdin {
            StdinMode::Null => Stdio::null(),
            StdinMode::Inherit => Stdio::inherit(),
        });
        command.stderr(match spec.stderr {
            StderrMode::Inherit => Stdio::inherit(),
            StderrMode::Discard => Stdio::null(),
        });

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    // The child saw the interrupt before we polled it.
                    if cancel.take_pending() {
                        return Err(ProcessError::Cancelled {
                            program: spec.program.clone(),
                        });
                    }
                    return Err(ProcessError::Exit {
                        program: spec.program.clone(),
                        status: status.to_string(),
                        code: status.code(),
                    });
                }
                Ok(None) => {
                    if cancel.take_pending() {
                        return Err(self.interrupt(&mut child, &spec.program));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    return Err(ProcessError::Spawn {
                        program: spec.program.clone(),
                        source,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logging::Logger;

    fn runner() -> SystemRunner {
        SystemRunner::new(Arc::new(Logger::new("exec-test")))
    }

    fn shell(line: &str) -> CommandSpec {
        #[cfg(windows)]
        {
            CommandSpec::new("cmd", vec!["/C".to_string(), line.to_string()])
        }
        #[cfg(not(windows))]
        {
            CommandSpec::new("sh", vec!["-c".to_string(), line.to_string()])
        }
    }

    // ------------------------------------------------------------------
    // CancellationToken
    // ------------------------------------------------------------------

    #[test]
    fn new_token_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.was_cancelled());
        assert!(!token.take_pending());
    }

    #[test]
    fn pending_is_consumed_once() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.take_pending());
        assert!(!token.take_pending());
        assert!(token.was_cancelled());
    }

    #[test]
    fn clone_sees_same_state() {
        let token = CancellationToken::new();
        let cloned = token.clone();
        token.cancel();
        assert!(cloned.was_cancelled());
    }

    // ------------------------------------------------------------------
    // SystemRunner
    // ------------------------------------------------------------------

    #[test]
    fn successful_command() {
        runner()
            .run(&shell("exit 0"), &CancellationToken::new())
            .unwrap();
    }

    #[test]
    fn failing_command_reports_code() {
        let err = runner()
            .run(&shell("exit 3"), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, ProcessError::Exit { code: Some(3), .. }));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let spec = CommandSpec::new("this-program-does-not-exist-12345", vec![]);
        let err = runner().run(&spec, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[test]
    fn dry_run_never_spawns() {
        let mut spec = CommandSpec::new("this-program-does-not-exist-12345", vec![]);
        spec.dry_run = true;
        runner().run(&spec, &CancellationToken::new()).unwrap();
    }

    #[test]
    fn pending_cancellation_stops_before_spawn() {
        let token = CancellationToken::new();
        token.cancel();
        let err = runner().run(&shell("exit 0"), &token).unwrap_err();
        assert!(matches!(err, ProcessError::Cancelled { .. }));
        assert!(!token.take_pending());
    }

    #[cfg(unix)]
    #[test]
    fn cancellation_kills_running_child() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(300));
            trigger.cancel();
        });
        let started = Instant::now();
        let err = runner()
            .with_grace(Duration::from_millis(200))
            .run(&shell("sleep 30"), &token)
            .unwrap_err();
        handle.join().unwrap();
        assert!(matches!(err, ProcessError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn child_exiting_after_interrupt_counts_as_cancelled() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            trigger.cancel();
        });
        // Exits on its own between two polls, after the token fired.
        let err = runner()
            .run(&shell("sleep 0.06; exit 130"), &token)
            .unwrap_err();
        handle.join().unwrap();
        assert!(matches!(err, ProcessError::Cancelled { .. }));
        assert!(!token.take_pending());
        assert!(token.was_cancelled());
    }

    #[cfg(unix)]
    #[test]
    fn extra_environment_reaches_child() {
        let mut spec = shell("test \"$PROFILE_NAME\" = home");
        spec.env.push(("PROFILE_NAME".to_string(), "home".to_string()));
        runner().run(&spec, &CancellationToken::new()).unwrap();
    }

    #[test]
    fn display_joins_program_and_args() {
        let spec = CommandSpec::new("restic", vec!["backup".into(), "--repo".into(), "r".into()]);
        assert_eq!(spec.display(), "restic backup --repo r");
    }
}
