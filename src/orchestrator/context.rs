use crate::config::Profile;
use crate::exec::CancellationToken;
use crate::platform::Platform;

/// Everything one profile run needs, owned by the orchestrator for the
/// duration of the run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Resolved profile with root path and host already applied.
    pub profile: Profile,
    /// Restic command to run (`backup`, `snapshots`...).
    pub command: String,
    /// Extra arguments from the command line, passed to restic as-is.
    pub args: Vec<String>,
    /// Path to the restic binary.
    pub binary: String,
    /// Log commands instead of running them.
    pub dry_run: bool,
    /// Run `init` before the command.
    pub initialize: bool,
    /// Interrupt signal shared with the signal handler.
    pub cancel: CancellationToken,
    /// Hook shell and lock identity come from here.
    pub platform: Platform,
}

impl ExecutionContext {
    /// A context with no extra arguments, dry-run off and initialization off.
    #[must_use]
    pub fn new(profile: Profile, command: &str, binary: &str, platform: Platform) -> Self {
        Self {
            profile,
            command: command.to_string(),
            args: Vec::new(),
            binary: binary.to_string(),
            dry_run: false,
            initialize: false,
            cancel: CancellationToken::new(),
            platform,
        }
    }

    /// Set the pass-through arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Enable or disable dry-run.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable initialization.
    #[must_use]
    pub const fn with_initialize(mut self, initialize: bool) -> Self {
        self.initialize = initialize;
        self
    }

    /// Share an existing cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
