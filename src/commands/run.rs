//! Command: run a restic command on a profile or on every profile of a group.
use anyhow::{Context as _, Result};
use std::sync::Arc;

use super::list_available;
use crate::cli::Cli;
use crate::config::{Config, Global, Profile};
use crate::error::ConfigError;
use crate::exec::{CancellationToken, Runner};
use crate::logging::{Log, Logger, RunStatus, Verbosity};
use crate::orchestrator::{ExecutionContext, Orchestrator};
use crate::platform::Platform;

/// What to run, as selected on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Profile or group name.
    pub name: String,
    /// Restic command; the global default when `None`.
    pub command: Option<String>,
    /// Arguments passed to restic unchanged.
    pub args: Vec<String>,
    /// Log commands instead of running them.
    pub dry_run: bool,
    /// Command line verbosity, forced onto restic's own flags.
    pub verbosity: Verbosity,
}

impl RunOptions {
    /// Options from the parsed command line.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        let (verbosity, _) = Verbosity::from_flags(cli.quiet, cli.verbose);
        Self {
            name: cli.name.clone(),
            command: cli.command.clone(),
            args: cli.args.clone(),
            dry_run: cli.dry_run,
            verbosity,
        }
    }
}

/// Collaborators shared by every profile of one invocation.
#[derive(Debug)]
pub struct Session {
    /// Executes restic and hook commands.
    pub runner: Arc<dyn Runner>,
    /// Path to the restic binary.
    pub binary: String,
    /// Host description used for hooks and locks.
    pub platform: Platform,
    /// Interrupt signal.
    pub cancel: CancellationToken,
    /// Logger collecting the per-profile summary.
    pub log: Arc<Logger>,
}

/// Run `opts` against `config`: a single profile, or each member of a group
/// in declared order.
///
/// # Errors
///
/// Returns an error if the name matches neither a profile nor a group, if
/// the single profile fails, or if any group member fails.
pub fn run(config: &Config, opts: &RunOptions, session: &Session) -> Result<()> {
    let global = config.global()?;
    let command = opts
        .command
        .clone()
        .unwrap_or_else(|| global.default_command.clone());

    if config.has_profile(&opts.name) {
        return run_profile(config, &global, &opts.name, &command, opts, session);
    }

    if config.has_group(&opts.name) {
        let members = config.load_group(&opts.name)?;
        return run_group(config, &global, &members, &command, opts, session);
    }

    list_available(config, session.log.as_ref());
    Err(ConfigError::ProfileNotFound(opts.name.clone()))
        .context("nothing to run: no profile or group by that name")
}

fn run_group(
    config: &Config,
    global: &Global,
    members: &[String],
    command: &str,
    opts: &RunOptions,
    session: &Session,
) -> Result<()> {
    let log = &session.log;
    log.info(&format!(
        "group '{}': {} profile(s)",
        opts.name,
        members.len()
    ));

    for name in members {
        if session.cancel.was_cancelled() {
            log.record_run(name, RunStatus::Skipped, Some("interrupted"));
            continue;
        }
        log.stage(&format!("Profile {name}"));
        match run_profile(config, global, name, command, opts, session) {
            Ok(()) if opts.dry_run => log.record_run(name, RunStatus::DryRun, None),
            Ok(()) => log.record_run(name, RunStatus::Ok, None),
            Err(e) => {
                log.error(&format!("{e:#}"));
                log.record_run(name, RunStatus::Failed, Some(&format!("{e:#}")));
            }
        }
    }

    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} profile(s) failed in group '{}'", opts.name);
    }
    if session.cancel.was_cancelled() {
        anyhow::bail!("group '{}' was interrupted", opts.name);
    }
    Ok(())
}

fn run_profile(
    config: &Config,
    global: &Global,
    name: &str,
    command: &str,
    opts: &RunOptions,
    session: &Session,
) -> Result<()> {
    let mut profile = config.load_profile(name)?;
    prepare(&mut profile, config, opts.verbosity, &session.platform);
    let initialize = profile.wants_initialize(global.initialize);

    let ctx = ExecutionContext::new(profile, command, &session.binary, session.platform.clone())
        .with_args(opts.args.clone())
        .with_dry_run(opts.dry_run)
        .with_initialize(initialize)
        .with_cancel(session.cancel.clone());

    let log: Arc<dyn Log> = Arc::clone(&session.log) as Arc<dyn Log>;
    Orchestrator::new(ctx, Arc::clone(&session.runner), log).run()?;
    Ok(())
}

/// Apply the invocation's settings to a freshly resolved profile.
fn prepare(profile: &mut Profile, config: &Config, verbosity: Verbosity, platform: &Platform) {
    match verbosity {
        Verbosity::Quiet => {
            profile.quiet = true;
            profile.verbose = false;
        }
        Verbosity::Verbose => {
            profile.quiet = false;
            profile.verbose = true;
        }
        Verbosity::Normal => {}
    }
    profile.set_root_path(&config.root_path());
    profile.set_host(&platform.hostname);
}
