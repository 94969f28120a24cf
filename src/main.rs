use anyhow::{Context as _, Result};
use clap::Parser;
use std::sync::Arc;

use resticprofile::cli::Cli;
use resticprofile::commands::{self, COMMAND_PROFILES, run::RunOptions, run::Session};
use resticprofile::config::search;
use resticprofile::exec::{CancellationToken, SystemRunner};
use resticprofile::logging::{self, Log, Logger, Verbosity};
use resticprofile::platform::Platform;

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let cli = Cli::parse();

    let (verbosity, conflict) = Verbosity::from_flags(cli.quiet, cli.verbose);
    logging::init_subscriber(verbosity, &cli.name);
    let log = Arc::new(Logger::new(&cli.name));
    if conflict {
        log.warn("both --quiet and --verbose given: using --verbose");
    }

    let version = option_env!("RESTICPROFILE_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.debug(&format!("resticprofile {version}"));

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("cannot install the interrupt handler")?;

    let config = commands::load_config(&cli.config, log.as_ref())?;

    if cli.command.as_deref() == Some(COMMAND_PROFILES) {
        return commands::profiles::run(&config, log.as_ref());
    }

    let global = config.global()?;
    let binary = match search::find_restic_binary(&global.restic_binary) {
        Some(binary) => binary,
        None if cli.dry_run => "restic".to_string(),
        None => anyhow::bail!("cannot find restic: install it or set 'restic-binary' in [global]"),
    };
    log.debug(&format!("using restic binary {binary}"));

    let platform = Platform::detect();
    log.debug(&format!("{} host {}", platform.os, platform.hostname));

    let session = Session {
        runner: Arc::new(SystemRunner::new(Arc::clone(&log) as Arc<dyn Log>)),
        binary,
        platform,
        cancel,
        log,
    };
    commands::run::run(&config, &RunOptions::from_cli(&cli), &session)
}
