//! Command: list profiles and groups.
use anyhow::Result;

use super::list_available;
use crate::config::Config;
use crate::logging::Log;

/// Run the `profiles` command.
///
/// # Errors
///
/// Returns an error if the global section cannot be decoded.
pub fn run(config: &Config, log: &dyn Log) -> Result<()> {
    let global = config.global()?;
    if let Some(file) = config.config_file() {
        log.stage(&format!("{}", file.display()));
    }
    log.debug(&format!("default command: {}", global.default_command));
    list_available(config, log);
    Ok(())
}
