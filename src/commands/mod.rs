//! Command handlers behind the CLI.
//!
//! Handlers work on an already loaded [`Config`] and return
//! [`anyhow::Result`]; typed errors from the library modules are converted
//! with `?` at this boundary.
pub mod profiles;
pub mod run;

use anyhow::{Context as _, Result};

use crate::config::{Config, search};
use crate::logging::Log;

/// Own command listing the configuration instead of running restic.
pub const COMMAND_PROFILES: &str = "profiles";

/// Locate and load the configuration file called `name`.
///
/// # Errors
///
/// Returns an error if no file is found or the file cannot be parsed.
pub fn load_config(name: &str, log: &dyn Log) -> Result<Config> {
    let path = search::find_configuration_file(name)
        .with_context(|| format!("cannot find configuration file '{name}'"))?;
    log.debug(&format!("using configuration file {}", path.display()));
    let config = Config::load_file(&path)
        .with_context(|| format!("cannot load configuration file {}", path.display()))?;
    log.debug(&format!("{} setting(s) loaded", config.all_keys().len()));
    Ok(config)
}

/// Log the profiles and groups `config` declares.
pub fn list_available(config: &Config, log: &dyn Log) {
    let profiles = config.profile_sections();
    if profiles.is_empty() {
        log.warn("no profile defined");
    } else {
        log.info("profiles available:");
        for name in profiles.keys() {
            match config.load_profile(name) {
                Ok(profile) => {
                    let sections = profile.section_names().join(", ");
                    let description = if profile.description.is_empty() {
                        String::new()
                    } else {
                        format!(" - {}", profile.description)
                    };
                    log.info(&format!("  {name}: ({sections}){description}"));
                }
                Err(e) => log.warn(&format!("  {name}: {e}")),
            }
        }
    }

    let groups = config.groups();
    if !groups.is_empty() {
        log.info("groups available:");
        for (name, members) in groups {
            log.info(&format!("  {name}: {}", members.join(", ")));
        }
    }
}
