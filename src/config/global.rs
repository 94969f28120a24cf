//! The `[global]` section.
use serde::Deserialize;

/// Command run when none is given on the command line.
pub const DEFAULT_COMMAND: &str = "snapshots";

/// Settings shared by every profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Global {
    /// Command used when the command line names none.
    pub default_command: String,
    /// Run `init` before every profile.
    pub initialize: bool,
    /// Path to the restic binary; empty means look it up on `PATH`.
    pub restic_binary: String,
}

impl Default for Global {
    fn default() -> Self {
        Self {
            default_command: DEFAULT_COMMAND.to_string(),
            initialize: false,
            restic_binary: String::new(),
        }
    }
}
