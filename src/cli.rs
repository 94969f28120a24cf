use clap::Parser;

/// Top-level command line: options, then the restic command and its
/// pass-through arguments.
#[derive(Parser, Debug)]
#[command(
    name = "resticprofile",
    about = "Configuration profiles manager for restic backup",
    version
)]
pub struct Cli {
    /// Configuration file to load (extension optional)
    #[arg(short = 'c', long = "config", default_value = "profiles")]
    pub config: String,

    /// Profile or group to run
    #[arg(short = 'n', long = "name", default_value = "default")]
    pub name: String,

    /// Display only warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Display debugging messages
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Restic command to run, or `profiles` to list the configuration
    pub command: Option<String>,

    /// Arguments passed to restic unchanged
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["resticprofile"]);
        assert_eq!(cli.config, "profiles");
        assert_eq!(cli.name, "default");
        assert!(cli.command.is_none());
        assert!(cli.args.is_empty());
        assert!(!cli.dry_run);
    }

    #[test]
    fn name_and_command() {
        let cli = Cli::parse_from(["resticprofile", "-n", "home", "backup"]);
        assert_eq!(cli.name, "home");
        assert_eq!(cli.command.as_deref(), Some("backup"));
    }

    #[test]
    fn config_long_form() {
        let cli = Cli::parse_from(["resticprofile", "--config", "/etc/backup.toml", "check"]);
        assert_eq!(cli.config, "/etc/backup.toml");
    }

    #[test]
    fn trailing_args_keep_hyphens() {
        let cli = Cli::parse_from([
            "resticprofile",
            "--name",
            "home",
            "snapshots",
            "--latest",
            "1",
            "--compact",
        ]);
        assert_eq!(cli.command.as_deref(), Some("snapshots"));
        assert_eq!(cli.args, vec!["--latest", "1", "--compact"]);
    }

    #[test]
    fn verbosity_flags() {
        let cli = Cli::parse_from(["resticprofile", "-q", "-v"]);
        assert!(cli.quiet);
        assert!(cli.verbose);
    }

    #[test]
    fn dry_run_before_command() {
        let cli = Cli::parse_from(["resticprofile", "--dry-run", "backup"]);
        assert!(cli.dry_run);
        assert_eq!(cli.command.as_deref(), Some("backup"));
    }
}
