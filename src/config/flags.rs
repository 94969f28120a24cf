//! Flag derivation: turns a resolved profile into restic options.
use std::collections::BTreeMap;
use std::path::Path;

use super::profile::{Profile, SECTION_BACKUP, SECTION_RETENTION};
use super::value::OptionValue;

/// Flag name to values. An empty list is a presence-only flag.
///
/// `BTreeMap` keeps flag names sorted, which makes argument vectors stable.
pub type ResolvedFlags = BTreeMap<String, Vec<String>>;

const FLAG_HOST: &str = "host";
const FLAG_PATH: &str = "path";

/// Insert `value` under `key` following the encoding rules, replacing any
/// previous entry. Values that encode to nothing remove the flag.
fn apply(flags: &mut ResolvedFlags, key: &str, value: &OptionValue) {
    match value.flag_values() {
        Some(values) => {
            flags.insert(key.to_string(), values);
        }
        None => {
            flags.remove(key);
        }
    }
}

fn apply_all(flags: &mut ResolvedFlags, options: &BTreeMap<String, OptionValue>) {
    for (key, value) in options {
        apply(flags, key, value);
    }
}

fn apply_text(flags: &mut ResolvedFlags, key: &str, value: &str) {
    apply(flags, key, &OptionValue::Text(value.to_string()));
}

fn apply_list(flags: &mut ResolvedFlags, key: &str, values: &[String]) {
    apply(flags, key, &OptionValue::List(values.to_vec()));
}

impl Profile {
    /// Flags every command of this profile receives.
    #[must_use]
    pub fn common_flags(&self) -> ResolvedFlags {
        let mut flags = ResolvedFlags::new();
        apply(&mut flags, "quiet", &OptionValue::Bool(self.quiet));
        apply(&mut flags, "verbose", &OptionValue::Bool(self.verbose));
        apply_text(&mut flags, "repo", &self.repository);
        apply_text(&mut flags, "password-file", &self.password_file);
        apply_text(&mut flags, "cache-dir", &self.cache_dir);
        apply_all(&mut flags, &self.other_flags);
        flags
    }

    /// Flags for `command`: the common flags overlaid with the command
    /// section's own options.
    ///
    /// A `host` option set to `true` becomes the hostname recorded by
    /// [`Profile::set_host`]; a string value is used as written.
    #[must_use]
    pub fn command_flags(&self, command: &str) -> ResolvedFlags {
        let mut flags = self.common_flags();
        let mut host = self.other_flags.get(FLAG_HOST);

        match command {
            SECTION_BACKUP => {
                if let Some(backup) = &self.backup {
                    apply_list(&mut flags, "exclude", &backup.exclude);
                    apply_list(&mut flags, "iexclude", &backup.iexclude);
                    apply_list(&mut flags, "exclude-file", &backup.exclude_file);
                    apply_list(&mut flags, "files-from", &backup.files_from);
                    apply(&mut flags, "stdin", &OptionValue::Bool(backup.stdin));
                    apply_all(&mut flags, &backup.other_flags);
                    host = backup.other_flags.get(FLAG_HOST).or(host);
                }
            }
            SECTION_RETENTION => {
                if let Some(retention) = &self.retention {
                    apply_all(&mut flags, &retention.other_flags);
                    host = retention.other_flags.get(FLAG_HOST).or(host);
                }
            }
            other => {
                if let Some(section) = self.commands.get(other) {
                    apply_all(&mut flags, &section.other_flags);
                    host = section.other_flags.get(FLAG_HOST).or(host);
                }
            }
        }

        if let Some(OptionValue::Bool(true)) = host
            && let Some(hostname) = self.host.as_deref().filter(|h| !h.is_empty())
        {
            flags.insert(FLAG_HOST.to_string(), vec![hostname.to_string()]);
        }
        flags
    }

    /// Flags for the retention step.
    ///
    /// Unless the retention section declares its own `path`, the backup
    /// sources are used so the policy only applies to this profile's
    /// snapshots.
    #[must_use]
    pub fn retention_flags(&self) -> ResolvedFlags {
        let mut flags = self.command_flags(SECTION_RETENTION);
        let declares_path = self
            .retention
            .as_ref()
            .is_some_and(|r| r.other_flags.contains_key(FLAG_PATH));
        if !declares_path {
            let source = self.backup_source();
            if !source.is_empty() {
                flags.insert(FLAG_PATH.to_string(), source);
            }
        }
        flags
    }

    /// Backup source paths, passed as positional arguments.
    #[must_use]
    pub fn backup_source(&self) -> Vec<String> {
        self.backup
            .as_ref()
            .map(|b| b.source.clone())
            .unwrap_or_default()
    }

    /// Anchor every relative path option to `root`, normally the directory of
    /// the configuration file.
    ///
    /// Paths starting with `~` or `$` are left for the shell or restic to
    /// expand.
    pub fn set_root_path(&mut self, root: &Path) {
        fix_path(&mut self.lock, root);
        fix_path(&mut self.password_file, root);
        fix_path(&mut self.cache_dir, root);
        if let Some(backup) = &mut self.backup {
            fix_paths(&mut backup.source, root);
            fix_paths(&mut backup.exclude_file, root);
            fix_paths(&mut backup.files_from, root);
        }
    }

    /// Record the hostname used for `host = true`.
    pub fn set_host(&mut self, hostname: &str) {
        self.host = Some(hostname.to_string());
    }
}

fn fix_path(value: &mut String, root: &Path) {
    if value.is_empty() || value.starts_with('~') || value.starts_with('$') {
        return;
    }
    let path = Path::new(value.as_str());
    if path.is_relative() {
        *value = root.join(path).display().to_string();
    }
}

fn fix_paths(values: &mut [String], root: &Path) {
    for value in values {
        fix_path(value, root);
    }
}

/// Assemble flags into arguments: `--name` followed by its values, names in
/// sorted order. A value containing a space is wrapped in double quotes; an
/// empty value leaves the bare flag.
#[must_use]
pub fn to_args(flags: &ResolvedFlags) -> Vec<String> {
    let mut args = Vec::new();
    for (name, values) in flags {
        if values.is_empty() {
            args.push(format!("--{name}"));
            continue;
        }
        for value in values {
            args.push(format!("--{name}"));
            if value.is_empty() {
                continue;
            }
            if value.contains(' ') {
                args.push(format!("\"{value}\""));
            } else {
                args.push(value.clone());
            }
        }
    }
    args
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{Config, Format};
    use std::path::PathBuf;

    fn profile(content: &str) -> Profile {
        Config::parse(content, Format::Toml)
            .and_then(|c| c.load_profile("p"))
            .expect("valid test profile")
    }

    // ------------------------------------------------------------------
    // encoding
    // ------------------------------------------------------------------

    #[test]
    fn empty_profile_has_no_flags() {
        assert!(profile("[p]\n").common_flags().is_empty());
    }

    #[test]
    fn common_fields_follow_encoding_rules() {
        let flags = profile(
            r#"
[p]
quiet = true
verbose = false
repository = "/srv/repo"
password-file = ""
limit = 0
ratio = 4.2
tag = ["one", "two"]
none = []
"#,
        )
        .common_flags();
        assert_eq!(flags["quiet"], Vec::<String>::new());
        assert!(!flags.contains_key("verbose"));
        assert_eq!(flags["repo"], vec!["/srv/repo"]);
        assert!(!flags.contains_key("password-file"));
        assert!(!flags.contains_key("limit"));
        assert_eq!(flags["ratio"], vec!["4.200000"]);
        assert_eq!(flags["tag"], vec!["one", "two"]);
        assert!(!flags.contains_key("none"));
    }

    #[test]
    fn command_section_overrides_common() {
        let flags = profile(
            "[p]\ntag = \"common\"\ncompact = true\n[p.snapshots]\ntag = \"own\"\ncompact = false\n",
        )
        .command_flags("snapshots");
        assert_eq!(flags["tag"], vec!["own"]);
        assert!(!flags.contains_key("compact"));
    }

    #[test]
    fn command_without_section_uses_common_flags() {
        let p = profile("[p]\nrepository = \"r\"\n");
        assert_eq!(p.command_flags("check"), p.common_flags());
    }

    #[test]
    fn backup_typed_fields_are_flags_but_source_is_not() {
        let flags = profile(
            r#"
[p.backup]
source = ["/data"]
exclude = ["*.tmp", "*.bak"]
check-before = true
stdin = true
one-file-system = true
"#,
        )
        .command_flags("backup");
        assert_eq!(flags["exclude"], vec!["*.tmp", "*.bak"]);
        assert_eq!(flags["stdin"], Vec::<String>::new());
        assert_eq!(flags["one-file-system"], Vec::<String>::new());
        assert!(!flags.contains_key("source"));
        assert!(!flags.contains_key("check-before"));
    }

    // ------------------------------------------------------------------
    // host substitution
    // ------------------------------------------------------------------

    #[test]
    fn host_true_becomes_hostname() {
        let mut p = profile("[p.snapshots]\nhost = true\n");
        p.set_host("workstation");
        assert_eq!(p.command_flags("snapshots")["host"], vec!["workstation"]);
    }

    #[test]
    fn host_true_without_hostname_is_presence_flag() {
        let p = profile("[p.snapshots]\nhost = true\n");
        assert_eq!(p.command_flags("snapshots")["host"], Vec::<String>::new());
    }

    #[test]
    fn host_string_is_verbatim() {
        let mut p = profile("[p.snapshots]\nhost = \"server\"\n");
        p.set_host("workstation");
        assert_eq!(p.command_flags("snapshots")["host"], vec!["server"]);
    }

    #[test]
    fn host_absent_is_omitted() {
        let mut p = profile("[p.snapshots]\ncompact = true\n");
        p.set_host("workstation");
        assert!(!p.command_flags("snapshots").contains_key("host"));
    }

    #[test]
    fn host_declared_at_profile_level() {
        let mut p = profile("[p]\nhost = true\n");
        p.set_host("workstation");
        assert_eq!(p.command_flags("forget")["host"], vec!["workstation"]);
    }

    // ------------------------------------------------------------------
    // retention
    // ------------------------------------------------------------------

    #[test]
    fn retention_path_defaults_to_backup_source() {
        let p = profile("[p.backup]\nsource = [\"/data\"]\n[p.retention]\nkeep-last = 3\n");
        let flags = p.retention_flags();
        assert_eq!(flags["path"], vec!["/data"]);
        assert_eq!(flags["keep-last"], vec!["3"]);
    }

    #[test]
    fn retention_declared_path_wins() {
        let p = profile("[p.backup]\nsource = [\"/data\"]\n[p.retention]\npath = [\"/other\"]\n");
        assert_eq!(p.retention_flags()["path"], vec!["/other"]);
    }

    #[test]
    fn retention_without_backup_has_no_path() {
        let p = profile("[p.retention]\nkeep-last = 3\n");
        assert!(!p.retention_flags().contains_key("path"));
    }

    #[test]
    fn backup_source_in_order() {
        let p = profile("[p.backup]\nsource = [\"/b\", \"/a\"]\n");
        assert_eq!(p.backup_source(), vec!["/b", "/a"]);
        assert!(profile("[p]\n").backup_source().is_empty());
    }

    // ------------------------------------------------------------------
    // root path
    // ------------------------------------------------------------------

    #[test]
    fn set_root_path_anchors_relative_paths() {
        let mut p = profile(
            r#"
[p]
lock = "p.lock"
password-file = "/abs/key"
cache-dir = "~/cache"
[p.backup]
source = ["data", "/srv", "$HOME/docs"]
exclude-file = "excludes"
"#,
        );
        let root = PathBuf::from("/etc/resticprofile");
        p.set_root_path(&root);
        assert_eq!(p.lock, root.join("p.lock").display().to_string());
        assert_eq!(p.password_file, "/abs/key");
        assert_eq!(p.cache_dir, "~/cache");
        let backup = p.backup.unwrap();
        assert_eq!(
            backup.source,
            vec![
                root.join("data").display().to_string(),
                "/srv".to_string(),
                "$HOME/docs".to_string()
            ]
        );
        assert_eq!(
            backup.exclude_file,
            vec![root.join("excludes").display().to_string()]
        );
    }

    // ------------------------------------------------------------------
    // assembly
    // ------------------------------------------------------------------

    #[test]
    fn to_args_sorts_and_quotes() {
        let mut flags = ResolvedFlags::new();
        flags.insert("verbose".into(), vec![]);
        flags.insert("tag".into(), vec!["two words".into(), "one".into()]);
        flags.insert("exclude".into(), vec!["a".into()]);
        insta::assert_debug_snapshot!(to_args(&flags), @r#"
        [
            "--exclude",
            "a",
            "--tag",
            "\"two words\"",
            "--tag",
            "one",
            "--verbose",
        ]
        "#);
    }

    #[test]
    fn to_args_keeps_flag_for_empty_value() {
        let mut flags = ResolvedFlags::new();
        flags.insert("tag".into(), vec![String::new(), "x".into()]);
        assert_eq!(to_args(&flags), vec!["--tag", "--tag", "x"]);
    }
}
