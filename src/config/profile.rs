//! Profile model and the partial documents it is resolved from.
//!
//! A profile section is decoded into a [`ProfileDoc`] whose fields are all
//! optional. Resolution starts from a default [`Profile`] (or the resolved
//! parent) and [`Profile::overlay`]s each document onto it, so a field that a
//! document does not declare keeps its previous value.
use serde::Deserialize;
use std::collections::BTreeMap;

use super::value::{OptionValue, scalar_to_string};

/// Name of the section holding backup options.
pub const SECTION_BACKUP: &str = "backup";
/// Name of the section holding the retention policy.
pub const SECTION_RETENTION: &str = "retention";

/// A string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Keys a profile section declares, exactly as written.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct ProfileDoc {
    pub(crate) inherit: Option<String>,
    description: Option<String>,
    quiet: Option<bool>,
    verbose: Option<bool>,
    initialize: Option<bool>,
    repository: Option<String>,
    password_file: Option<String>,
    cache_dir: Option<String>,
    lock: Option<String>,
    run_before: Option<OneOrMany>,
    run_after: Option<OneOrMany>,
    run_after_fail: Option<OneOrMany>,
    env: Option<BTreeMap<String, toml::Value>>,
    backup: Option<BackupDoc>,
    retention: Option<RetentionDoc>,
    #[serde(flatten)]
    rest: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BackupDoc {
    source: Option<OneOrMany>,
    exclude: Option<OneOrMany>,
    iexclude: Option<OneOrMany>,
    exclude_file: Option<OneOrMany>,
    files_from: Option<OneOrMany>,
    stdin: Option<bool>,
    check_before: Option<bool>,
    check_after: Option<bool>,
    run_before: Option<OneOrMany>,
    run_after: Option<OneOrMany>,
    #[serde(flatten)]
    rest: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RetentionDoc {
    before_backup: Option<bool>,
    after_backup: Option<bool>,
    #[serde(flatten)]
    rest: BTreeMap<String, toml::Value>,
}

/// A fully resolved profile.
///
/// Empty strings and empty lists mean "not configured".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    /// The key the profile was requested under.
    pub name: String,
    /// Parent profile declared by this profile or an ancestor.
    pub inherit: String,
    /// Free-form description, shown by the `profiles` command.
    pub description: String,
    /// Pass `--quiet` to every command.
    pub quiet: bool,
    /// Pass `--verbose` to every command.
    pub verbose: bool,
    /// Run `init` before the command.
    pub initialize: bool,
    /// Repository location, emitted as `--repo`.
    pub repository: String,
    /// Repository password file.
    pub password_file: String,
    /// Cache directory.
    pub cache_dir: String,
    /// Lock file path; empty disables locking.
    pub lock: String,
    /// Shell commands run before anything else.
    pub run_before: Vec<String>,
    /// Shell commands run after everything succeeded.
    pub run_after: Vec<String>,
    /// Shell commands run when any step failed.
    pub run_after_fail: Vec<String>,
    /// Extra environment variables for every command.
    pub environment: BTreeMap<String, String>,
    /// Untyped profile-level options, passed to every command.
    pub other_flags: BTreeMap<String, OptionValue>,
    /// The `backup` section, when declared.
    pub backup: Option<BackupSection>,
    /// The `retention` section, when declared.
    pub retention: Option<RetentionSection>,
    /// Every other command section, by command name.
    pub commands: BTreeMap<String, CommandSection>,
    pub(crate) host: Option<String>,
}

/// The `backup` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupSection {
    /// Paths to back up, appended last to the backup command.
    pub source: Vec<String>,
    /// `--exclude` patterns.
    pub exclude: Vec<String>,
    /// `--iexclude` patterns.
    pub iexclude: Vec<String>,
    /// `--exclude-file` paths.
    pub exclude_file: Vec<String>,
    /// `--files-from` paths.
    pub files_from: Vec<String>,
    /// Read the backup data from the caller's stdin.
    pub stdin: bool,
    /// Run `check` before the backup.
    pub check_before: bool,
    /// Run `check` after the backup.
    pub check_after: bool,
    /// Shell commands run before the backup command.
    pub run_before: Vec<String>,
    /// Shell commands run after the backup command.
    pub run_after: Vec<String>,
    /// Untyped options.
    pub other_flags: BTreeMap<String, OptionValue>,
}

/// The `retention` section: `forget` options applied around a backup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetentionSection {
    /// Apply the retention policy before the backup.
    pub before_backup: bool,
    /// Apply the retention policy after the backup.
    pub after_backup: bool,
    /// Untyped options, `path` included.
    pub other_flags: BTreeMap<String, OptionValue>,
}

/// Any other command section (`check`, `snapshots`, `forget`...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSection {
    /// Untyped options.
    pub other_flags: BTreeMap<String, OptionValue>,
}

impl Profile {
    /// Overlay a profile document: every declared key replaces the current
    /// value, everything else is left alone.
    pub(crate) fn overlay(&mut self, doc: ProfileDoc) {
        set(&mut self.inherit, doc.inherit);
        set(&mut self.description, doc.description);
        set(&mut self.quiet, doc.quiet);
        set(&mut self.verbose, doc.verbose);
        set(&mut self.initialize, doc.initialize);
        set(&mut self.repository, doc.repository);
        set(&mut self.password_file, doc.password_file);
        set(&mut self.cache_dir, doc.cache_dir);
        set(&mut self.lock, doc.lock);
        set_list(&mut self.run_before, doc.run_before);
        set_list(&mut self.run_after, doc.run_after);
        set_list(&mut self.run_after_fail, doc.run_after_fail);
        if let Some(env) = doc.env {
            self.environment = env
                .iter()
                .filter_map(|(k, v)| {
                    OptionValue::from_toml(v).map(|v| (k.clone(), v.to_plain_string()))
                })
                .collect();
        }
        if let Some(backup) = doc.backup {
            self.backup.get_or_insert_with(BackupSection::default).overlay(backup);
        }
        if let Some(retention) = doc.retention {
            self.retention
                .get_or_insert_with(RetentionSection::default)
                .overlay(retention);
        }
        for (key, value) in doc.rest {
            match value {
                toml::Value::Table(table) => {
                    let section = self.commands.entry(key).or_default();
                    overlay_flags(&mut section.other_flags, table);
                }
                scalar => {
                    if let Some(value) = OptionValue::from_toml(&scalar) {
                        self.other_flags.insert(key, value);
                    }
                }
            }
        }
    }

    /// Whether initialization should run for this profile.
    #[must_use]
    pub fn wants_initialize(&self, global_initialize: bool) -> bool {
        global_initialize || self.initialize
    }

    /// Names of the command sections this profile declares.
    #[must_use]
    pub fn section_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        if self.backup.is_some() {
            names.push(SECTION_BACKUP);
        }
        if self.retention.is_some() {
            names.push(SECTION_RETENTION);
        }
        names.sort_unstable();
        names
    }
}

impl BackupSection {
    fn overlay(&mut self, doc: BackupDoc) {
        set_list(&mut self.source, doc.source);
        set_list(&mut self.exclude, doc.exclude);
        set_list(&mut self.iexclude, doc.iexclude);
        set_list(&mut self.exclude_file, doc.exclude_file);
        set_list(&mut self.files_from, doc.files_from);
        set(&mut self.stdin, doc.stdin);
        set(&mut self.check_before, doc.check_before);
        set(&mut self.check_after, doc.check_after);
        set_list(&mut self.run_before, doc.run_before);
        set_list(&mut self.run_after, doc.run_after);
        overlay_flags(&mut self.other_flags, doc.rest);
    }
}

impl RetentionSection {
    fn overlay(&mut self, doc: RetentionDoc) {
        set(&mut self.before_backup, doc.before_backup);
        set(&mut self.after_backup, doc.after_backup);
        overlay_flags(&mut self.other_flags, doc.rest);
    }
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn set_list(field: &mut Vec<String>, value: Option<OneOrMany>) {
    if let Some(value) = value {
        *field = value.into();
    }
}

/// Nested tables inside a command section are not options and are ignored.
fn overlay_flags<I>(flags: &mut BTreeMap<String, OptionValue>, entries: I)
where
    I: IntoIterator<Item = (String, toml::Value)>,
{
    for (key, value) in entries {
        if let Some(value) = OptionValue::from_toml(&value) {
            flags.insert(key, value);
        }
    }
}

/// Render a document value as a string list, for callers outside the typed
/// model.
#[must_use]
pub fn value_as_list(value: &toml::Value) -> Vec<String> {
    match value {
        toml::Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}
