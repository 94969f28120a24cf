//! Configuration document: loading, dotted-path access, typed decoding.
//!
//! A configuration file is parsed once into a generic [`toml::Table`]
//! whatever its on-disk format. Top-level tables are profiles, except for the
//! reserved [`SECTION_GLOBAL`] and [`SECTION_GROUPS`] sections.
pub mod flags;
pub mod global;
pub mod profile;
pub mod resolver;
pub mod search;
pub mod value;

use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub use flags::{ResolvedFlags, to_args};
pub use global::Global;
pub use profile::{BackupSection, CommandSection, Profile, RetentionSection};
pub use value::{Number, OptionValue};

/// Reserved section holding [`Global`] settings.
pub const SECTION_GLOBAL: &str = "global";
/// Reserved section mapping group names to profile lists.
pub const SECTION_GROUPS: &str = "groups";

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// TOML (`.toml`, and `.conf` for compatibility).
    Toml,
    /// JSON (`.json`).
    Json,
}

impl Format {
    /// Map a file extension to a format.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] for unknown extensions.
    pub fn from_extension(ext: &str) -> Result<Self, ConfigError> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" | "conf" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// A loaded configuration document.
#[derive(Debug, Clone)]
pub struct Config {
    file: Option<PathBuf>,
    document: toml::Table,
}

impl Config {
    /// Load a configuration file, picking the format from its extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an unknown extension,
    /// or does not parse.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let format = Format::from_extension(&ext)?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::parse(&content, format)?;
        config.file = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse a configuration document from memory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on syntax errors, or if a JSON document
    /// is not an object.
    pub fn parse(content: &str, format: Format) -> Result<Self, ConfigError> {
        let parse_error = |message: String| ConfigError::Parse {
            format: format.name(),
            message,
        };
        let document = match format {
            Format::Toml => content
                .parse::<toml::Table>()
                .map_err(|e| parse_error(e.message().to_string()))?,
            Format::Json => {
                let json: serde_json::Value =
                    serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?;
                match json_to_toml(json) {
                    Some(toml::Value::Table(table)) => table,
                    Some(_) | None => {
                        return Err(parse_error("top-level value must be an object".into()));
                    }
                }
            }
        };
        Ok(Self {
            file: None,
            document,
        })
    }

    /// The file this configuration was loaded from, if any.
    #[must_use]
    pub fn config_file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// The directory relative paths in this configuration are anchored to.
    ///
    /// This is the directory of the configuration file, or `.` for documents
    /// parsed from memory.
    #[must_use]
    pub fn root_path(&self) -> PathBuf {
        self.file
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    /// Look up a dotted path (`profile.backup.source`).
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&toml::Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.document.get(first)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    /// Whether anything is declared at `path`, including an empty table.
    #[must_use]
    pub fn is_set(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// All dotted paths holding a value. Empty tables contribute nothing.
    #[must_use]
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_keys(&self.document, "", &mut keys);
        keys
    }

    /// Decode the section at `path` into a typed record.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Decode`] if the section is missing or does not
    /// match `T`.
    pub fn decode<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConfigError> {
        let value = self.get(path).ok_or_else(|| ConfigError::Decode {
            path: path.to_string(),
            message: "section not found".to_string(),
        })?;
        value.clone().try_into().map_err(|e: toml::de::Error| ConfigError::Decode {
            path: path.to_string(),
            message: e.message().to_string(),
        })
    }

    /// Load the `[global]` section, or the defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the section does not decode.
    pub fn global(&self) -> Result<Global, ConfigError> {
        if self.is_set(SECTION_GLOBAL) {
            self.decode(SECTION_GLOBAL)
        } else {
            Ok(Global::default())
        }
    }

    /// Profile names mapped to the command sections each one declares.
    #[must_use]
    pub fn profile_sections(&self) -> BTreeMap<String, Vec<String>> {
        self.document
            .iter()
            .filter(|(name, _)| !is_reserved(name))
            .filter_map(|(name, value)| {
                let table = value.as_table()?;
                let sections = table
                    .iter()
                    .filter(|(_, v)| v.is_table())
                    .map(|(k, _)| k.clone())
                    .collect();
                Some((name.clone(), sections))
            })
            .collect()
    }
}

fn is_reserved(name: &str) -> bool {
    name == SECTION_GLOBAL || name == SECTION_GROUPS
}

fn collect_keys(table: &toml::Table, prefix: &str, keys: &mut Vec<String>) {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => collect_keys(inner, &path, keys),
            _ => keys.push(path),
        }
    }
}

/// Convert a JSON value into the document model. Nulls have no TOML
/// counterpart and are dropped.
fn json_to_toml(value: serde_json::Value) -> Option<toml::Value> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(toml::Value::Boolean(b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(toml::Value::Integer)
            .or_else(|| n.as_f64().map(toml::Value::Float)),
        serde_json::Value::String(s) => Some(toml::Value::String(s)),
        serde_json::Value::Array(items) => Some(toml::Value::Array(
            items.into_iter().filter_map(json_to_toml).collect(),
        )),
        serde_json::Value::Object(map) => Some(toml::Value::Table(
            map.into_iter()
                .filter_map(|(k, v)| json_to_toml(v).map(|v| (k, v)))
                .collect(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn toml_config(content: &str) -> Config {
        Config::parse(content, Format::Toml).unwrap()
    }

    #[test]
    fn empty_document_has_no_keys() {
        assert!(toml_config("").all_keys().is_empty());
    }

    #[test]
    fn all_keys_skips_empty_tables() {
        let config = toml_config(
            r#"
[profile1]
value = true
[profile3]
[profile3.backup]
[profile4]
value = 1
[profile4.backup]
source = "/"
"#,
        );
        let mut keys = config.all_keys();
        keys.sort();
        assert_eq!(
            keys,
            vec!["profile1.value", "profile4.backup.source", "profile4.value"]
        );
    }

    #[test]
    fn is_set_sees_empty_tables() {
        let config = toml_config("[profile]\n");
        assert!(config.is_set("profile"));
        assert!(!config.is_set("other"));
        assert!(!config.is_set("profile.backup"));
    }

    #[test]
    fn get_follows_dotted_path() {
        let config = toml_config("[p.backup]\nsource = \"/data\"\n");
        assert_eq!(
            config.get("p.backup.source").and_then(toml::Value::as_str),
            Some("/data")
        );
        assert!(config.get("p.backup.source.deeper").is_none());
    }

    #[test]
    fn parse_error_names_format() {
        let err = Config::parse("[unterminated", Format::Toml).unwrap_err();
        assert!(err.to_string().starts_with("cannot parse toml configuration"));
    }

    #[test]
    fn json_documents_share_the_model() {
        let config = Config::parse(
            r#"{ "profile": { "backup": { "source": "/" }, "forget": { "keep-daily": 1 }, "skip": null } }"#,
            Format::Json,
        )
        .unwrap();
        assert!(config.is_set("profile.forget.keep-daily"));
        assert!(!config.is_set("profile.skip"));
    }

    #[test]
    fn json_top_level_must_be_object() {
        assert!(Config::parse("[1, 2]", Format::Json).is_err());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_extension("conf").unwrap(), Format::Toml);
        assert_eq!(Format::from_extension("JSON").unwrap(), Format::Json);
        assert!(Format::from_extension("hcl").is_err());
    }

    #[test]
    fn global_defaults_when_absent() {
        let global = toml_config("").global().unwrap();
        assert_eq!(global.default_command, "snapshots");
        assert!(!global.initialize);
    }

    #[test]
    fn global_from_section() {
        let global = toml_config(
            "[global]\ndefault-command = \"version\"\ninitialize = true\nrestic-binary = \"/opt/restic\"\n",
        )
        .global()
        .unwrap();
        assert_eq!(global.default_command, "version");
        assert!(global.initialize);
        assert_eq!(global.restic_binary, "/opt/restic");
    }

    #[test]
    fn profile_sections_lists_command_tables() {
        let config = toml_config(
            r#"
[global]
initialize = true
[groups]
all = ["a"]
[a]
repository = "r"
[a.backup]
source = "/"
[a.snapshots]
[b]
"#,
        );
        let sections = config.profile_sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections["a"], vec!["backup", "snapshots"]);
        assert!(sections["b"].is_empty());
    }

    #[test]
    fn root_path_defaults_to_current_dir() {
        assert_eq!(toml_config("").root_path(), PathBuf::from("."));
    }

    #[test]
    fn load_file_records_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.conf");
        std::fs::write(&path, "[p]\nrepository = \"r\"\n").unwrap();
        let config = Config::load_file(&path).unwrap();
        assert_eq!(config.config_file(), Some(path.as_path()));
        assert_eq!(config.root_path(), dir.path());
    }
}
