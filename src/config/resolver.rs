//! Profile and group lookup with inheritance.
use super::profile::{Profile, ProfileDoc, value_as_list};
use super::{Config, SECTION_GROUPS, is_reserved};
use crate::error::ConfigError;

impl Config {
    /// Whether a profile section named `key` exists.
    #[must_use]
    pub fn has_profile(&self, key: &str) -> bool {
        !is_reserved(key) && self.get(key).is_some_and(toml::Value::is_table)
    }

    /// Resolve the profile `key`, following `inherit` chains.
    ///
    /// The resolved profile always carries `key` as its name. Each level of
    /// the chain only overrides what its own section declares.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProfileNotFound`] when `key` is absent,
    /// [`ConfigError::ParentNotFound`] when an ancestor is missing and
    /// [`ConfigError::InheritanceCycle`] when the chain loops.
    pub fn load_profile(&self, key: &str) -> Result<Profile, ConfigError> {
        let mut visiting = Vec::new();
        let mut profile = self.resolve_profile(key, &mut visiting)?;
        profile.name = key.to_string();
        Ok(profile)
    }

    fn resolve_profile(&self, key: &str, visiting: &mut Vec<String>) -> Result<Profile, ConfigError> {
        if visiting.iter().any(|v| v == key) {
            let mut chain = visiting.clone();
            chain.push(key.to_string());
            return Err(ConfigError::InheritanceCycle {
                profile: chain.first().cloned().unwrap_or_default(),
                chain: chain.join(" -> "),
            });
        }
        if !self.has_profile(key) {
            return Err(ConfigError::ProfileNotFound(key.to_string()));
        }
        let doc: ProfileDoc = self.decode(key)?;
        visiting.push(key.to_string());

        let mut profile = match doc.inherit.as_deref().filter(|p| !p.is_empty()) {
            Some(parent) => self
                .resolve_profile(parent, visiting)
                .map_err(|e| match e {
                    ConfigError::ProfileNotFound(missing) => ConfigError::ParentNotFound {
                        profile: key.to_string(),
                        parent: missing,
                    },
                    other => other,
                })?,
            None => Profile::default(),
        };
        profile.overlay(doc);
        profile.name = key.to_string();
        Ok(profile)
    }

    /// Whether a group named `key` exists.
    #[must_use]
    pub fn has_group(&self, key: &str) -> bool {
        self.get(SECTION_GROUPS)
            .and_then(toml::Value::as_table)
            .is_some_and(|groups| groups.contains_key(key))
    }

    /// Ordered member list of group `key`. Duplicates are kept.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::GroupNotFound`] when the group is absent.
    pub fn load_group(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        self.get(SECTION_GROUPS)
            .and_then(toml::Value::as_table)
            .and_then(|groups| groups.get(key))
            .map(value_as_list)
            .ok_or_else(|| ConfigError::GroupNotFound(key.to_string()))
    }

    /// All group names with their members.
    #[must_use]
    pub fn groups(&self) -> Vec<(String, Vec<String>)> {
        self.get(SECTION_GROUPS)
            .and_then(toml::Value::as_table)
            .map(|groups| {
                groups
                    .iter()
                    .map(|(name, members)| (name.clone(), value_as_list(members)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
