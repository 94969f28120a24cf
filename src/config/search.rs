//! Locating the configuration file and the restic binary.
use std::path::{Path, PathBuf};

/// Extensions tried, in order, when the configuration name has none.
pub const EXTENSIONS: [&str; 3] = ["toml", "conf", "json"];

const APP_DIR: &str = "resticprofile";

/// Directories searched for a configuration file, in priority order: the
/// current directory, the user configuration directory, then the system
/// ones.
#[must_use]
pub fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(user) = user_config_dir() {
        dirs.push(user.join(APP_DIR));
    }
    dirs.push(PathBuf::from("/usr/local/etc").join(APP_DIR));
    dirs.push(PathBuf::from("/etc").join(APP_DIR));
    dirs
}

fn user_config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".config"))
        })
}

/// Find the configuration file called `name` in the standard locations.
#[must_use]
pub fn find_configuration_file(name: &str) -> Option<PathBuf> {
    find_configuration_file_in(name, &search_dirs())
}

/// Find the configuration file called `name`, trying it as given first and
/// then each directory of `dirs`. A name without extension is tried with each
/// of [`EXTENSIONS`].
#[must_use]
pub fn find_configuration_file_in(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let wanted = candidates(Path::new(name));
    if let Some(found) = wanted.iter().find(|p| p.is_file()) {
        return Some(normalize(found));
    }
    if Path::new(name).is_absolute() {
        return None;
    }
    dirs.iter()
        .flat_map(|dir| wanted.iter().map(move |c| dir.join(c)))
        .find(|p| p.is_file())
        .map(|p| normalize(&p))
}

fn candidates(name: &Path) -> Vec<PathBuf> {
    if name.extension().is_some() {
        return vec![name.to_path_buf()];
    }
    EXTENSIONS
        .iter()
        .map(|ext| name.with_extension(ext))
        .collect()
}

fn normalize(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// The restic binary to run: `configured` when set, otherwise `restic` found
/// on `PATH`.
#[must_use]
pub fn find_restic_binary(configured: &str) -> Option<String> {
    if !configured.is_empty() {
        return Some(configured.to_string());
    }
    which::which("restic")
        .ok()
        .map(|p| normalize(&p).display().to_string())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_name_with_extension_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("backups.toml"), "").unwrap();
        let found = find_configuration_file_in("backups", &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(found.file_name().unwrap(), "backups.toml");
    }

    #[test]
    fn extension_order_prefers_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("profiles.json"), "{}").unwrap();
        fs::write(dir.path().join("profiles.toml"), "").unwrap();
        let found = find_configuration_file_in("profiles", &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(found.extension().unwrap(), "toml");
    }

    #[test]
    fn earlier_directory_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("profiles.conf"), "").unwrap();
        fs::write(second.path().join("profiles.toml"), "").unwrap();
        let found = find_configuration_file_in(
            "profiles",
            &[first.path().to_path_buf(), second.path().to_path_buf()],
        )
        .unwrap();
        assert_eq!(found.file_name().unwrap(), "profiles.conf");
    }

    #[test]
    fn absolute_path_used_as_given() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.json");
        fs::write(&file, "{}").unwrap();
        let found = find_configuration_file_in(file.to_str().unwrap(), &[]).unwrap();
        assert_eq!(found, dunce::canonicalize(&file).unwrap());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_configuration_file_in("nothing-here", &[dir.path().to_path_buf()]).is_none());
    }

    #[test]
    fn configured_binary_wins() {
        assert_eq!(
            find_restic_binary("/opt/restic/restic").as_deref(),
            Some("/opt/restic/restic")
        );
    }

    #[test]
    fn search_dirs_start_with_current_dir() {
        let dirs = search_dirs();
        assert_eq!(dirs[0], PathBuf::from("."));
        assert_eq!(dirs.last().unwrap(), &PathBuf::from("/etc/resticprofile"));
    }
}
