//! Advisory per-profile lock based on the presence of a file.
//!
//! Whoever creates the lock file owns the profile until the file is removed.
//! The file content identifies the holder for diagnostics. Storage goes
//! through [`LockBackend`] so the locking rules can be tested without a real
//! filesystem.
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::LockError;
use crate::logging::Log;

/// Filesystem operations the lock needs.
pub trait LockBackend: Send + Sync + std::fmt::Debug {
    /// Create `path` and its missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Atomically create `path` with `contents` unless it already exists.
    ///
    /// Returns `Ok(false)` when the file is already present.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than the file existing.
    fn create_exclusive(&self, path: &Path, contents: &str) -> io::Result<bool>;

    /// Read the content of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Remove `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Production [`LockBackend`] that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct FileLockBackend;

impl LockBackend for FileLockBackend {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn create_exclusive(&self, path: &Path, contents: &str) -> io::Result<bool> {
        use std::io::Write as _;
        create_new_with(path, |file| file.write_all(contents.as_bytes()))
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Create `path` only if it does not exist, then fill it with `write`.
///
/// A file that could not be written is removed again so it cannot pass for
/// a held lock.
fn create_new_with(
    path: &Path,
    write: impl FnOnce(&mut std::fs::File) -> io::Result<()>,
) -> io::Result<bool> {
    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };
    if let Err(e) = write(&mut file) {
        drop(file);
        std::fs::remove_file(path).ok();
        return Err(e);
    }
    Ok(true)
}

/// Identity written into lock files: host and process.
#[must_use]
pub fn holder_identity(hostname: &str) -> String {
    format!("process {} on host {hostname}", std::process::id())
}

/// A lock on one file.
#[derive(Debug)]
pub struct Lock {
    path: PathBuf,
    identity: String,
    backend: Arc<dyn LockBackend>,
    acquired: bool,
}

impl Lock {
    /// Prepare a lock on `path`; nothing is touched until
    /// [`try_acquire`](Self::try_acquire).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, identity: &str, backend: Arc<dyn LockBackend>) -> Self {
        Self {
            path: path.into(),
            identity: identity.to_string(),
            backend,
            acquired: false,
        }
    }

    /// Take the lock without waiting.
    ///
    /// Returns `Ok(false)` when another holder owns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created.
    pub fn try_acquire(&mut self) -> io::Result<bool> {
        if self.acquired {
            return Ok(true);
        }
        self.acquired = self.backend.create_exclusive(&self.path, &self.identity)?;
        Ok(self.acquired)
    }

    /// Identity of the current holder, as recorded in the lock file.
    #[must_use]
    pub fn who(&self) -> String {
        self.backend
            .read(&self.path)
            .map(|s| s.trim().to_string())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown holder".to_string())
    }

    /// Lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Give the lock up. Safe to call repeatedly, or on a handle that never
    /// acquired.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be removed; the handle no
    /// longer owns the lock either way.
    pub fn release(&mut self) -> io::Result<()> {
        if !self.acquired {
            return Ok(());
        }
        self.acquired = false;
        self.backend.remove(&self.path)
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        self.release().ok();
    }
}

/// Lock the profile whose lock file is `path`.
///
/// Locking is opt-in: an empty path yields `Ok(None)`. So does a lock
/// directory that cannot be created, after a warning.
///
/// # Errors
///
/// Returns [`LockError::Held`] naming the holder when another run owns the
/// lock, or [`LockError::Io`] when the file cannot be created.
pub fn acquire(
    path: &str,
    identity: &str,
    backend: Arc<dyn LockBackend>,
    log: &dyn Log,
) -> Result<Option<Lock>, LockError> {
    if path.is_empty() {
        return Ok(None);
    }
    let file = PathBuf::from(path);
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty())
        && let Err(e) = backend.create_dir_all(parent)
    {
        log.warn(&format!(
            "cannot create lock directory {}, running without a lock: {e}",
            parent.display()
        ));
        return Ok(None);
    }

    let mut lock = Lock::new(file, identity, backend);
    match lock.try_acquire() {
        Ok(true) => {
            log.debug(&format!("lock acquired: {path}"));
            Ok(Some(lock))
        }
        Ok(false) => Err(LockError::Held {
            path: path.to_string(),
            holder: lock.who(),
        }),
        Err(source) => Err(LockError::Io {
            path: path.to_string(),
            source,
        }),
    }
}

/// In-memory [`LockBackend`] for unit tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockLockBackend {
    files: std::sync::Mutex<std::collections::HashMap<PathBuf, String>>,
    fail_dirs: bool,
    removed: std::sync::Mutex<Vec<PathBuf>>,
}

#[cfg(test)]
impl MockLockBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every directory creation fail.
    #[must_use]
    pub const fn with_failing_dirs(mut self) -> Self {
        self.fail_dirs = true;
        self
    }

    /// Number of files removed so far.
    pub fn removed_count(&self) -> usize {
        self.removed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether `path` currently exists.
    pub fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(path)
    }
}

#[cfg(test)]
impl LockBackend for MockLockBackend {
    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        if self.fail_dirs {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        } else {
            Ok(())
        }
    }

    fn create_exclusive(&self, path: &Path, contents: &str) -> io::Result<bool> {
        let mut files = self
            .files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if files.contains_key(path) {
            return Ok(false);
        }
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(true)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no lock file"))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(path);
        self.removed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(path.to_path_buf());
        Ok(())
    }
}
