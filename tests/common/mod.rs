// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed configuration file and a recording
// process runner so each integration test can drive whole profile runs
// without starting restic.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use resticprofile::commands::run::{RunOptions, Session};
use resticprofile::config::Config;
use resticprofile::error::ProcessError;
use resticprofile::exec::{CancellationToken, CommandSpec, Runner};
use resticprofile::logging::Logger;
use resticprofile::platform::{Os, Platform};

/// A configuration file inside a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct ConfigFixture {
    /// Directory holding the configuration file; also the root path for
    /// relative profile paths.
    pub root: tempfile::TempDir,
    /// Path to the written file.
    pub file: PathBuf,
}

impl ConfigFixture {
    /// Write `content` to `profiles.toml` in a fresh directory.
    pub fn toml(content: &str) -> Self {
        Self::with_name("profiles.toml", content)
    }

    /// Write `content` to `profiles.json` in a fresh directory.
    pub fn json(content: &str) -> Self {
        Self::with_name("profiles.json", content)
    }

    /// Write `content` to `name` in a fresh directory.
    pub fn with_name(name: &str, content: &str) -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        let file = root.path().join(name);
        std::fs::write(&file, content).expect("write configuration file");
        Self { root, file }
    }

    /// Directory of the configuration file.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Load the configuration file.
    pub fn load(&self) -> Config {
        Config::load_file(&self.file).expect("load configuration")
    }
}

/// [`Runner`] that records every command instead of running it.
///
/// Commands whose command line contains one of `fail_on` exit with status 1.
/// A command matching `cancel_on` fires the cancellation token and reports
/// an interruption.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    fail_on: Vec<String>,
    cancel_on: Option<String>,
}

impl RecordingRunner {
    /// A runner where every command succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner failing the commands that contain any of `patterns`.
    pub fn failing(patterns: &[&str]) -> Self {
        Self {
            fail_on: patterns.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    /// A runner interrupting the first command containing `pattern`.
    pub fn cancelling(pattern: &str) -> Self {
        Self {
            cancel_on: Some(pattern.to_string()),
            ..Self::default()
        }
    }

    /// Every recorded command.
    pub fn specs(&self) -> Vec<CommandSpec> {
        self.calls.lock().expect("runner lock").clone()
    }

    /// Every recorded command line.
    pub fn lines(&self) -> Vec<String> {
        self.specs().iter().map(CommandSpec::display).collect()
    }
}

impl Runner for RecordingRunner {
    fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<(), ProcessError> {
        self.calls.lock().expect("runner lock").push(spec.clone());
        let line = spec.display();
        if self
            .cancel_on
            .as_deref()
            .is_some_and(|p| line.contains(p))
        {
            cancel.cancel();
            cancel.take_pending();
            return Err(ProcessError::Cancelled {
                program: spec.program.clone(),
            });
        }
        if self.fail_on.iter().any(|p| line.contains(p.as_str())) {
            return Err(ProcessError::Exit {
                program: spec.program.clone(),
                status: "exit status: 1".to_string(),
                code: Some(1),
            });
        }
        Ok(())
    }
}

/// A session running `restic` through `runner` on a fixed Unix host.
pub fn session(runner: Arc<RecordingRunner>) -> Session {
    Session {
        runner,
        binary: "restic".to_string(),
        platform: Platform::new(Os::Unix, "testhost"),
        cancel: CancellationToken::new(),
        log: Arc::new(Logger::new("integration-test")),
    }
}

/// Options running `command` on `name`.
pub fn options(name: &str, command: &str) -> RunOptions {
    RunOptions {
        name: name.to_string(),
        command: Some(command.to_string()),
        ..RunOptions::default()
    }
}
