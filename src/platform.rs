use std::ffi::OsStr;
use std::fmt;

/// Hostname used when none can be determined.
pub const UNKNOWN_HOST: &str = "none";

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Linux and other Unix-like systems.
    Unix,
    /// Windows.
    Windows,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => write!(f, "unix"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Operating system family, which decides the hook shell.
    pub os: Os,
    /// Machine hostname, substituted for `host = true`.
    pub hostname: String,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            os: Self::detect_os(),
            hostname: Self::detect_hostname(),
        }
    }

    /// Create a platform with explicit values (for testing).
    #[must_use]
    pub fn new(os: Os, hostname: &str) -> Self {
        Self {
            os,
            hostname: hostname.to_string(),
        }
    }

    /// Program and arguments that run `line` through the platform shell.
    #[must_use]
    pub fn shell_command(&self, line: &str) -> (String, Vec<String>) {
        match self.os {
            Os::Unix => ("sh".to_string(), vec!["-c".to_string(), line.to_string()]),
            Os::Windows => ("cmd".to_string(), vec!["/C".to_string(), line.to_string()]),
        }
    }

    const fn detect_os() -> Os {
        if cfg!(target_os = "windows") {
            Os::Windows
        } else {
            Os::Unix
        }
    }

    fn detect_hostname() -> String {
        hostname_or_unknown(&gethostname::gethostname())
    }
}

/// The trimmed host name, or [`UNKNOWN_HOST`] when the OS reports none.
fn hostname_or_unknown(raw: &OsStr) -> String {
    let name = raw.to_string_lossy();
    let name = name.trim();
    if name.is_empty() {
        UNKNOWN_HOST.to_string()
    } else {
        name.to_string()
    }
}
