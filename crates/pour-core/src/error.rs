//! Domain-specific errors for formula installs.
//!
//! Every failure is terminal for the install attempt; nothing is retried.

use std::path::PathBuf;
use std::process::ExitStatus;

use pour_schema::{PackageName, Platform, Sha256Digest};
use thiserror::Error;

use crate::formula::FormulaError;
use crate::io::download::DownloadError;

/// Top-level error of every pipeline step.
#[derive(Error, Debug)]
pub enum Error {
    /// The formula could not be loaded or is malformed.
    #[error("Invalid formula: {0}")]
    Formula(#[from] FormulaError),

    /// None of the formula's platform rules covers the host.
    #[error(
        "No platform rule for {host} in formula '{package}' (declared: {})",
        join_platforms(.declared)
    )]
    NoMatchingPlatform {
        /// Package being resolved.
        package: PackageName,
        /// Host platform.
        host: Platform,
        /// Platforms the formula does declare.
        declared: Vec<Platform>,
    },

    /// The artifact could not be fetched.
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    /// The artifact could not be verified.
    #[error("Integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    /// Placing files into the prefix failed.
    #[error("Install failed: {0}")]
    Install(#[from] InstallError),

    /// The post-install smoke test did not pass.
    #[error("Test failed: {0}")]
    TestFailure(#[from] TestFailure),

    /// The package has no receipt in this prefix.
    #[error("{0} is not installed")]
    NotInstalled(PackageName),
}

fn join_platforms(platforms: &[Platform]) -> String {
    if platforms.is_empty() {
        return "none".to_string();
    }
    platforms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Checksum verification failures.
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// The fetched bytes hash to something other than the declared digest.
    #[error("SHA256 mismatch for {url}: expected {expected}, got {actual}")]
    Mismatch {
        /// Source of the artifact.
        url: String,
        /// Digest declared by the formula.
        expected: Sha256Digest,
        /// Digest of the fetched bytes.
        actual: Sha256Digest,
    },

    /// The formula still carries a placeholder checksum.
    #[error("{package} declares placeholder checksum '{placeholder}' for {platform}; refusing to install unverified artifact")]
    Pending {
        /// Package being installed.
        package: PackageName,
        /// Rule platform.
        platform: Platform,
        /// The placeholder token.
        placeholder: String,
    },
}

/// Filesystem failures while placing files or recording the install.
#[derive(Error, Debug)]
pub enum InstallError {
    /// An I/O operation on `path` failed.
    #[error("{action} {}: {source}", .path.display())]
    Io {
        /// What was being attempted (e.g. "create directory").
        action: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The install mapping names a file the payload does not contain.
    #[error("'{}' is not present in the downloaded payload", .source_path.display())]
    MissingArtifact {
        /// Mapped source path, relative to the payload root.
        source_path: PathBuf,
    },

    /// A receipt could not be read or written.
    #[error("Corrupt receipt {}: {source}", .path.display())]
    Receipt {
        /// Receipt file.
        path: PathBuf,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl InstallError {
    /// Wrap an I/O error with the action and path it concerns.
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Reasons a smoke test fails.
#[derive(Error, Debug)]
pub enum TestFailure {
    /// The command ran but its output lacks the expected substring.
    #[error("output of `{command}` does not contain '{expected}': {output}")]
    OutputMismatch {
        /// Command that was run.
        command: String,
        /// Expected substring.
        expected: String,
        /// Captured stdout and stderr.
        output: String,
    },

    /// The command exited unsuccessfully.
    #[error("`{command}` exited with {status}: {output}")]
    ExitStatus {
        /// Command that was run.
        command: String,
        /// Exit status.
        status: ExitStatus,
        /// Captured stdout and stderr.
        output: String,
    },

    /// The command did not finish in time.
    #[error("`{command}` did not finish within {secs}s")]
    Timeout {
        /// Command that was run.
        command: String,
        /// Timeout that elapsed.
        secs: u64,
    },

    /// The shell could not be started.
    #[error("could not run `{command}`: {source}")]
    Spawn {
        /// Command that was run.
        command: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}
