//! Shared value types for pour formulas.
//!
//! Everything in here is plain data: platforms, digests, names and versions.
//! Side effects (network, filesystem) live in `pour-core`.

pub mod hash;
pub mod platform;
pub mod types;

// Re-exports
pub use hash::*;
pub use platform::*;
pub use types::*;

/// Errors produced when parsing schema values from strings.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The operating system name is not one pour knows about.
    #[error("Unknown operating system: {0}")]
    UnknownOs(String),

    /// The architecture name is not one pour knows about.
    #[error("Unknown architecture: {0}")]
    UnknownArch(String),

    /// A platform string was not of the form `os/arch`.
    #[error("Invalid platform '{0}': expected <os>/<arch>, e.g. macos/arm64")]
    InvalidPlatform(String),

    /// A digest string was not 64 hex characters.
    #[error("Invalid SHA256 digest: {0}")]
    InvalidDigest(String),

    /// A checksum was neither a digest nor a pending placeholder.
    #[error("Invalid checksum '{0}': expected 64 hex characters or an upper-case placeholder")]
    InvalidChecksum(String),

    /// A version string is not valid semver.
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion {
        /// The offending version string.
        version: String,
        /// Parser message.
        reason: String,
    },
}
