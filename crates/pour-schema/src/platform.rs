//! Host platform description used to select a formula's platform rule.
//!
//! A [`Platform`] is an exact (OS, architecture) pair. Formula rules may use
//! [`Arch::Universal`] to cover every architecture of one OS.
//!
//! # Example
//!
//! ```
//! use pour_schema::{Arch, Os, Platform};
//!
//! let p: Platform = "macos/arm64".parse().unwrap();
//! assert_eq!(p, Platform::new(Os::Macos, Arch::Arm64));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SchemaError;

/// Operating system family.
///
/// Names pour has no variant for are kept as [`Os::Other`] so that an
/// unfamiliar host still resolves (and fails with a clear "no rule" error).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Os {
    /// Apple macOS (`darwin`).
    Macos,
    /// Linux, any distribution.
    Linux,
    /// Microsoft Windows.
    Windows,
    /// Any other OS, by lowercase name (e.g. `freebsd`).
    Other(String),
}

impl Os {
    /// OS of the running process.
    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "macos" | "darwin" | "osx" => Self::Macos,
            "linux" => Self::Linux,
            "windows" | "win32" => Self::Windows,
            other => Self::Other(other.to_string()),
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_platform_word(s) {
            return Err(SchemaError::UnknownOs(s.to_string()));
        }
        Ok(Self::from_name(s))
    }
}

impl TryFrom<String> for Os {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Os> for String {
    fn from(os: Os) -> Self {
        os.as_str().to_string()
    }
}

/// CPU architecture.
///
/// `Universal` only appears in formula rules (e.g. macOS fat binaries); a
/// host always reports a concrete architecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Arch {
    /// 64-bit ARM (Apple Silicon, Graviton).
    Arm64,
    /// `x86_64` (Intel/AMD).
    X86_64,
    /// Matches every architecture of the rule's OS.
    Universal,
    /// Any other architecture, by lowercase name (e.g. `riscv64`).
    Other(String),
}

impl Arch {
    /// Architecture of the running process.
    pub fn current() -> Self {
        Self::from_name(std::env::consts::ARCH)
    }

    fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "arm64" | "aarch64" => Self::Arm64,
            "x86_64" | "amd64" | "x64" | "intel" => Self::X86_64,
            "universal" => Self::Universal,
            other => Self::Other(other.to_string()),
        }
    }

    /// Platform-style name (`arm64`, `x86_64`, `universal`, ...).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
            Self::Universal => "universal",
            Self::Other(name) => name,
        }
    }

    /// Whether a rule declared for `self` covers a host running `host`.
    pub fn covers(&self, host: &Arch) -> bool {
        *self == Self::Universal || self == host
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_platform_word(s) {
            return Err(SchemaError::UnknownArch(s.to_string()));
        }
        Ok(Self::from_name(s))
    }
}

impl TryFrom<String> for Arch {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Arch> for String {
    fn from(arch: Arch) -> Self {
        arch.as_str().to_string()
    }
}

/// Non-empty and made of ASCII letters, digits, `_` or `-`.
fn is_platform_word(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// An (OS, architecture) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Build a platform from its parts.
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// The platform pour is running on.
    pub fn current() -> Self {
        Self::new(Os::current(), Arch::current())
    }

    /// Whether a rule declared for `self` applies to `host`.
    pub fn covers(&self, host: &Platform) -> bool {
        self.os == host.os && self.arch.covers(&host.arch)
    }

    /// Whether some host could be matched by both `self` and `other`.
    pub fn overlaps(&self, other: &Platform) -> bool {
        self.os == other.os
            && (self.arch == other.arch
                || self.arch == Arch::Universal
                || other.arch == Arch::Universal)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

impl FromStr for Platform {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (os, arch) = s
            .split_once('/')
            .ok_or_else(|| SchemaError::InvalidPlatform(s.to_string()))?;
        Ok(Self::new(os.trim().parse()?, arch.trim().parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("darwin".parse::<Os>().unwrap(), Os::Macos);
        assert_eq!("AARCH64".parse::<Arch>().unwrap(), Arch::Arm64);
        assert_eq!("amd64".parse::<Arch>().unwrap(), Arch::X86_64);
        assert_eq!("sparc".parse::<Arch>().unwrap(), Arch::Other("sparc".to_string()));
        assert!("".parse::<Os>().is_err());
        assert!("mac os".parse::<Os>().is_err());
    }

    #[test]
    fn unfamiliar_host_is_representable() {
        let p: Platform = "FreeBSD/riscv64".parse().unwrap();
        assert_eq!(p.os, Os::Other("freebsd".to_string()));
        assert_eq!(p.to_string(), "freebsd/riscv64");
        assert!(!Platform::new(Os::Macos, Arch::Arm64).covers(&p));
        assert!(!Platform::new(Os::Linux, Arch::Universal).covers(&p));
    }

    #[test]
    fn host_detection_never_fails() {
        let host = Platform::current();
        assert_eq!(host.os.as_str(), Os::current().as_str());
        assert_ne!(host.arch, Arch::Universal);
    }

    #[test]
    fn platform_round_trips_through_display() {
        let p = Platform::new(Os::Linux, Arch::X86_64);
        assert_eq!(p.to_string(), "linux/x86_64");
        assert_eq!(p.to_string().parse::<Platform>().unwrap(), p);
    }

    #[test]
    fn platform_without_separator_is_rejected() {
        assert_eq!(
            "macos-arm64".parse::<Platform>(),
            Err(SchemaError::InvalidPlatform("macos-arm64".to_string()))
        );
    }

    #[test]
    fn universal_covers_every_arch_on_its_os() {
        let rule = Platform::new(Os::Macos, Arch::Universal);
        assert!(rule.covers(&Platform::new(Os::Macos, Arch::Arm64)));
        assert!(rule.covers(&Platform::new(Os::Macos, Arch::X86_64)));
        assert!(!rule.covers(&Platform::new(Os::Linux, Arch::Arm64)));
    }

    #[test]
    fn exact_rule_only_covers_itself() {
        let rule = Platform::new(Os::Macos, Arch::Arm64);
        assert!(rule.covers(&rule));
        assert!(!rule.covers(&Platform::new(Os::Macos, Arch::X86_64)));
    }

    #[test]
    fn overlap_detection() {
        let arm = Platform::new(Os::Macos, Arch::Arm64);
        let intel = Platform::new(Os::Macos, Arch::X86_64);
        let fat = Platform::new(Os::Macos, Arch::Universal);
        assert!(arm.overlaps(&arm));
        assert!(!arm.overlaps(&intel));
        assert!(fat.overlaps(&intel));
        assert!(!fat.overlaps(&Platform::new(Os::Linux, Arch::Arm64)));
    }
}
