//! TOML formula parsing
//!
//! A formula is the declarative recipe for one package: which prebuilt
//! artifact to download for which platform, where to put it, and how to
//! check that it runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::ops::flow::ResolvedFormula;
use crate::paths::filename_from_url;
pub use pour_schema::{Arch, Checksum, Os, PackageName, Platform, Sha256Digest, Version};

/// Errors that can occur when loading or validating a formula.
#[derive(Error, Debug)]
pub enum FormulaError {
    /// The formula file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be deserialized into a formula.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The formula parsed but breaks one of its invariants.
    #[error("{0}")]
    Invalid(String),

    /// More than one rule applies to the same host.
    #[error("Platform rules {first} and {second} both match {host}")]
    Ambiguous {
        /// Host being resolved.
        host: Platform,
        /// First matching rule.
        first: Platform,
        /// Second matching rule.
        second: Platform,
    },
}

/// Metadata describing a package's identity and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Unique name that identifies this package.
    pub name: PackageName,
    /// Semantic version string for the package release.
    pub version: Version,
    /// Short human-readable summary of the package.
    #[serde(default)]
    pub description: String,
    /// URL of the project's homepage.
    #[serde(default)]
    pub homepage: String,
    /// SPDX license identifier for the package.
    #[serde(default)]
    pub license: String,
}

/// Archive or binary format of a downloadable artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Standalone executable with no archive wrapper.
    Binary,
    /// Gzip-compressed tar archive (`.tar.gz` / `.tgz`).
    #[serde(rename = "tar.gz")]
    TarGz,
    /// Zip archive (`.zip`).
    Zip,
}

impl ArtifactFormat {
    /// Guess the format from a URL or file name.
    pub fn detect(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Self::TarGz
        } else if lower.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Binary
        }
    }
}

/// One platform branch of a formula: the artifact to fetch on a given
/// (OS, architecture).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformRule {
    /// Operating system this rule applies to.
    pub os: Os,
    /// Architecture this rule applies to (`universal` covers all).
    pub arch: Arch,
    /// Download URL; `{version}` is replaced by the package version.
    pub url: String,
    /// Expected SHA-256 digest of the downloaded artifact.
    pub sha256: Checksum,
    /// Payload format (inferred from the URL if missing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ArtifactFormat>,
}

impl PlatformRule {
    /// The platform predicate of this rule.
    pub fn platform(&self) -> Platform {
        Platform::new(self.os.clone(), self.arch.clone())
    }

    /// Concrete download URL for `version`.
    pub fn url_for(&self, version: &Version) -> String {
        self.url.replace("{version}", version.as_str())
    }

    /// Returns the effective payload format, detecting it from the URL
    /// when the formula does not say.
    pub fn effective_format(&self) -> ArtifactFormat {
        self.format
            .unwrap_or_else(|| ArtifactFormat::detect(filename_from_url(&self.url)))
    }
}

/// Where payload files land inside the install prefix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallSpec {
    /// Payload path -> name under `<prefix>/bin`. Installed executable.
    #[serde(default)]
    pub bin: BTreeMap<String, String>,
    /// Payload path -> path relative to the prefix.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

/// One resolved entry of the install mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallEntry {
    /// Path inside the unpacked payload.
    pub source: PathBuf,
    /// Destination relative to the install prefix.
    pub dest: PathBuf,
    /// Whether the file gets mode 0755.
    pub executable: bool,
}

impl InstallSpec {
    /// Flatten `bin` and `files` into prefix-relative entries.
    pub fn entries(&self) -> Vec<InstallEntry> {
        let bins = self.bin.iter().map(|(src, dest)| InstallEntry {
            source: PathBuf::from(src),
            dest: Path::new("bin").join(dest),
            executable: true,
        });
        let files = self.files.iter().map(|(src, dest)| InstallEntry {
            source: PathBuf::from(src),
            dest: PathBuf::from(dest),
            executable: false,
        });
        bins.chain(files).collect()
    }

    /// `true` when nothing would be installed.
    pub fn is_empty(&self) -> bool {
        self.bin.is_empty() && self.files.is_empty()
    }
}

/// Post-install smoke test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Shell command; `{bin}` and `{prefix}` are substituted.
    pub command: String,
    /// Substring that must appear in the command's output.
    pub expect: String,
}

/// Complete formula definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    /// Core metadata for the package.
    pub package: PackageInfo,
    /// Ordered platform rules.
    #[serde(rename = "platform", default)]
    pub platforms: Vec<PlatformRule>,
    /// Install mapping.
    #[serde(default)]
    pub install: InstallSpec,
    /// Optional smoke test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<TestSpec>,
}

impl Formula {
    /// Parse and validate a formula from a TOML file on disk.
    ///
    /// # Errors
    ///
    /// Returns `FormulaError::Io` if the file cannot be read, otherwise the
    /// errors of [`Formula::parse`].
    pub fn from_file(path: &Path) -> Result<Self, FormulaError> {
        let content = fs::read_to_string(path).map_err(|source| FormulaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate a formula from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `FormulaError::Parse` if the TOML is malformed and
    /// `FormulaError::Invalid` if [`Formula::validate`] rejects it.
    pub fn parse(content: &str) -> Result<Self, FormulaError> {
        let formula: Self = toml::from_str(content)?;
        formula.validate()?;
        Ok(formula)
    }

    /// Serialize this formula to a pretty-printed TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `toml::ser::Error` if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check the structural invariants of the formula.
    ///
    /// # Errors
    ///
    /// Returns `FormulaError::Invalid` describing the first violation.
    pub fn validate(&self) -> Result<(), FormulaError> {
        let invalid = |msg: String| Err(FormulaError::Invalid(msg));
        let name = &self.package.name;

        if !name.is_valid() {
            return invalid(format!("Invalid package name '{name}'"));
        }
        self.package
            .version
            .semver()
            .map_err(|e| FormulaError::Invalid(e.to_string()))?;

        if self.platforms.is_empty() {
            return invalid(format!("{name}: no [[platform]] rules declared"));
        }
        for (i, rule) in self.platforms.iter().enumerate() {
            let url = rule.url.as_str();
            if !(url.starts_with("https://")
                || url.starts_with("http://")
                || url.starts_with("file://"))
            {
                return invalid(format!(
                    "{name}: rule {} has unsupported URL '{url}'",
                    rule.platform()
                ));
            }
            if filename_from_url(url).is_empty() {
                return invalid(format!("{name}: URL '{url}' does not name a file"));
            }
            for other in &self.platforms[..i] {
                if other.platform().overlaps(&rule.platform()) {
                    return invalid(format!(
                        "{name}: platform rules {} and {} overlap",
                        other.platform(),
                        rule.platform()
                    ));
                }
            }
        }

        if self.install.is_empty() {
            return invalid(format!("{name}: [install] maps no files"));
        }
        for entry in self.install.entries() {
            if !is_contained(&entry.source) {
                return invalid(format!(
                    "{name}: install source '{}' must be a relative path inside the payload",
                    entry.source.display()
                ));
            }
            if !is_contained(&entry.dest) {
                return invalid(format!(
                    "{name}: install destination '{}' escapes the prefix",
                    entry.dest.display()
                ));
            }
        }

        if let Some(test) = &self.test {
            if test.command.trim().is_empty() {
                return invalid(format!("{name}: [test] command is empty"));
            }
            if test.expect.is_empty() {
                return invalid(format!("{name}: [test] expect is empty"));
            }
        }

        Ok(())
    }

    /// Non-fatal findings for formula authors.
    pub fn lint(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for rule in &self.platforms {
            if matches!(rule.os, Os::Other(_)) || matches!(rule.arch, Arch::Other(_)) {
                warnings.push(format!(
                    "{}: unrecognised OS or architecture name",
                    rule.platform()
                ));
            }
            if let Checksum::Pending(token) = &rule.sha256 {
                warnings.push(format!(
                    "{}: checksum is the placeholder '{token}'; installs will be refused",
                    rule.platform()
                ));
            }
            if rule.effective_format() == ArtifactFormat::Binary {
                let file = filename_from_url(&rule.url_for(&self.package.version)).to_string();
                let mapped = self
                    .install
                    .entries()
                    .iter()
                    .any(|e| e.source == Path::new(&file));
                if !mapped {
                    warnings.push(format!(
                        "{}: downloaded file '{file}' is not referenced by [install]",
                        rule.platform()
                    ));
                }
            }
        }
        if self.test.is_none() {
            warnings.push("no [test] section; installs cannot be smoke-tested".to_string());
        }
        warnings
    }

    /// Platforms this formula declares rules for, in declaration order.
    pub fn supported_platforms(&self) -> Vec<Platform> {
        self.platforms.iter().map(PlatformRule::platform).collect()
    }

    /// Select the single platform rule that applies to `host`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoMatchingPlatform`] when no rule covers `host`, or
    /// `FormulaError::Ambiguous` if more than one does (impossible for a
    /// validated formula).
    pub fn resolve(&self, host: Platform) -> Result<ResolvedFormula<'_>, Error> {
        let matches: Vec<&PlatformRule> = self
            .platforms
            .iter()
            .filter(|r| r.platform().covers(&host))
            .collect();

        let rule = match matches.as_slice() {
            [] => {
                return Err(Error::NoMatchingPlatform {
                    package: self.package.name.clone(),
                    host,
                    declared: self.supported_platforms(),
                });
            }
            [rule] => *rule,
            [first, second, ..] => {
                return Err(FormulaError::Ambiguous {
                    host,
                    first: first.platform(),
                    second: second.platform(),
                }
                .into());
            }
        };

        tracing::debug!(package = %self.package.name, %host, rule = %rule.platform(), "resolved platform rule");
        Ok(ResolvedFormula::new(self, rule, host))
    }
}

impl std::str::FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Relative, non-empty and without `..` or root components.
fn is_contained(path: &Path) -> bool {
    path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const CONDASH: &str = r#"
[package]
name = "condash"
description = "Single-command ephemeral monitoring for Docker containers"
homepage = "https://github.com/yourusername/condash"
version = "0.1.0"
license = "Apache-2.0"

[[platform]]
os = "macos"
arch = "arm64"
url = "https://github.com/yourusername/condash/releases/download/v{version}/condash-macos-aarch64"
sha256 = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"

[install]
bin = { "condash-macos-aarch64" = "condash" }

[test]
command = "{bin}/condash --version"
expect = "condash"
"#;

    fn macos_arm() -> Platform {
        Platform::new(Os::Macos, Arch::Arm64)
    }

    #[test]
    fn test_parse_condash() {
        let f = Formula::parse(CONDASH).unwrap();
        assert_eq!(f.package.name, "condash");
        assert_eq!(f.package.version, "0.1.0");
        assert_eq!(f.package.license, "Apache-2.0");
        assert_eq!(f.platforms.len(), 1);
        assert_eq!(f.platforms[0].effective_format(), ArtifactFormat::Binary);
        assert_eq!(
            f.install.entries(),
            vec![InstallEntry {
                source: PathBuf::from("condash-macos-aarch64"),
                dest: PathBuf::from("bin/condash"),
                executable: true,
            }]
        );
        assert!(f.lint().is_empty());
    }

    #[test]
    fn test_resolve_macos_arm64() {
        let f = Formula::parse(CONDASH).unwrap();
        let resolved = f.resolve(macos_arm()).unwrap();
        assert_eq!(
            resolved.url(),
            "https://github.com/yourusername/condash/releases/download/v0.1.0/condash-macos-aarch64"
        );
        assert_eq!(resolved.file_name(), "condash-macos-aarch64");
        assert!(resolved.checksum().digest().is_some());
    }

    #[test]
    fn test_resolve_unsupported_hosts() {
        let f = Formula::parse(CONDASH).unwrap();
        for host in [
            Platform::new(Os::Macos, Arch::X86_64),
            Platform::new(Os::Linux, Arch::Arm64),
            Platform::new(Os::Linux, Arch::X86_64),
            Platform::new(Os::Windows, Arch::X86_64),
            Platform::new(Os::Other("freebsd".to_string()), Arch::X86_64),
            Platform::new(Os::Linux, Arch::Other("riscv64".to_string())),
        ] {
            match f.resolve(host.clone()) {
                Err(Error::NoMatchingPlatform { host: h, declared, .. }) => {
                    assert_eq!(h, host);
                    assert_eq!(declared, vec![macos_arm()]);
                }
                other => panic!("expected NoMatchingPlatform for {host}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_overlapping_rules_rejected() {
        let doubled = CONDASH.replace(
            "[install]",
            r#"[[platform]]
os = "macos"
arch = "universal"
url = "https://example.com/condash-universal"
sha256 = "PUT_SHA256_HASH_HERE"

[install]"#,
        );
        let err = Formula::parse(&doubled).unwrap_err();
        assert!(err.to_string().contains("overlap"), "{err}");
    }

    #[test]
    fn test_multiple_disjoint_rules_resolve_exactly_one() {
        let two = CONDASH.replace(
            "[install]",
            r#"[[platform]]
os = "linux"
arch = "x86_64"
url = "https://example.com/condash-linux.tar.gz"
sha256 = "PUT_SHA256_HASH_HERE"

[install]"#,
        );
        let f = Formula::parse(&two).unwrap();
        let linux = f.resolve(Platform::new(Os::Linux, Arch::X86_64)).unwrap();
        assert_eq!(linux.format(), ArtifactFormat::TarGz);
        assert!(linux.checksum().is_pending());
        assert!(f.resolve(macos_arm()).is_ok());
        assert!(f.resolve(Platform::new(Os::Linux, Arch::Arm64)).is_err());
    }

    #[test]
    fn test_placeholder_checksum_parses_with_warning() {
        let pending = CONDASH.replace(
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
            "PUT_SHA256_HASH_HERE",
        );
        let f = Formula::parse(&pending).unwrap();
        let warnings = f.lint();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("placeholder"));
    }

    #[test]
    fn test_escaping_destination_rejected() {
        let bad = CONDASH.replace("= \"condash\" }", "= \"../../etc/condash\" }");
        assert!(matches!(Formula::parse(&bad), Err(FormulaError::Invalid(_))));
    }

    #[test]
    fn test_missing_rules_rejected() {
        let none = r#"
[package]
name = "condash"
version = "0.1.0"

[install]
bin = { "condash" = "condash" }
"#;
        let err = Formula::parse(none).unwrap_err();
        assert!(err.to_string().contains("no [[platform]] rules"));
    }

    #[test]
    fn test_bad_version_rejected() {
        let bad = CONDASH.replace("version = \"0.1.0\"", "version = \"latest\"");
        assert!(Formula::parse(&bad).is_err());
    }

    #[test]
    fn test_parse_malformed_toml() {
        assert!(matches!(
            Formula::parse("this is not valid toml {{{"),
            Err(FormulaError::Parse(_))
        ));
    }

    #[test]
    fn test_unmapped_binary_is_linted() {
        let f = Formula::parse(&CONDASH.replace(
            "bin = { \"condash-macos-aarch64\" = \"condash\" }",
            "bin = { \"condash\" = \"condash\" }",
        ))
        .unwrap();
        assert!(f.lint().iter().any(|w| w.contains("not referenced")));
    }

    #[test]
    fn test_toml_round_trip_keeps_rules() {
        let f = Formula::parse(CONDASH).unwrap();
        let again = Formula::parse(&f.to_toml().unwrap()).unwrap();
        assert_eq!(again.supported_platforms(), f.supported_platforms());
        assert_eq!(again.install.entries(), f.install.entries());
    }
}
