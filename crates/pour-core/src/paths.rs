//! Install prefix layout and path helpers.

use std::path::{Path, PathBuf};

use dirs::home_dir;
use pour_schema::PackageName;

/// Returns the default install prefix (`$POUR_PREFIX`, else `~/.pour`), or
/// None if the user's home cannot be resolved.
pub fn try_pour_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("POUR_PREFIX") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".pour"))
}

/// Extract the filename from a URL.
///
/// ```
/// use pour_core::paths::filename_from_url;
///
/// assert_eq!(filename_from_url("https://example.com/v1/condash-macos-aarch64"), "condash-macos-aarch64");
/// assert_eq!(filename_from_url("https://example.com/a.tar.gz?raw=1"), "a.tar.gz");
/// ```
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or("");
    path.split('/').next_back().unwrap_or("")
}

/// Directory layout of an install prefix.
///
/// ```text
/// <prefix>/
/// ├── bin/        # Installed executables
/// ├── receipts/   # One JSON receipt per installed formula
/// ├── cache/      # Verified downloads, keyed by digest
/// └── tmp/        # Staging (same volume as the prefix)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    prefix: PathBuf,
    cache: PathBuf,
}

impl Layout {
    /// Layout rooted at `prefix` with the cache inside it.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        let cache = prefix.join("cache");
        Self { prefix, cache }
    }

    /// Use a cache directory outside the prefix.
    pub fn with_cache(mut self, cache: impl Into<PathBuf>) -> Self {
        self.cache = cache.into();
        self
    }

    /// Install prefix root.
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Binary installation target: `<prefix>/bin`
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    /// Receipts directory: `<prefix>/receipts`
    pub fn receipts_dir(&self) -> PathBuf {
        self.prefix.join("receipts")
    }

    /// Receipt of one package.
    pub fn receipt_path(&self, name: &PackageName) -> PathBuf {
        self.receipts_dir().join(format!("{name}.json"))
    }

    /// Download cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache
    }

    /// Staging area for unpacked payloads.
    pub fn tmp_dir(&self) -> PathBuf {
        self.prefix.join("tmp")
    }

    /// Absolute path of a prefix-relative install destination.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.prefix.join(relative)
    }
}
