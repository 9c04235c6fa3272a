//! Install receipts.
//!
//! A receipt records what one install put into the prefix. It is written
//! once every file is in place; `tested` flips to true when the smoke test
//! passes against those files.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use pour_schema::{PackageName, Platform, Sha256Digest, Version};
use serde::{Deserialize, Serialize};

use crate::error::InstallError;
use crate::io::download::hash_file;
use crate::paths::Layout;

/// One file placed by an install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledFile {
    /// Path relative to the prefix.
    pub path: PathBuf,
    /// Digest at install time.
    pub sha256: Sha256Digest,
}

/// Record of a completed install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Installed package.
    pub name: PackageName,
    /// Installed version.
    pub version: Version,
    /// Platform rule that was used.
    pub platform: Platform,
    /// Artifact source.
    pub url: String,
    /// Digest of the downloaded artifact.
    pub sha256: Sha256Digest,
    /// Placed files.
    pub files: Vec<InstalledFile>,
    /// When the install finished.
    pub installed_at: DateTime<Utc>,
    /// The formula's smoke test passed against these files.
    #[serde(default)]
    pub tested: bool,
}

impl Receipt {
    /// Load the receipt for `name`, if the package is installed.
    ///
    /// # Errors
    ///
    /// Fails if the receipt exists but cannot be read or parsed.
    pub fn load(layout: &Layout, name: &PackageName) -> Result<Option<Self>, InstallError> {
        let path = layout.receipt_path(name);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(InstallError::io("read", path, e)),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|source| InstallError::Receipt { path, source })
    }

    /// Write the receipt (atomically) into the receipts directory.
    ///
    /// # Errors
    ///
    /// Fails on any filesystem error.
    pub fn save(&self, layout: &Layout) -> Result<(), InstallError> {
        let dir = layout.receipts_dir();
        std::fs::create_dir_all(&dir).map_err(|e| InstallError::io("create directory", &dir, e))?;

        let path = layout.receipt_path(&self.name);
        let json = serde_json::to_vec_pretty(self).map_err(|source| InstallError::Receipt {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| InstallError::io("write", &tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| InstallError::io("move into place", &path, e))
    }

    /// Delete the receipt.
    ///
    /// # Errors
    ///
    /// Fails if the receipt exists but cannot be removed.
    pub fn remove(layout: &Layout, name: &PackageName) -> Result<(), InstallError> {
        let path = layout.receipt_path(name);
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(InstallError::io("remove", path, e))
            }
            _ => Ok(()),
        }
    }

    /// All receipts in the prefix, sorted by name. Unreadable receipts are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Fails if the receipts directory exists but cannot be listed.
    pub fn list(layout: &Layout) -> Result<Vec<Self>, InstallError> {
        let dir = layout.receipts_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(InstallError::io("list", dir, e)),
        };

        let mut receipts = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let parsed = std::fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|data| serde_json::from_slice::<Self>(&data).map_err(|e| e.to_string()));
            match parsed {
                Ok(receipt) => receipts.push(receipt),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable receipt"),
            }
        }
        receipts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(receipts)
    }

    /// Files recorded here that `next` no longer installs.
    pub fn stale_files<'a>(&'a self, next: &'a Receipt) -> impl Iterator<Item = &'a InstalledFile> {
        self.files
            .iter()
            .filter(move |old| next.files.iter().all(|f| f.path != old.path))
    }

    /// `true` if every recorded file is still present with its recorded
    /// digest.
    pub fn is_intact(&self, layout: &Layout) -> bool {
        self.files.iter().all(|f| {
            hash_file(&layout.resolve(&f.path)).is_ok_and(|actual| actual == f.sha256)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pour_schema::{Arch, Os};
    use tempfile::TempDir;

    fn sample(layout: &Layout) -> Receipt {
        let bin = layout.bin_dir().join("condash");
        std::fs::create_dir_all(layout.bin_dir()).unwrap();
        std::fs::write(&bin, b"exe").unwrap();
        Receipt {
            name: PackageName::from("condash"),
            version: Version::from("0.1.0"),
            platform: Platform::new(Os::Macos, Arch::Arm64),
            url: "https://example.com/condash-macos-aarch64".to_string(),
            sha256: Sha256Digest::of_bytes(b"exe"),
            files: vec![InstalledFile {
                path: PathBuf::from("bin/condash"),
                sha256: Sha256Digest::of_bytes(b"exe"),
            }],
            installed_at: Utc::now(),
            tested: true,
        }
    }

    #[test]
    fn save_load_remove() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        let receipt = sample(&layout);

        assert!(Receipt::load(&layout, &receipt.name).unwrap().is_none());
        receipt.save(&layout).unwrap();

        let loaded = Receipt::load(&layout, &receipt.name).unwrap().unwrap();
        assert_eq!(loaded.version, "0.1.0");
        assert_eq!(loaded.files, receipt.files);
        assert_eq!(Receipt::list(&layout).unwrap().len(), 1);

        Receipt::remove(&layout, &receipt.name).unwrap();
        assert!(Receipt::load(&layout, &receipt.name).unwrap().is_none());
        // removing twice is fine
        Receipt::remove(&layout, &receipt.name).unwrap();
    }

    #[test]
    fn intact_detects_tampering() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        let receipt = sample(&layout);
        assert!(receipt.is_intact(&layout));

        std::fs::write(layout.bin_dir().join("condash"), b"patched").unwrap();
        assert!(!receipt.is_intact(&layout));

        std::fs::remove_file(layout.bin_dir().join("condash")).unwrap();
        assert!(!receipt.is_intact(&layout));
    }

    #[test]
    fn stale_files_are_those_missing_from_the_next_install() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        let old = sample(&layout);

        let mut next = old.clone();
        assert_eq!(old.stale_files(&next).count(), 0);

        next.files[0].path = PathBuf::from("bin/cdash");
        let stale: Vec<_> = old.stale_files(&next).map(|f| f.path.clone()).collect();
        assert_eq!(stale, vec![PathBuf::from("bin/condash")]);
    }

    #[test]
    fn receipts_without_tested_flag_load_as_untested() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        let receipt = sample(&layout);
        let mut json: serde_json::Value = serde_json::to_value(&receipt).unwrap();
        json.as_object_mut().unwrap().remove("tested");
        std::fs::create_dir_all(layout.receipts_dir()).unwrap();
        std::fs::write(layout.receipt_path(&receipt.name), json.to_string()).unwrap();

        let loaded = Receipt::load(&layout, &receipt.name).unwrap().unwrap();
        assert!(!loaded.tested);
    }

    #[test]
    fn corrupt_receipt_is_an_error_on_load_but_skipped_in_list() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        std::fs::create_dir_all(layout.receipts_dir()).unwrap();
        std::fs::write(layout.receipt_path(&PackageName::from("broken")), b"{").unwrap();

        assert!(matches!(
            Receipt::load(&layout, &PackageName::from("broken")),
            Err(InstallError::Receipt { .. })
        ));
        assert!(Receipt::list(&layout).unwrap().is_empty());
    }
}
