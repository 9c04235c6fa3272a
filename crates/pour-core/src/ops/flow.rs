//! Installation Flow Typestate Pattern
//!
//! Models the install pipeline as a series of explicit state transitions:
//!
//! ```text
//! Formula --[resolve()]--> ResolvedFormula --[fetch()]--> FetchedFormula --[place()]--> PlacedFormula --[smoke_test()]
//! ```
//!
//! Each state owns the proof that the previous step succeeded, so nothing can
//! be placed before its digest has been verified.

use std::time::Duration;

use chrono::Utc;
use pour_schema::{Checksum, Platform, Sha256Digest};
use reqwest::Client;

use crate::Reporter;
use crate::error::{Error, InstallError, IntegrityError};
use crate::formula::{ArtifactFormat, Formula, PlatformRule};
use crate::io::download::{DownloadRequest, Fetched};
use crate::io::{extract, place};
use crate::ops::smoke::{self, TestOutcome};
use crate::paths::{Layout, filename_from_url};
use crate::receipt::{InstalledFile, Receipt};

/// State 1: the platform rule for the host has been selected.
#[derive(Debug, Clone)]
pub struct ResolvedFormula<'f> {
    /// The formula being installed.
    pub formula: &'f Formula,
    /// The single rule covering the host.
    pub rule: &'f PlatformRule,
    /// Host the rule was resolved for.
    pub host: Platform,
    url: String,
}

/// State 2: the artifact is in the cache and its digest verified.
#[derive(Debug)]
pub struct FetchedFormula<'f> {
    /// Resolution this fetch belongs to.
    pub resolved: ResolvedFormula<'f>,
    /// Verified artifact.
    pub artifact: Fetched,
}

/// State 3: every mapped file is in the prefix.
#[derive(Debug)]
pub struct PlacedFormula<'f> {
    /// Resolution this install belongs to.
    pub resolved: ResolvedFormula<'f>,
    /// Verified artifact.
    pub artifact: Fetched,
    /// Files that were placed.
    pub files: Vec<InstalledFile>,
}

impl<'f> ResolvedFormula<'f> {
    pub(crate) fn new(formula: &'f Formula, rule: &'f PlatformRule, host: Platform) -> Self {
        let url = rule.url_for(&formula.package.version);
        Self {
            formula,
            rule,
            host,
            url,
        }
    }

    /// Concrete download URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Name of the downloaded file (last URL segment).
    pub fn file_name(&self) -> &str {
        filename_from_url(&self.url)
    }

    /// Declared checksum of the artifact.
    pub fn checksum(&self) -> &Checksum {
        &self.rule.sha256
    }

    /// Payload format.
    pub fn format(&self) -> ArtifactFormat {
        self.rule.effective_format()
    }

    /// The digest to verify against.
    ///
    /// # Errors
    ///
    /// [`IntegrityError::Pending`] when the rule still carries a placeholder.
    pub fn expected_digest(&self) -> Result<&Sha256Digest, IntegrityError> {
        match &self.rule.sha256 {
            Checksum::Sha256(digest) => Ok(digest),
            Checksum::Pending(token) => Err(IntegrityError::Pending {
                package: self.formula.package.name.clone(),
                platform: self.rule.platform(),
                placeholder: token.clone(),
            }),
        }
    }

    /// Download (or reuse from cache) and verify the artifact.
    ///
    /// # Errors
    ///
    /// [`Error::Integrity`] if the checksum is a placeholder or does not
    /// match, [`Error::Download`] on transport failure.
    pub async fn fetch<R: Reporter + ?Sized>(
        self,
        client: &Client,
        layout: &Layout,
        reporter: &R,
    ) -> Result<FetchedFormula<'f>, Error> {
        let expected = self.expected_digest()?.clone();
        let package = &self.formula.package;

        let artifact = DownloadRequest {
            client,
            name: &package.name,
            version: &package.version,
            url: &self.url,
            file_name: self.file_name(),
            expected: &expected,
            cache_dir: layout.cache_dir(),
            reporter,
        }
        .execute()
        .await?;

        Ok(FetchedFormula {
            resolved: self,
            artifact,
        })
    }
}

impl<'f> FetchedFormula<'f> {
    /// Unpack the payload into a staging directory and place every mapped
    /// file into the prefix.
    ///
    /// # Errors
    ///
    /// [`Error::Install`] if the payload cannot be unpacked, a mapped source
    /// is missing, or a file cannot be written. Mapped sources are checked
    /// before anything is written to the prefix.
    pub fn place(self, layout: &Layout) -> Result<PlacedFormula<'f>, Error> {
        let tmp_root = layout.tmp_dir();
        std::fs::create_dir_all(&tmp_root)
            .map_err(|e| InstallError::io("create directory", &tmp_root, e))?;
        let staging = tempfile::Builder::new()
            .prefix("stage-")
            .tempdir_in(&tmp_root)
            .map_err(|e| InstallError::io("create staging directory in", &tmp_root, e))?;

        extract::unpack(
            &self.artifact.path,
            &self.artifact.file_name,
            self.resolved.format(),
            staging.path(),
        )
        .map_err(|e| InstallError::io("unpack", &self.artifact.path, e))?;

        let entries = self.resolved.formula.install.entries();
        if let Some(missing) = entries.iter().find(|e| !staging.path().join(&e.source).is_file()) {
            return Err(InstallError::MissingArtifact {
                source_path: missing.source.clone(),
            }
            .into());
        }

        let mut files = Vec::with_capacity(entries.len());
        for entry in &entries {
            let dest = layout.resolve(&entry.dest);
            let sha256 = place::place_file(&staging.path().join(&entry.source), &dest, entry.executable)?;
            tracing::debug!(dest = %dest.display(), "placed");
            files.push(InstalledFile {
                path: entry.dest.clone(),
                sha256,
            });
        }

        Ok(PlacedFormula {
            resolved: self.resolved,
            artifact: self.artifact,
            files,
        })
    }
}

impl PlacedFormula<'_> {
    /// The receipt describing this install.
    pub fn receipt(&self) -> Receipt {
        let package = &self.resolved.formula.package;
        Receipt {
            name: package.name.clone(),
            version: package.version.clone(),
            platform: self.resolved.rule.platform(),
            url: self.resolved.url().to_string(),
            sha256: self.artifact.digest.clone(),
            files: self.files.clone(),
            installed_at: Utc::now(),
            tested: false,
        }
    }

    /// Run the formula's `[test]` command against the placed files.
    /// Returns `None` when the formula declares no test.
    ///
    /// # Errors
    ///
    /// [`Error::TestFailure`] if the command fails, times out or its output
    /// lacks the expected substring.
    pub async fn smoke_test(
        &self,
        layout: &Layout,
        timeout: Duration,
    ) -> Result<Option<TestOutcome>, Error> {
        let Some(spec) = &self.resolved.formula.test else {
            return Ok(None);
        };
        Ok(Some(smoke::run(spec, layout, timeout).await?))
    }
}
