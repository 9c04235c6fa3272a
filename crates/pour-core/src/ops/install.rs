//! Formula installation.
//!
//! [`Installer::install`] drives the linear pipeline
//! resolve -> fetch/verify -> place -> receipt -> smoke test. Any failure ends
//! the attempt; nothing is retried. An install only counts as done once its
//! smoke test has passed (or it has none).

use std::time::{Duration, Instant};

use pour_schema::{Platform, Sha256Digest};
use reqwest::Client;

use crate::Reporter;
use crate::error::{Error, InstallError};
use crate::formula::Formula;
use crate::ops::smoke::{DEFAULT_TEST_TIMEOUT, TestOutcome};
use crate::paths::Layout;
use crate::receipt::Receipt;

/// Knobs for one install invocation.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Reinstall even if an intact install of the same version exists.
    pub force: bool,
    /// Do not run the formula's `[test]` command.
    pub skip_test: bool,
    /// Resolve and verify the checksum is usable, but touch nothing.
    pub dry_run: bool,
    /// Upper bound for the smoke test.
    pub test_timeout: Duration,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            force: false,
            skip_test: false,
            dry_run: false,
            test_timeout: DEFAULT_TEST_TIMEOUT,
        }
    }
}

/// What an install invocation did.
#[derive(Debug)]
pub enum InstallOutcome {
    /// Files were placed and a receipt written.
    Installed {
        /// The new receipt.
        receipt: Receipt,
        /// Smoke test result, if one ran.
        test: Option<TestOutcome>,
        /// Whether the artifact came from the cache.
        cached: bool,
    },
    /// An intact install of the same version and artifact already exists.
    AlreadyInstalled(Receipt),
    /// Dry run: what would have been fetched.
    DryRun {
        /// Resolved URL.
        url: String,
        /// Digest it would be verified against.
        sha256: Sha256Digest,
    },
}

/// Groups the state shared by the install steps.
#[derive(Debug)]
pub struct Installer<'a, R: Reporter + ?Sized> {
    client: &'a Client,
    layout: &'a Layout,
    reporter: &'a R,
    options: InstallOptions,
}

impl<'a, R: Reporter + ?Sized> Installer<'a, R> {
    /// Create an installer writing into `layout`.
    pub fn new(client: &'a Client, layout: &'a Layout, reporter: &'a R, options: InstallOptions) -> Self {
        Self {
            client,
            layout,
            reporter,
            options,
        }
    }

    /// Install `formula` for `host`.
    ///
    /// # Errors
    ///
    /// `NoMatchingPlatform`, `Integrity`, `Download`, `Install` or
    /// `TestFailure`, from the step that failed. An integrity failure
    /// happens before anything is written to the prefix.
    pub async fn install(&self, formula: &Formula, host: Platform) -> Result<InstallOutcome, Error> {
        let started = Instant::now();
        let name = &formula.package.name;
        let version = &formula.package.version;

        let resolved = match formula.resolve(host) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.reporter.failed(name, version, "no matching platform");
                return Err(e);
            }
        };
        let expected = match resolved.expected_digest() {
            Ok(digest) => digest.clone(),
            Err(e) => {
                self.reporter.failed(name, version, "unverifiable checksum");
                return Err(e.into());
            }
        };

        if self.options.dry_run {
            self.reporter.done(name, version, "(dry run)");
            return Ok(InstallOutcome::DryRun {
                url: resolved.url().to_string(),
                sha256: expected,
            });
        }

        let previous = Receipt::load(self.layout, name)?;
        if let Some(existing) = previous.as_ref().filter(|_| !self.options.force) {
            let verified = existing.tested || formula.test.is_none() || self.options.skip_test;
            if existing.version == *version
                && existing.sha256 == expected
                && verified
                && same_mapping(existing, formula)
                && existing.is_intact(self.layout)
            {
                tracing::info!(package = %name, %version, "already installed");
                self.reporter.done(name, version, "already installed");
                return Ok(InstallOutcome::AlreadyInstalled(existing.clone()));
            }
            tracing::debug!(package = %name, previous = %existing.version, "replacing previous install");
        }

        let fetched = resolved.fetch(self.client, self.layout, self.reporter).await?;
        let cached = fetched.artifact.cached;

        self.reporter.installing(name, version);
        let placed = match fetched.place(self.layout) {
            Ok(placed) => placed,
            Err(e) => {
                self.reporter.failed(name, version, "install failed");
                return Err(e);
            }
        };

        let mut receipt = placed.receipt();
        if let Some(previous) = &previous {
            remove_stale(self.layout, previous, &receipt)?;
        }
        // recorded before the smoke test so a failing install stays uninstallable
        receipt.save(self.layout)?;
        tracing::info!(
            package = %name,
            %version,
            files = receipt.files.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "installed"
        );

        let test = if self.options.skip_test || formula.test.is_none() {
            None
        } else {
            self.reporter.testing(name, version);
            match placed.smoke_test(self.layout, self.options.test_timeout).await {
                Ok(outcome) => {
                    receipt.tested = true;
                    receipt.save(self.layout)?;
                    outcome
                }
                Err(e) => {
                    self.reporter.failed(name, version, "smoke test failed");
                    return Err(e);
                }
            }
        };

        self.reporter.done(name, version, "installed");
        Ok(InstallOutcome::Installed {
            receipt,
            test,
            cached,
        })
    }
}

/// Whether `receipt` records exactly the destinations `formula` maps.
fn same_mapping(receipt: &Receipt, formula: &Formula) -> bool {
    let mut recorded: Vec<_> = receipt.files.iter().map(|f| f.path.as_path()).collect();
    let entries = formula.install.entries();
    let mut wanted: Vec<_> = entries.iter().map(|e| e.dest.as_path()).collect();
    recorded.sort();
    wanted.sort();
    recorded == wanted
}

/// Delete files the previous install placed that the new one does not.
fn remove_stale(layout: &Layout, previous: &Receipt, next: &Receipt) -> Result<(), InstallError> {
    for file in previous.stale_files(next) {
        let path = layout.resolve(&file.path);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(InstallError::io("remove", path, e)),
        }
    }
    Ok(())
}
