//! Console reporter.
//!
//! Renders pipeline progress as one styled line per state change on stderr,
//! leaving stdout to command results.

use std::io::Write;

use crossterm::style::Stylize;
use pour_core::Reporter;
use pour_schema::{PackageName, Version};

use super::theme::{Theme, format_size};

/// Prints status lines to stderr. `quiet` keeps only warnings and errors.
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    quiet: bool,
    theme: Theme,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            theme: Theme::default(),
        }
    }

    fn line(&self, msg: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{msg}");
    }

    fn package_line(&self, icon: &str, name: &PackageName, version: &Version, status: String) {
        let colors = &self.theme.colors;
        self.line(&format!(
            "{} {} {} {}",
            icon,
            name.as_str().with(colors.package_name),
            version.as_str().with(colors.version),
            status
        ));
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        self.line(&format!("{}", title.with(self.theme.colors.header).bold()));
    }

    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>) {
        // one line when a transfer starts, not per chunk
        if self.quiet || current != 0 {
            return;
        }
        let size = total.map(format_size).unwrap_or_default();
        self.package_line(
            &self.theme.icons.active.with(self.theme.colors.active).to_string(),
            name,
            version,
            format!("downloading {size}").with(self.theme.colors.secondary).to_string(),
        );
    }

    fn installing(&self, name: &PackageName, version: &Version) {
        if self.quiet {
            return;
        }
        self.package_line(
            &self.theme.icons.active.with(self.theme.colors.active).to_string(),
            name,
            version,
            "installing".with(self.theme.colors.secondary).to_string(),
        );
    }

    fn testing(&self, name: &PackageName, version: &Version) {
        if self.quiet {
            return;
        }
        self.package_line(
            &self.theme.icons.active.with(self.theme.colors.active).to_string(),
            name,
            version,
            "testing".with(self.theme.colors.secondary).to_string(),
        );
    }

    fn done(&self, name: &PackageName, version: &Version, detail: &str) {
        if self.quiet {
            return;
        }
        self.package_line(
            &self.theme.icons.success.with(self.theme.colors.success).to_string(),
            name,
            version,
            detail.with(self.theme.colors.success).to_string(),
        );
    }

    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        self.package_line(
            &self.theme.icons.error.with(self.theme.colors.error).to_string(),
            name,
            version,
            reason.with(self.theme.colors.error).to_string(),
        );
    }

    fn info(&self, msg: &str) {
        if self.quiet {
            return;
        }
        self.line(&format!("{} {msg}", self.theme.icons.info.with(self.theme.colors.secondary)));
    }

    fn success(&self, msg: &str) {
        if self.quiet {
            return;
        }
        self.line(&format!("{} {msg}", self.theme.icons.success.with(self.theme.colors.success)));
    }

    fn warning(&self, msg: &str) {
        self.line(&format!(
            "{} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        ));
    }
}
