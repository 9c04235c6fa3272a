//! pour - install prebuilt binaries from TOML formulas
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! A formula names, per (OS, architecture), the artifact to download and the
//! SHA-256 it must hash to. `pour` picks the rule for the host, verifies the
//! download, places the mapped files under a prefix and smoke-tests the
//! result.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.pour/
//! ├── bin/        # Installed executables
//! ├── receipts/   # <name>.json per installed formula
//! ├── cache/      # Verified downloads (by digest)
//! └── tmp/        # Staging for unpacked payloads
//! ```

pub mod cmd;
pub mod context;
pub mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pour_schema::Platform;

pub use context::Context;

#[derive(Debug, Parser)]
#[command(name = "pour")]
#[command(author, version, about = "pour - install prebuilt binaries from TOML formulas")]
pub struct Cli {
    /// Install prefix (default: ~/.pour)
    #[arg(long, global = true, env = "POUR_PREFIX")]
    pub prefix: Option<PathBuf>,

    /// Download cache (default: <prefix>/cache)
    #[arg(long, global = true, env = "POUR_CACHE")]
    pub cache: Option<PathBuf>,

    /// Whole-request download timeout in seconds
    #[arg(long, global = true, env = "POUR_HTTP_TIMEOUT", default_value_t = 300)]
    pub http_timeout: u64,

    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install a formula
    Install {
        /// Path to the formula TOML
        formula: PathBuf,
        /// Resolve for this platform instead of the host (e.g. macos/arm64)
        #[arg(long)]
        platform: Option<Platform>,
        /// Do not run the formula's [test] command
        #[arg(long)]
        skip_test: bool,
        /// Reinstall even if the same version is already installed
        #[arg(long, short = 'f')]
        force: bool,
        /// Smoke test timeout in seconds
        #[arg(long, default_value_t = 60)]
        test_timeout: u64,
    },
    /// Print the platform rule a formula resolves to
    Resolve {
        /// Path to the formula TOML
        formula: PathBuf,
        /// Resolve for this platform instead of the host (e.g. linux/x86_64)
        #[arg(long)]
        platform: Option<Platform>,
    },
    /// Run a formula's smoke test against its installed files
    Test {
        /// Path to the formula TOML
        formula: PathBuf,
        /// Smoke test timeout in seconds
        #[arg(long, default_value_t = 60)]
        test_timeout: u64,
    },
    /// Remove an installed formula
    Uninstall {
        /// Formula path or installed package name
        formula: String,
    },
    /// List installed formulas
    List,
    /// Validate a formula file
    Check {
        /// Path to the formula TOML
        formula: PathBuf,
    },
    /// Compute SHA256 hash of a file (for formula authoring)
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
