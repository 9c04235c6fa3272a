//! Command implementations, one module per subcommand.

use std::path::Path;

use anyhow::{Context as _, Result};
use pour_core::Formula;
use pour_schema::Platform;

pub mod check;
pub mod completions;
pub mod hash;
pub mod install;
pub mod list;
pub mod resolve;
pub mod uninstall;

/// Load and validate a formula file.
pub fn load_formula(path: &Path) -> Result<Formula> {
    Formula::from_file(path).with_context(|| format!("Failed to load formula {}", path.display()))
}

/// The `--platform` override, or the host.
pub fn target_platform(platform: Option<Platform>) -> Platform {
    platform.unwrap_or_else(Platform::current)
}
