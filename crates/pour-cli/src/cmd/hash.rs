//! Hash command

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use pour_core::io::download::hash_file;

/// Compute SHA256 hash of files
pub fn hash(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let digest =
            hash_file(file).with_context(|| format!("Failed to hash {}", file.display()))?;
        println!("{digest}  {}", file.display());
    }
    Ok(())
}
