//! Resolve command

use std::path::Path;

use anyhow::Result;
use pour_schema::Platform;

use super::{load_formula, target_platform};
use crate::Context;

/// Print the rule the formula resolves to for the target platform.
pub fn resolve(ctx: &Context, path: &Path, platform: Option<Platform>) -> Result<()> {
    let formula = load_formula(path)?;
    let host = target_platform(platform);
    let resolved = formula.resolve(host)?;

    println!("platform: {}", resolved.rule.platform());
    println!("url:      {}", resolved.url());
    println!("sha256:   {}", resolved.checksum());
    println!("format:   {}", format_name(resolved.format()));

    if resolved.checksum().is_pending() {
        ctx.reporter
            .warning("checksum is a placeholder; install will be refused until it is filled in");
    }
    Ok(())
}

fn format_name(format: pour_core::formula::ArtifactFormat) -> &'static str {
    use pour_core::formula::ArtifactFormat;
    match format {
        ArtifactFormat::Binary => "binary",
        ArtifactFormat::TarGz => "tar.gz",
        ArtifactFormat::Zip => "zip",
    }
}
