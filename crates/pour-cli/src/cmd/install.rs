//! Install command

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use pour_core::ops::{InstallOptions, InstallOutcome, Installer};
use pour_schema::Platform;

use super::{load_formula, target_platform};
use crate::Context;
use crate::ui::theme::format_size;

/// Options of `pour install` beyond the global flags.
#[derive(Debug, Clone)]
pub struct Args {
    pub platform: Option<Platform>,
    pub skip_test: bool,
    pub force: bool,
    pub test_timeout: Duration,
}

/// Install the formula at `path` into the context's prefix.
pub async fn install(ctx: &Context, path: &Path, args: Args) -> Result<()> {
    let start = Instant::now();
    let formula = load_formula(path)?;
    let host = target_platform(args.platform);

    for warning in formula.lint() {
        tracing::debug!(%warning, "formula lint");
    }

    ctx.reporter.section(&format!("Installing {}", formula.package.name));
    let options = InstallOptions {
        force: args.force,
        skip_test: args.skip_test,
        dry_run: ctx.dry_run,
        test_timeout: args.test_timeout,
    };
    let installer = Installer::new(&ctx.client, &ctx.layout, &*ctx.reporter, options);
    let outcome = installer.install(&formula, host).await?;

    match outcome {
        InstallOutcome::DryRun { url, sha256 } => {
            ctx.reporter.info(&format!("Would download {url}"));
            ctx.reporter.info(&format!("Would verify sha256 {sha256}"));
            for entry in formula.install.entries() {
                ctx.reporter.info(&format!(
                    "Would install {} -> {}",
                    entry.source.display(),
                    ctx.layout.resolve(&entry.dest).display()
                ));
            }
        }
        InstallOutcome::AlreadyInstalled(receipt) => {
            ctx.reporter.info(&format!(
                "{} {} is already installed (use --force to reinstall)",
                receipt.name, receipt.version
            ));
        }
        InstallOutcome::Installed {
            receipt,
            test,
            cached,
        } => {
            for file in &receipt.files {
                let path = ctx.layout.resolve(&file.path);
                let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                ctx.reporter
                    .info(&format!("{} ({})", path.display(), format_size(size)));
            }
            if let Some(test) = test {
                ctx.reporter.info(&format!("Smoke test passed: {}", test.output));
            }
            let source = if cached { " from cache" } else { "" };
            ctx.reporter.success(&format!(
                "Installed {} {}{source} in {:.1}s",
                receipt.name,
                receipt.version,
                start.elapsed().as_secs_f64()
            ));
        }
    }

    Ok(())
}
