//! Uninstall command

use std::path::Path;

use anyhow::Result;
use pour_core::formula::FormulaError;
use pour_core::receipt::Receipt;
use pour_schema::PackageName;

use super::load_formula;
use crate::Context;

/// Remove a formula, given either its file or its installed name.
pub fn uninstall(ctx: &Context, target: &str) -> Result<()> {
    let path = Path::new(target);
    let name = if path.is_file() {
        load_formula(path)?.package.name
    } else {
        PackageName::new(target)
    };
    if !name.is_valid() {
        return Err(pour_core::Error::from(FormulaError::Invalid(format!(
            "Invalid package name '{name}'"
        )))
        .into());
    }

    if ctx.dry_run {
        match Receipt::load(&ctx.layout, &name)? {
            Some(receipt) => {
                for file in &receipt.files {
                    ctx.reporter.info(&format!(
                        "Would remove {}",
                        ctx.layout.resolve(&file.path).display()
                    ));
                }
            }
            None => return Err(pour_core::Error::NotInstalled(name).into()),
        }
        return Ok(());
    }

    let receipt = pour_core::ops::uninstall(&ctx.layout, &name, &*ctx.reporter)?;
    ctx.reporter.success(&format!(
        "Removed {} {} ({} file{})",
        receipt.name,
        receipt.version,
        receipt.files.len(),
        if receipt.files.len() == 1 { "" } else { "s" }
    ));
    Ok(())
}
