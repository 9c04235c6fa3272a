use anyhow::{Context as _, Result};
use pour_core::receipt::Receipt;

use crate::Context;
use crate::ui::list::{header, row};

/// List all installed formulas
pub fn list(ctx: &Context) -> Result<()> {
    let receipts = Receipt::list(&ctx.layout).context("Failed to read receipts")?;

    if receipts.is_empty() {
        if !ctx.quiet {
            println!("No formulas installed in {}.", ctx.layout.prefix().display());
            println!("Run 'pour install <formula.toml>' to get started.");
        }
        return Ok(());
    }

    if !ctx.quiet {
        println!("{}", header());
    }
    for receipt in &receipts {
        println!("{}", row(receipt));
    }
    Ok(())
}
