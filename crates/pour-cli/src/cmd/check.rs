//! Check command

use std::path::Path;

use anyhow::Result;
use pour_core::Reporter;

use super::load_formula;
use crate::ui::ConsoleReporter;

/// Validate a formula file and print lint warnings.
pub fn check(path: &Path) -> Result<()> {
    let output = ConsoleReporter::default();
    let formula = load_formula(path)?;

    let platforms = formula
        .supported_platforms()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    output.success(&format!(
        "{} {} is valid ({platforms})",
        formula.package.name, formula.package.version
    ));

    for warning in formula.lint() {
        output.warning(&warning);
    }
    Ok(())
}
