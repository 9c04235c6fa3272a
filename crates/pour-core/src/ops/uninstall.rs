//! Receipt-driven removal.

use pour_schema::PackageName;

use crate::Reporter;
use crate::error::{Error, InstallError};
use crate::formula::FormulaError;
use crate::paths::Layout;
use crate::receipt::Receipt;

/// Remove every file recorded in `name`'s receipt, then the receipt.
///
/// Files that are already gone are reported as warnings. Files modified since
/// the install are still removed.
///
/// # Errors
///
/// [`Error::Formula`] if `name` is not a valid package name,
/// [`Error::NotInstalled`] without a receipt, [`Error::Install`] if a file
/// exists but cannot be removed.
pub fn uninstall<R: Reporter + ?Sized>(
    layout: &Layout,
    name: &PackageName,
    reporter: &R,
) -> Result<Receipt, Error> {
    if !name.is_valid() {
        return Err(FormulaError::Invalid(format!("Invalid package name '{name}'")).into());
    }
    let Some(receipt) = Receipt::load(layout, name)? else {
        return Err(Error::NotInstalled(name.clone()));
    };

    for file in &receipt.files {
        let path = layout.resolve(&file.path);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                reporter.warning(&format!("{} was already removed", path.display()));
            }
            Err(e) => return Err(InstallError::io("remove", path, e).into()),
        }
    }

    Receipt::remove(layout, name)?;
    tracing::info!(package = %name, version = %receipt.version, "uninstalled");
    reporter.done(&receipt.name, &receipt.version, "uninstalled");
    Ok(receipt)
}
