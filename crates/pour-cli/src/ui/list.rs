//! Installed-formula listing.

use crossterm::style::Stylize;
use pour_core::receipt::Receipt;

use super::theme::{NAME_WIDTH, Theme, VERSION_WIDTH};

/// Column header for `pour list`.
pub fn header() -> String {
    let theme = Theme::default();
    format!(
        "{:<NAME_WIDTH$} {:<VERSION_WIDTH$} {:<14} {}",
        "NAME", "VERSION", "PLATFORM", "INSTALLED"
    )
    .with(theme.colors.header)
    .to_string()
}

/// One receipt as a listing row (unstyled, padded).
pub fn row(receipt: &Receipt) -> String {
    format!(
        "{:<NAME_WIDTH$} {:<VERSION_WIDTH$} {:<14} {}",
        receipt.name.as_str(),
        receipt.version.as_str(),
        receipt.platform.to_string(),
        receipt.installed_at.format("%Y-%m-%d")
    )
}
