//! Terminal output: styled reporter, listings and error rendering.

pub mod console;
pub mod list;
pub mod theme;

pub use console::ConsoleReporter;

use crossterm::style::Stylize;
use theme::Theme;

/// Print an error and its cause chain to stderr.
pub fn print_error(err: &anyhow::Error) {
    let theme = Theme::default();
    eprintln!(
        "{} {}",
        theme.icons.error.with(theme.colors.error),
        err.to_string().with(theme.colors.error).bold()
    );
    for cause in err.chain().skip(1) {
        eprintln!("  {} {cause}", "caused by:".with(theme.colors.secondary));
    }
}
