//! High-level operations over formulas and the install prefix.

pub mod flow;
pub mod install;
pub mod smoke;
pub mod uninstall;

pub use install::{InstallOptions, InstallOutcome, Installer};
pub use uninstall::uninstall;
