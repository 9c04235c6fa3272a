//! Core library for pour.
//!
//! Parses formulas, selects the platform rule for a host, downloads and
//! verifies artifacts, places files into an install prefix and records what
//! was installed.

pub mod error;
pub mod formula;
pub mod io;
pub mod ops;
pub mod paths;
pub mod receipt;
pub mod reporter;

use std::time::Duration;

pub use error::Error;
pub use formula::Formula;
pub use paths::Layout;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("pour/", env!("CARGO_PKG_VERSION"));

/// Default whole-request timeout for downloads.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client used for artifact downloads.
///
/// # Errors
///
/// Fails if the TLS backend cannot be initialised.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .tcp_nodelay(true)
        .timeout(timeout)
        .build()
}
