//! Shared command context.
//!
//! Resolves the prefix, cache and HTTP settings once from the command line
//! (and the environment, via clap) so commands do not repeat it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use pour_core::paths::try_pour_home;
use pour_core::{Layout, Reporter};

use crate::Cli;
use crate::ui::ConsoleReporter;

/// Groups common state used by the commands.
#[derive(Clone)]
pub struct Context {
    pub layout: Layout,
    pub client: reqwest::Client,
    pub reporter: Arc<dyn Reporter>,
    pub dry_run: bool,
    pub quiet: bool,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("layout", &self.layout)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let prefix = match &cli.prefix {
            Some(prefix) => prefix.clone(),
            None => try_pour_home()
                .context("Could not determine home directory; pass --prefix or set POUR_PREFIX")?,
        };
        let mut layout = Layout::new(prefix);
        if let Some(cache) = &cli.cache {
            layout = layout.with_cache(cache);
        }

        let client = pour_core::http_client(Duration::from_secs(cli.http_timeout))
            .context("Failed to build HTTP client")?;

        tracing::debug!(prefix = %layout.prefix().display(), cache = %layout.cache_dir().display(), "context");

        Ok(Self {
            layout,
            client,
            reporter: Arc::new(ConsoleReporter::new(cli.quiet)),
            dry_run: cli.dry_run,
            quiet: cli.quiet,
        })
    }
}
