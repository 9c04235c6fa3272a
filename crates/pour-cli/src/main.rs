//! pour - install prebuilt binaries from TOML formulas

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pour_cli::cmd;
use pour_cli::{Cli, Commands, Context};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            pour_cli::ui::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Commands that never touch the prefix
    match &cli.command {
        Commands::Hash { files } => return cmd::hash::hash(files),
        Commands::Completions { shell } => {
            cmd::completions::completions(*shell);
            return Ok(());
        }
        Commands::Check { formula } => return cmd::check::check(formula),
        _ => {}
    }

    let ctx = Context::from_cli(&cli)?;

    match cli.command {
        Commands::Install {
            formula,
            platform,
            skip_test,
            force,
            test_timeout,
        } => {
            let opts = cmd::install::Args {
                platform,
                skip_test,
                force,
                test_timeout: Duration::from_secs(test_timeout),
            };
            cmd::install::install(&ctx, &formula, opts).await
        }
        Commands::Resolve { formula, platform } => cmd::resolve::resolve(&ctx, &formula, platform),
        Commands::Test {
            formula,
            test_timeout,
        } => cmd::test::test(&ctx, &formula, Duration::from_secs(test_timeout)).await,
        Commands::Uninstall { formula } => cmd::uninstall::uninstall(&ctx, &formula),
        Commands::List => cmd::list::list(&ctx),
        Commands::Hash { .. } | Commands::Completions { .. } | Commands::Check { .. } => Ok(()),
    }
}
