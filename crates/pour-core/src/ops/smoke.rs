//! Post-install smoke test.
//!
//! The formula's `[test]` command runs through `sh -c` after `{bin}` and
//! `{prefix}` are substituted. It passes when it exits successfully and its
//! combined stdout/stderr contains the expected substring.

use std::process::Stdio;
use std::time::Duration;

use crate::error::TestFailure;
use crate::formula::TestSpec;
use crate::paths::Layout;

/// Default upper bound on how long a smoke test may run.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of a passing smoke test.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    /// The command line that ran.
    pub command: String,
    /// Combined stdout and stderr.
    pub output: String,
}

/// Command line with placeholders replaced by absolute paths.
pub fn render_command(spec: &TestSpec, layout: &Layout) -> String {
    spec.command
        .replace("{bin}", &layout.bin_dir().to_string_lossy())
        .replace("{prefix}", &layout.prefix().to_string_lossy())
}

/// Run the smoke test against the installed files.
///
/// # Errors
///
/// Returns a [`TestFailure`] if the shell cannot be spawned, the command
/// times out or exits unsuccessfully, or the output lacks `spec.expect`.
pub async fn run(
    spec: &TestSpec,
    layout: &Layout,
    timeout: Duration,
) -> Result<TestOutcome, TestFailure> {
    let command = render_command(spec, layout);
    tracing::debug!(%command, "running smoke test");

    let child = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(&command)
        .current_dir(layout.prefix())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| TestFailure::Spawn {
            command: command.clone(),
            source,
        })?;

    let result = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result,
        Err(_) => {
            return Err(TestFailure::Timeout {
                command,
                secs: timeout.as_secs(),
            });
        }
    };
    let out = result.map_err(|source| TestFailure::Spawn {
        command: command.clone(),
        source,
    })?;

    let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
    output.push_str(&String::from_utf8_lossy(&out.stderr));
    let output = output.trim().to_string();

    if !out.status.success() {
        return Err(TestFailure::ExitStatus {
            command,
            status: out.status,
            output,
        });
    }
    if !output.contains(&spec.expect) {
        return Err(TestFailure::OutputMismatch {
            command,
            expected: spec.expect.clone(),
            output,
        });
    }

    Ok(TestOutcome { command, output })
}
