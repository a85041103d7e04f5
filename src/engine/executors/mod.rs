//! Domain Executors
//!
//! One module per statement domain. Executors interpolate their options,
//! assemble the equivalent underlying tool command, and hand it to the
//! shell launcher; in dry-run the command is printed instead.

pub mod action;
pub mod control;
pub mod detection;
pub mod docker;
pub mod file;
pub mod git;
pub mod http;
pub mod network;
pub mod shell;
pub mod try_catch;
pub mod variable;

use std::time::Duration;

use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::{EngineError, ErrorKind};
use crate::runner::shell::ShellResponse;

/// Run an assembled tool command through the launcher, reporting success
/// or failure with the caller's error kind. Returns `None` in dry-run.
pub(crate) fn run_tool_command(
    runner: &StatementRunner,
    ctx: &ExecutionContext,
    command: &str,
    kind: ErrorKind,
    timeout: Option<Duration>,
) -> Result<Option<ShellResponse>, EngineError> {
    let shared = runner.shared();
    if shared.config.dry_run {
        shared.output.dry_run(command);
        return Ok(None);
    }
    if shared.config.verbose {
        shared.output.line(&format!("$ {}", command));
    }
    let response = shared.run_script(ctx, command, timeout)?;
    if !response.success {
        let detail = if response.stderr.trim().is_empty() {
            String::new()
        } else {
            format!(": {}", response.stderr.trim())
        };
        return Err(EngineError::new(
            kind,
            format!("command failed with exit code {}{}", response.exit_code, detail),
        )
        .with_command(command.to_string())
        .with_exit_code(response.exit_code));
    }
    Ok(Some(response))
}

/// Quote a value for inclusion in a shell command line.
pub(crate) fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c))
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
