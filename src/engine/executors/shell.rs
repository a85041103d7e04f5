//! Shell Executor
//!
//! `run` / `exec` / multi-line `shell` blocks and `capture ... as $x`.
//! Commands are interpolated, launched under the platform shell config,
//! and non-zero exits surface as shell errors. In dry-run the banner is
//! printed and capture targets receive a placeholder.

use crate::ast::types::{ShellAction, ShellNode};
use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::EngineError;
use crate::engine::interpolation::interpolate;
use crate::engine::output::DRY_RUN_CAPTURE;

pub fn execute(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &ShellNode,
) -> Result<(), EngineError> {
    let shared = runner.shared();
    let command = interpolate(&node.command, ctx, shared)?;
    let capture_target = match node.action {
        ShellAction::Capture => node.capture_as.as_deref(),
        _ => None,
    };

    if shared.config.dry_run {
        shared.output.dry_run(&command);
        if let Some(target) = capture_target {
            ctx.set_variable(target.to_string(), DRY_RUN_CAPTURE);
        }
        return Ok(());
    }

    if shared.config.verbose {
        shared.output.line(&format!("$ {}", command));
    }

    let response = shared.run_script(ctx, &command, None)?;

    if let Some(target) = capture_target {
        ctx.set_variable(target.to_string(), response.stdout.trim().to_string());
    } else {
        // Emit process output as one contiguous block
        let mut lines: Vec<String> = response
            .stdout
            .lines()
            .map(str::to_string)
            .collect();
        lines.extend(response.stderr.lines().map(str::to_string));
        if !lines.is_empty() {
            shared.output.block(&lines);
        }
    }

    if !response.success {
        return Err(EngineError::shell(format!(
            "command failed with exit code {}",
            response.exit_code
        ))
        .with_command(command)
        .with_exit_code(response.exit_code));
    }
    Ok(())
}
