//! Variable Executor
//!
//! `let` / `set` bind evaluated expressions; `transform` applies an
//! operation chain to an existing variable; `capture` binds interpolated
//! text; `capture from shell` binds trimmed stdout.

use crate::ast::types::VariableNode;
use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::EngineError;
use crate::engine::expression::evaluate;
use crate::engine::interpolation::interpolate;
use crate::engine::operations::{apply_chain, parse_chain};
use crate::engine::output::DRY_RUN_CAPTURE;

pub fn execute(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &VariableNode,
) -> Result<(), EngineError> {
    let shared = runner.shared();
    match node {
        VariableNode::Let { name, value, .. } | VariableNode::Set { name, value, .. } => {
            let evaluated = evaluate(value, ctx, shared)?;
            ctx.set_variable(name.clone(), evaluated);
            Ok(())
        }
        VariableNode::Transform {
            name, operation, ..
        } => {
            let current = ctx
                .get_variable(name)
                .map(str::to_string)
                .ok_or_else(|| EngineError::undefined_variable(name))?;
            let operation = interpolate(operation, ctx, shared)?;
            let ops = parse_chain(&operation)?;
            let transformed = apply_chain(&current, &ops)?;
            ctx.set_variable(name.clone(), transformed);
            Ok(())
        }
        VariableNode::Capture {
            name, expression, ..
        } => {
            let value = interpolate(expression, ctx, shared)?;
            ctx.set_variable(name.clone(), value);
            Ok(())
        }
        VariableNode::CaptureShell { name, command, .. } => {
            let command = interpolate(command, ctx, shared)?;
            if shared.config.dry_run {
                shared.output.dry_run(&command);
                ctx.set_variable(name.clone(), DRY_RUN_CAPTURE);
                return Ok(());
            }
            let response = shared.run_script(ctx, &command, None)?;
            if !response.success {
                return Err(EngineError::shell(format!(
                    "capture failed with exit code {}",
                    response.exit_code
                ))
                .with_command(command)
                .with_exit_code(response.exit_code));
            }
            ctx.set_variable(name.clone(), response.stdout.trim().to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Expression;
    use crate::engine::errors::ErrorKind;
    use crate::engine::testing::{dry_run_runner, harness, RecordingLauncher, TestHarness};
    use crate::engine::config::RunConfig;
    use std::sync::Arc;

    #[test]
    fn test_let_binds_evaluated_expression() {
        let TestHarness {
            runner, mut ctx, ..
        } = crate::engine::testing::test_runner();
        execute(
            &runner,
            &mut ctx,
            &VariableNode::Let {
                name: "$x".to_string(),
                value: Expression::Literal("hello world".to_string()),
                line: 1,
            },
        )
        .unwrap();
        assert_eq!(ctx.get_variable("$x"), Some("hello world"));
    }

    #[test]
    fn test_transform_applies_operation() {
        let TestHarness {
            runner, mut ctx, ..
        } = crate::engine::testing::test_runner();
        ctx.set_variable("$x", "hello world");
        execute(
            &runner,
            &mut ctx,
            &VariableNode::Transform {
                name: "$x".to_string(),
                operation: "uppercase".to_string(),
                line: 1,
            },
        )
        .unwrap();
        assert_eq!(ctx.get_variable("$x"), Some("HELLO WORLD"));
    }

    #[test]
    fn test_transform_missing_variable_errors() {
        let TestHarness {
            runner, mut ctx, ..
        } = crate::engine::testing::test_runner();
        let err = execute(
            &runner,
            &mut ctx,
            &VariableNode::Transform {
                name: "$ghost".to_string(),
                operation: "trim".to_string(),
                line: 1,
            },
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_capture_shell_binds_trimmed_stdout() {
        let launcher = Arc::new(RecordingLauncher::ok("  main\n"));
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher.clone(), RunConfig::default());
        execute(
            &runner,
            &mut ctx,
            &VariableNode::CaptureShell {
                name: "$branch".to_string(),
                command: "git branch --show-current".to_string(),
                line: 1,
            },
        )
        .unwrap();
        assert_eq!(ctx.get_variable("$branch"), Some("main"));
        assert_eq!(launcher.launched(), vec!["git branch --show-current"]);
    }

    #[test]
    fn test_capture_shell_dry_run_placeholder() {
        let TestHarness {
            runner,
            mut ctx,
            capture,
        } = dry_run_runner();
        execute(
            &runner,
            &mut ctx,
            &VariableNode::CaptureShell {
                name: "$d".to_string(),
                command: "date".to_string(),
                line: 1,
            },
        )
        .unwrap();
        assert_eq!(ctx.get_variable("$d"), Some(DRY_RUN_CAPTURE));
        assert!(capture.contents().contains("[DRY RUN] date"));
    }
}
