//! Action Executor
//!
//! `info` / `step` / `warn` / `error` / `success` print with an emoji
//! prefix; `fail` prints and raises a task error.

use crate::ast::types::{ActionKind, ActionNode};
use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::{task_failure, StatementRunner};
use crate::engine::errors::EngineError;
use crate::engine::interpolation::interpolate;

pub fn execute(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &ActionNode,
) -> Result<(), EngineError> {
    let shared = runner.shared();
    let message = interpolate(&node.message, ctx, shared)?;
    match node.kind {
        ActionKind::Info => shared.output.info(&message),
        ActionKind::Step => shared.output.step(&message),
        ActionKind::Warn => shared.output.warn(&message),
        ActionKind::Error => shared.output.error(&message),
        ActionKind::Success => shared.output.success(&message),
        ActionKind::Fail => {
            shared.output.error(&message);
            return Err(task_failure(message));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::errors::ErrorKind;
    use crate::engine::testing::{test_runner, TestHarness};

    #[test]
    fn test_info_interpolates_and_prefixes() {
        let TestHarness {
            runner,
            mut ctx,
            capture,
        } = test_runner();
        ctx.set_variable("$name", "world");
        execute(
            &runner,
            &mut ctx,
            &ActionNode {
                kind: ActionKind::Info,
                message: "hello {$name}".to_string(),
                line: 1,
            },
        )
        .unwrap();
        assert!(capture.contents().contains("ℹ️  hello world"));
    }

    #[test]
    fn test_fail_raises_task_error() {
        let TestHarness {
            runner,
            mut ctx,
            capture,
        } = test_runner();
        let err = execute(
            &runner,
            &mut ctx,
            &ActionNode {
                kind: ActionKind::Fail,
                message: "boom".to_string(),
                line: 1,
            },
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Task);
        assert!(capture.contents().contains("❌ boom"));
    }
}
