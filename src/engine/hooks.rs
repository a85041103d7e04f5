//! Lifecycle Hooks
//!
//! Four hook channels with fixed policies: `setup` and `before any task`
//! are fail-fast; `after any task` and `teardown` are best-effort —
//! their errors are logged with a warning marker and never mask an
//! in-flight task error. Statement order inside each channel is the
//! registration order.

use super::context::ExecutionContext;
use super::dispatch::StatementRunner;
use super::errors::EngineError;
use crate::ast::types::Statement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookChannel {
    Setup,
    Teardown,
    BeforeAnyTask,
    AfterAnyTask,
}

impl HookChannel {
    fn label(&self) -> &'static str {
        match self {
            HookChannel::Setup => "setup",
            HookChannel::Teardown => "teardown",
            HookChannel::BeforeAnyTask => "before any task",
            HookChannel::AfterAnyTask => "after any task",
        }
    }
}

/// Runs one hook channel body with its channel policy.
pub struct HookManager;

impl HookManager {
    /// Fail-fast channels: the first error aborts the caller.
    pub fn run_strict(
        runner: &StatementRunner,
        ctx: &mut ExecutionContext,
        channel: HookChannel,
        body: &[Statement],
    ) -> Result<(), EngineError> {
        if body.is_empty() {
            return Ok(());
        }
        if runner.shared().config.verbose {
            runner
                .shared()
                .output
                .line(&format!("running {} hooks", channel.label()));
        }
        runner.run_statements(ctx, body)
    }

    /// Best-effort channels: errors are logged and swallowed.
    pub fn run_best_effort(
        runner: &StatementRunner,
        ctx: &mut ExecutionContext,
        channel: HookChannel,
        body: &[Statement],
    ) {
        if body.is_empty() {
            return;
        }
        if let Err(err) = runner.run_statements(ctx, body) {
            runner
                .shared()
                .output
                .warn(&format!("{} hook failed: {}", channel.label(), err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{ActionKind, ActionNode};
    use crate::engine::errors::ErrorKind;
    use crate::engine::testing::{test_runner, TestHarness};

    fn fail(message: &str) -> Statement {
        Statement::Action(ActionNode {
            kind: ActionKind::Fail,
            message: message.to_string(),
            line: 1,
        })
    }

    #[test]
    fn test_strict_channel_propagates() {
        let TestHarness {
            runner, mut ctx, ..
        } = test_runner();
        let err = HookManager::run_strict(
            &runner,
            &mut ctx,
            HookChannel::Setup,
            &[fail("setup broke")],
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Task);
    }

    #[test]
    fn test_best_effort_channel_logs_and_continues() {
        let TestHarness {
            runner,
            mut ctx,
            capture,
        } = test_runner();
        HookManager::run_best_effort(
            &runner,
            &mut ctx,
            HookChannel::AfterAnyTask,
            &[fail("cleanup broke")],
        );
        let text = capture.contents();
        assert!(text.contains("⚠️"));
        assert!(text.contains("after any task hook failed"));
    }
}
