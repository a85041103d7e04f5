//! Statement Dispatcher
//!
//! Routes each AST statement to its domain executor. The cancel token is
//! checked before every dispatch, and task/file/line context is attached
//! to errors as they surface.

use std::sync::Arc;

use super::config::EngineShared;
use super::context::ExecutionContext;
use super::errors::{EngineError, ErrorKind};
use super::executors;
use crate::ast::types::Statement;

/// Executes statement lists against an execution context. Cloneable so
/// parallel workers can carry their own handle with a private output
/// buffer.
#[derive(Clone)]
pub struct StatementRunner {
    shared: Arc<EngineShared>,
}

impl StatementRunner {
    pub fn new(shared: Arc<EngineShared>) -> Self {
        Self { shared }
    }

    pub fn shared(&self) -> &EngineShared {
        &self.shared
    }

    /// Run statements in source order, stopping at the first error.
    pub fn run_statements(
        &self,
        ctx: &mut ExecutionContext,
        statements: &[Statement],
    ) -> Result<(), EngineError> {
        for statement in statements {
            self.shared.cancel.check()?;
            self.run_statement(ctx, statement).map_err(|err| {
                err.with_location(&ctx.current_task, &ctx.current_file, statement.line())
            })?;
        }
        Ok(())
    }

    /// Dispatch one statement to its executor.
    pub fn run_statement(
        &self,
        ctx: &mut ExecutionContext,
        statement: &Statement,
    ) -> Result<(), EngineError> {
        match statement {
            Statement::Action(node) => executors::action::execute(self, ctx, node),
            Statement::Variable(node) => executors::variable::execute(self, ctx, node),
            Statement::Shell(node) => executors::shell::execute(self, ctx, node),
            Statement::Conditional(node) => executors::control::execute_conditional(self, ctx, node),
            Statement::For(node) => executors::control::execute_for(self, ctx, node),
            Statement::Break(_) => Err(EngineError::break_signal()),
            Statement::Continue(_) => Err(EngineError::continue_signal()),
            Statement::Try(node) => executors::try_catch::execute(self, ctx, node),
            Statement::Throw(node) => executors::try_catch::execute_throw(self, ctx, node),
            Statement::Rethrow(_) => executors::try_catch::execute_rethrow(ctx),
            Statement::Ignore(_) => Ok(()),
            Statement::UseSnippet(node) => self.run_snippet(ctx, &node.name),
            Statement::Docker(node) => executors::docker::execute(self, ctx, node),
            Statement::Git(node) => executors::git::execute(self, ctx, node),
            Statement::Http(node) => executors::http::execute(self, ctx, node),
            Statement::File(node) => executors::file::execute(self, ctx, node),
            Statement::Network(node) => executors::network::execute(self, ctx, node),
            Statement::Detection(node) => executors::detection::execute(self, ctx, node),
        }
    }

    /// Run a snippet body against the current scope. A namespaced snippet
    /// sets `current_namespace` for the duration of its body.
    fn run_snippet(&self, ctx: &mut ExecutionContext, name: &str) -> Result<(), EngineError> {
        let snippet = ctx
            .project
            .find_snippet(name)
            .ok_or_else(|| EngineError::not_found(format!("snippet '{}' not found", name)))?
            .clone();

        let saved_namespace = ctx.current_namespace.clone();
        if let Some((namespace, _)) = name.rsplit_once('.') {
            ctx.current_namespace = namespace.to_string();
        }
        let result = self.run_statements(ctx, &snippet.body);
        ctx.current_namespace = saved_namespace;
        result
    }
}

/// The error a `fail` action raises.
pub(crate) fn task_failure(message: String) -> EngineError {
    EngineError::new(ErrorKind::Task, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{
        ActionKind, ActionNode, Program, SnippetNode, Statement, UseSnippetNode,
    };
    use crate::engine::context::ProjectContext;
    use crate::engine::testing::{test_runner, TestHarness};
    use std::sync::Arc;

    fn info(message: &str) -> Statement {
        Statement::Action(ActionNode {
            kind: ActionKind::Info,
            message: message.to_string(),
            line: 1,
        })
    }

    fn use_snippet(name: &str) -> Statement {
        Statement::UseSnippet(UseSnippetNode {
            name: name.to_string(),
            line: 1,
        })
    }

    fn context_with_snippets() -> crate::engine::context::ExecutionContext {
        let mut project = ProjectContext::default();
        project.snippets.insert(
            "greet".to_string(),
            SnippetNode {
                name: "greet".to_string(),
                body: vec![info("hello from snippet")],
                line: 1,
            },
        );
        project.included_snippets.insert(
            "lib.login".to_string(),
            SnippetNode {
                name: "login".to_string(),
                // bare reference resolves through the snippet's namespace
                body: vec![info("ns={registry}")],
                line: 1,
            },
        );
        crate::engine::context::ExecutionContext::new(
            Arc::new(Program::default()),
            Arc::new(project),
        )
    }

    #[test]
    fn test_use_snippet_runs_body() {
        let TestHarness {
            runner, capture, ..
        } = test_runner();
        let mut ctx = context_with_snippets();
        runner
            .run_statements(&mut ctx, &[use_snippet("greet")])
            .unwrap();
        assert!(capture.contents().contains("hello from snippet"));
    }

    #[test]
    fn test_namespaced_snippet_sets_namespace() {
        let TestHarness {
            runner, capture, ..
        } = test_runner();
        let mut ctx = context_with_snippets();
        // lib.registry resolves inside the snippet via the lib namespace
        ctx.set_variable("lib.registry", "ghcr.io");
        runner
            .run_statements(&mut ctx, &[use_snippet("lib.login")])
            .unwrap();
        assert!(capture.contents().contains("ns=ghcr.io"));
        // namespace is restored afterwards
        assert_eq!(ctx.current_namespace, "");
    }

    #[test]
    fn test_missing_snippet_is_not_found() {
        let TestHarness { runner, .. } = test_runner();
        let mut ctx = context_with_snippets();
        let err = runner
            .run_statements(&mut ctx, &[use_snippet("ghost")])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_cancel_checked_before_dispatch() {
        let TestHarness {
            runner,
            mut ctx,
            capture,
        } = test_runner();
        runner.shared().cancel.cancel();
        let err = runner
            .run_statements(&mut ctx, &[info("should not print")])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
        assert!(!capture.contents().contains("should not print"));
    }

    #[test]
    fn test_error_location_attached() {
        let TestHarness {
            runner, mut ctx, ..
        } = test_runner();
        ctx.current_task = "release".to_string();
        let err = runner
            .run_statements(
                &mut ctx,
                &[Statement::Action(ActionNode {
                    kind: ActionKind::Fail,
                    message: "stop".to_string(),
                    line: 7,
                })],
            )
            .unwrap_err();
        assert_eq!(err.context.task.as_deref(), Some("release"));
        assert_eq!(err.context.line, Some(7));
    }
}
