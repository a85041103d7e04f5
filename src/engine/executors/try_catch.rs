//! Try / Catch / Finally
//!
//! State machine: Normal → CatchingError → Finalizing → Done. A raised
//! error moves to CatchingError; a matching catch clause clears it; no
//! match keeps it. `finally` runs on every path, and an error already in
//! flight is never masked by a finally error.
//!
//! The catch body runs against the enclosing scope with the caught error
//! stored on the context for `rethrow` and bound to `$error` for
//! interpolation.

use crate::ast::types::{ThrowNode, TryNode};
use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::EngineError;
use crate::engine::interpolation::interpolate;

pub fn execute(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &TryNode,
) -> Result<(), EngineError> {
    // Normal
    let mut pending = runner.run_statements(ctx, &node.body).err();

    // CatchingError
    if pending.as_ref().map(|e| e.is_catchable()).unwrap_or(false) {
        let err = pending.take().unwrap();
        let mut handled = false;
        for clause in &node.catch_clauses {
            let matcher = clause.matcher.as_deref().unwrap_or("any");
            if err.matches(matcher) {
                let saved = ctx.caught_error.replace(err.clone());
                ctx.set_variable("$error", err.message.clone());
                let outcome = runner.run_statements(ctx, &clause.body);
                ctx.caught_error = saved;
                // rethrow (or a new error in the catch body) resurfaces here
                pending = outcome.err();
                handled = true;
                break;
            }
        }
        if !handled {
            pending = Some(err);
        }
    }

    // Finalizing: runs on every path
    let finally_outcome = runner.run_statements(ctx, &node.finally_body);

    // Done: the original error wins over a finally error
    match (pending, finally_outcome) {
        (Some(err), _) => Err(err),
        (None, Err(err)) => Err(err),
        (None, Ok(())) => Ok(()),
    }
}

pub fn execute_throw(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &ThrowNode,
) -> Result<(), EngineError> {
    let message = interpolate(&node.message, ctx, runner.shared())?;
    Err(EngineError::user_thrown(node.label.clone(), message))
}

pub fn execute_rethrow(ctx: &mut ExecutionContext) -> Result<(), EngineError> {
    match ctx.caught_error.clone() {
        Some(err) => Err(err),
        None => Err(EngineError::new(
            crate::engine::errors::ErrorKind::Task,
            "rethrow outside of a catch block",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{
        ActionKind, ActionNode, CatchClause, IgnoreNode, RethrowNode, Statement,
    };
    use crate::engine::errors::ErrorKind;
    use crate::engine::testing::{test_runner, TestHarness};

    fn info(message: &str) -> Statement {
        Statement::Action(ActionNode {
            kind: ActionKind::Info,
            message: message.to_string(),
            line: 1,
        })
    }

    fn fail(message: &str) -> Statement {
        Statement::Action(ActionNode {
            kind: ActionKind::Fail,
            message: message.to_string(),
            line: 1,
        })
    }

    fn catch_any(body: Vec<Statement>) -> CatchClause {
        CatchClause {
            matcher: None,
            body,
            line: 1,
        }
    }

    #[test]
    fn test_catch_then_finally_no_propagation() {
        let TestHarness {
            runner,
            mut ctx,
            capture,
        } = test_runner();
        let node = TryNode {
            body: vec![fail("boom")],
            catch_clauses: vec![catch_any(vec![info("caught")])],
            finally_body: vec![info("cleanup")],
            line: 1,
        };
        execute(&runner, &mut ctx, &node).unwrap();
        let text = capture.contents();
        let caught_at = text.find("caught").unwrap();
        let cleanup_at = text.find("cleanup").unwrap();
        assert!(caught_at < cleanup_at);
    }

    #[test]
    fn test_unmatched_error_propagates_after_finally() {
        let TestHarness {
            runner,
            mut ctx,
            capture,
        } = test_runner();
        let node = TryNode {
            body: vec![fail("boom")],
            catch_clauses: vec![CatchClause {
                matcher: Some("HTTPError".to_string()),
                body: vec![info("wrong handler")],
                line: 1,
            }],
            finally_body: vec![info("cleanup")],
            line: 1,
        };
        let err = execute(&runner, &mut ctx, &node).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Task);
        let text = capture.contents();
        assert!(text.contains("cleanup"));
        assert!(!text.contains("wrong handler"));
    }

    #[test]
    fn test_catch_by_kind_and_message_substring() {
        let TestHarness {
            runner,
            mut ctx,
            capture,
        } = test_runner();
        let node = TryNode {
            body: vec![fail("deploy exploded")],
            catch_clauses: vec![
                CatchClause {
                    matcher: Some("HTTPError".to_string()),
                    body: vec![info("not this one")],
                    line: 1,
                },
                CatchClause {
                    matcher: Some("exploded".to_string()),
                    body: vec![info("matched by substring: {$error}")],
                    line: 1,
                },
            ],
            finally_body: vec![],
            line: 1,
        };
        execute(&runner, &mut ctx, &node).unwrap();
        let text = capture.contents();
        assert!(text.contains("matched by substring: deploy exploded"));
        assert!(!text.contains("not this one"));
    }

    #[test]
    fn test_rethrow_resurfaces_original() {
        let TestHarness {
            runner, mut ctx, ..
        } = test_runner();
        let node = TryNode {
            body: vec![fail("boom")],
            catch_clauses: vec![catch_any(vec![
                info("noting"),
                Statement::Rethrow(RethrowNode { line: 2 }),
            ])],
            finally_body: vec![],
            line: 1,
        };
        let err = execute(&runner, &mut ctx, &node).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Task);
        assert!(err.message.contains("boom"));
    }

    #[test]
    fn test_ignore_swallows() {
        let TestHarness {
            runner, mut ctx, ..
        } = test_runner();
        let node = TryNode {
            body: vec![fail("boom")],
            catch_clauses: vec![catch_any(vec![Statement::Ignore(IgnoreNode { line: 2 })])],
            finally_body: vec![],
            line: 1,
        };
        assert!(execute(&runner, &mut ctx, &node).is_ok());
    }

    #[test]
    fn test_throw_label_matches_catch() {
        let TestHarness {
            runner,
            mut ctx,
            capture,
        } = test_runner();
        let node = TryNode {
            body: vec![Statement::Throw(ThrowNode {
                label: Some("deploy_failed".to_string()),
                message: "rollout stuck".to_string(),
                line: 1,
            })],
            catch_clauses: vec![CatchClause {
                matcher: Some("deploy_failed".to_string()),
                body: vec![info("rolling back")],
                line: 1,
            }],
            finally_body: vec![],
            line: 1,
        };
        execute(&runner, &mut ctx, &node).unwrap();
        assert!(capture.contents().contains("rolling back"));
    }

    #[test]
    fn test_catch_variable_writes_persist() {
        let TestHarness {
            runner, mut ctx, ..
        } = test_runner();
        let node = TryNode {
            body: vec![fail("boom")],
            catch_clauses: vec![catch_any(vec![Statement::Variable(
                crate::ast::types::VariableNode::Set {
                    name: "$handled".to_string(),
                    value: crate::ast::types::Expression::Literal("yes".to_string()),
                    line: 2,
                },
            )])],
            finally_body: vec![],
            line: 1,
        };
        execute(&runner, &mut ctx, &node).unwrap();
        // try/catch bodies share the enclosing scope
        assert_eq!(ctx.get_variable("$handled"), Some("yes"));
    }
}
