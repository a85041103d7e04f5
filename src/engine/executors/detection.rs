//! Detection Executor
//!
//! Consults the tool detector: version captures, first-available
//! selection, availability and version gates, and environment gates.
//! Gate bodies run against the enclosing scope like other conditionals;
//! captures receive placeholders in dry-run.

use crate::ast::types::{ComparisonOperator, DetectionNode};
use crate::engine::conditions::compare_versions;
use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::{EngineError, ErrorKind};
use crate::engine::interpolation::DRY_RUN_VALUE;

pub fn execute(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &DetectionNode,
) -> Result<(), EngineError> {
    let shared = runner.shared();
    match node {
        DetectionNode::Detect {
            tool, capture_as, ..
        } => {
            if shared.config.dry_run {
                ctx.set_variable(capture_as.clone(), DRY_RUN_VALUE);
                return Ok(());
            }
            let version = shared.detector.version(tool).ok_or_else(|| {
                EngineError::new(
                    ErrorKind::Detection,
                    format!("cannot detect '{}'", tool),
                )
            })?;
            ctx.set_variable(capture_as.clone(), version);
            Ok(())
        }
        DetectionNode::DetectAvailable {
            alternatives,
            capture_as,
            ..
        } => {
            if shared.config.dry_run {
                ctx.set_variable(capture_as.clone(), DRY_RUN_VALUE);
                return Ok(());
            }
            let found = alternatives
                .iter()
                .find(|tool| shared.detector.is_available(tool))
                .ok_or_else(|| {
                    EngineError::new(
                        ErrorKind::Detection,
                        format!("none of [{}] is available", alternatives.join(", ")),
                    )
                })?;
            ctx.set_variable(capture_as.clone(), found.clone());
            Ok(())
        }
        DetectionNode::IfAvailable {
            tool,
            negated,
            then_body,
            else_body,
            ..
        } => {
            let available = shared.detector.is_available(tool);
            let take_then = if *negated { !available } else { available };
            if take_then {
                runner.run_statements(ctx, then_body)
            } else {
                runner.run_statements(ctx, else_body)
            }
        }
        DetectionNode::IfVersion {
            tool,
            operator,
            version,
            then_body,
            else_body,
            ..
        } => {
            let op = ComparisonOperator::parse(operator).ok_or_else(|| {
                EngineError::new(
                    ErrorKind::Detection,
                    format!("unknown version operator '{}'", operator),
                )
            })?;
            let current = shared.detector.version(tool).ok_or_else(|| {
                EngineError::new(
                    ErrorKind::Detection,
                    format!("cannot determine version of '{}'", tool),
                )
            })?;
            if compare_versions(&current, op, version)? {
                runner.run_statements(ctx, then_body)
            } else {
                runner.run_statements(ctx, else_body)
            }
        }
        DetectionNode::WhenEnvironment {
            environment,
            then_body,
            else_body,
            ..
        } => {
            if shared.environment_name().eq_ignore_ascii_case(environment) {
                runner.run_statements(ctx, then_body)
            } else {
                runner.run_statements(ctx, else_body)
            }
        }
    }
}
