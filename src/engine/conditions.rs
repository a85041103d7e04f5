//! Condition Evaluation
//!
//! Evaluates the DSL predicates used by `when`/`otherwise`, `if`, loop
//! filters, and detection gates. Operands are interpolated first; a bare
//! `$name` or identifier operand resolves through the normal lookup chain
//! and falls back to its literal spelling when nothing matches.

use lazy_static::lazy_static;
use regex_lite::Regex;
use semver::Version;

use super::config::EngineShared;
use super::context::ExecutionContext;
use super::errors::{EngineError, ErrorKind};
use super::interpolation::{interpolate, resolve_identifier};
use crate::ast::types::{ComparisonOperator, ConditionNode, StringTest};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").unwrap();
}

/// Evaluate a condition to a boolean.
pub fn eval_condition(
    condition: &ConditionNode,
    ctx: &ExecutionContext,
    shared: &EngineShared,
) -> Result<bool, EngineError> {
    match condition {
        ConditionNode::Comparison { left, op, right } => {
            let lhs = resolve_operand(left, ctx, shared)?;
            let rhs = resolve_operand(right, ctx, shared)?;
            compare_values(*op, &lhs, &rhs)
        }
        ConditionNode::Empty { value, negated } => {
            // Undefined references count as empty here
            let resolved = resolve_operand_lenient(value, ctx, shared)?;
            Ok(resolved.is_empty() != *negated)
        }
        ConditionNode::Test {
            value,
            test,
            pattern,
        } => {
            let lhs = resolve_operand(value, ctx, shared)?;
            let rhs = resolve_operand(pattern, ctx, shared)?;
            match test {
                StringTest::Contains => Ok(lhs.contains(&rhs)),
                StringTest::StartsWith => Ok(lhs.starts_with(&rhs)),
                StringTest::EndsWith => Ok(lhs.ends_with(&rhs)),
                StringTest::Matches => {
                    let regex = Regex::new(&rhs).map_err(|e| {
                        EngineError::new(
                            ErrorKind::Type,
                            format!("invalid pattern '{}': {}", rhs, e),
                        )
                    })?;
                    Ok(regex.is_match(&lhs))
                }
            }
        }
        ConditionNode::ToolAvailable { tools, negated } => {
            // available = AND over all; not available = OR over all
            let all_available = tools.iter().all(|tool| shared.detector.is_available(tool));
            Ok(if *negated { !all_available } else { all_available })
        }
        ConditionNode::ToolVersion { tool, op, version } => {
            let current = shared.detector.version(tool).ok_or_else(|| {
                EngineError::new(
                    ErrorKind::Detection,
                    format!("cannot determine version of '{}'", tool),
                )
            })?;
            let required = resolve_operand(version, ctx, shared)?;
            compare_versions(&current, *op, &required)
        }
        ConditionNode::InEnvironment { environment } => {
            let wanted = resolve_operand(environment, ctx, shared)?;
            Ok(shared.environment_name().eq_ignore_ascii_case(&wanted))
        }
    }
}

/// Resolve one condition operand.
fn resolve_operand(
    text: &str,
    ctx: &ExecutionContext,
    shared: &EngineShared,
) -> Result<String, EngineError> {
    let interpolated = interpolate(text, ctx, shared)?;
    let trimmed = interpolated.trim();
    if trimmed.starts_with('$') {
        return ctx
            .get_variable(trimmed)
            .map(str::to_string)
            .ok_or_else(|| EngineError::undefined_variable(trimmed));
    }
    if IDENTIFIER.is_match(trimmed) {
        if let Some(value) = resolve_identifier(trimmed, ctx) {
            return Ok(value);
        }
    }
    Ok(interpolated)
}

/// Like `resolve_operand`, but undefined references become the empty
/// string instead of erroring (for `is empty` tests).
fn resolve_operand_lenient(
    text: &str,
    ctx: &ExecutionContext,
    shared: &EngineShared,
) -> Result<String, EngineError> {
    match resolve_operand(text, ctx, shared) {
        Ok(value) => Ok(value),
        Err(err) if err.kind == ErrorKind::UndefinedVariable => Ok(String::new()),
        Err(err) => Err(err),
    }
}

fn parse_numeric(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Comparison semantics: `is`/`is not` are string equality; the operator
/// forms compare numerically when both sides parse, else lexicographically.
fn compare_values(op: ComparisonOperator, lhs: &str, rhs: &str) -> Result<bool, EngineError> {
    match op {
        ComparisonOperator::Is => Ok(lhs == rhs),
        ComparisonOperator::IsNot => Ok(lhs != rhs),
        _ => {
            let ordering = match (parse_numeric(lhs), parse_numeric(rhs)) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
                _ => lhs.cmp(rhs),
            };
            Ok(match op {
                ComparisonOperator::Eq => ordering.is_eq(),
                ComparisonOperator::Ne => !ordering.is_eq(),
                ComparisonOperator::Lt => ordering.is_lt(),
                ComparisonOperator::Le => ordering.is_le(),
                ComparisonOperator::Gt => ordering.is_gt(),
                ComparisonOperator::Ge => ordering.is_ge(),
                ComparisonOperator::Is | ComparisonOperator::IsNot => unreachable!(),
            })
        }
    }
}

/// Pad a loose version string (`1.2`, `v1`) to a full `major.minor.patch`
/// triple; missing components are zero.
fn pad_version(text: &str) -> Result<Version, EngineError> {
    let cleaned = text.trim().trim_start_matches('v');
    let numeric: String = cleaned
        .split(|c: char| c == '-' || c == '+')
        .next()
        .unwrap_or(cleaned)
        .to_string();
    let mut parts: Vec<&str> = numeric.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    let padded = parts[..3].join(".");
    Version::parse(&padded).map_err(|e| {
        EngineError::new(
            ErrorKind::Type,
            format!("invalid version '{}': {}", text, e),
        )
    })
}

/// SemVer-style comparison with zero-filled missing components.
pub fn compare_versions(
    current: &str,
    op: ComparisonOperator,
    required: &str,
) -> Result<bool, EngineError> {
    let lhs = pad_version(current)?;
    let rhs = pad_version(required)?;
    Ok(match op {
        ComparisonOperator::Is | ComparisonOperator::Eq => lhs == rhs,
        ComparisonOperator::IsNot | ComparisonOperator::Ne => lhs != rhs,
        ComparisonOperator::Lt => lhs < rhs,
        ComparisonOperator::Le => lhs <= rhs,
        ComparisonOperator::Gt => lhs > rhs,
        ComparisonOperator::Ge => lhs >= rhs,
    })
}
