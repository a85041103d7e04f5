//! Expression Evaluation
//!
//! Evaluates expression nodes to string values. Arithmetic runs in double
//! precision when both operands parse as numbers; results that are
//! mathematically integral are formatted without a decimal point.
//! Comparisons yield the literals `"true"` / `"false"`.

use std::time::Duration;

use chrono::Utc;

use super::config::EngineShared;
use super::context::ExecutionContext;
use super::errors::{EngineError, ErrorKind};
use super::interpolation::{interpolate, resolve_identifier, DRY_RUN_VALUE};
use super::value::format_number;
use crate::ast::types::{BinaryOperator, Expression};

const CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Evaluate an expression to its string value.
pub fn evaluate(
    expr: &Expression,
    ctx: &ExecutionContext,
    shared: &EngineShared,
) -> Result<String, EngineError> {
    match expr {
        Expression::Literal(text) => interpolate(text, ctx, shared),
        Expression::Identifier(name) => {
            if name.starts_with('$') {
                return ctx
                    .get_variable(name)
                    .map(str::to_string)
                    .ok_or_else(|| EngineError::undefined_variable(name));
            }
            resolve_identifier(name, ctx).ok_or_else(|| EngineError::undefined_variable(name))
        }
        Expression::ArrayLiteral(items) => {
            let values: Vec<String> = items
                .iter()
                .map(|item| evaluate(item, ctx, shared))
                .collect::<Result<_, _>>()?;
            Ok(format!("[{}]", values.join(",")))
        }
        Expression::Binary { op, left, right } => {
            let lhs = evaluate(left, ctx, shared)?;
            let rhs = evaluate(right, ctx, shared)?;
            apply_binary(*op, &lhs, &rhs)
        }
        Expression::FunctionCall { name, args } => {
            if name == "now" && args.is_empty() {
                return Ok(Utc::now().timestamp().to_string());
            }
            let rendered: Vec<String> = args
                .iter()
                .map(|arg| evaluate(arg, ctx, shared))
                .collect::<Result<_, _>>()?;
            let call = format!("{}({})", name, rendered.join(", "));
            if shared.config.dry_run {
                return Ok(DRY_RUN_VALUE.to_string());
            }
            let response = shared.run_script(ctx, &call, Some(CALL_TIMEOUT))?;
            if !response.success {
                return Err(EngineError::shell(format!(
                    "function call failed with exit code {}",
                    response.exit_code
                ))
                .with_command(call)
                .with_exit_code(response.exit_code));
            }
            Ok(response.stdout.trim().to_string())
        }
    }
}

fn parse_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Apply a binary operator to evaluated operands.
fn apply_binary(op: BinaryOperator, lhs: &str, rhs: &str) -> Result<String, EngineError> {
    let left_num = parse_numeric(lhs);
    let right_num = parse_numeric(rhs);

    match op {
        BinaryOperator::Add => match (left_num, right_num) {
            (Some(a), Some(b)) => Ok(format_number(a + b)),
            // `+` concatenates when either side is non-numeric
            _ => Ok(format!("{}{}", lhs, rhs)),
        },
        BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Div => {
            let (a, b) = match (left_num, right_num) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    return Err(EngineError::new(
                        ErrorKind::Type,
                        format!(
                            "operator '{}' requires numeric operands, got '{}' and '{}'",
                            op.as_str(),
                            lhs,
                            rhs
                        ),
                    ))
                }
            };
            match op {
                BinaryOperator::Sub => Ok(format_number(a - b)),
                BinaryOperator::Mul => Ok(format_number(a * b)),
                BinaryOperator::Div => {
                    if b == 0.0 {
                        Err(EngineError::new(
                            ErrorKind::DivisionByZero,
                            format!("division by zero: {} / {}", lhs, rhs),
                        ))
                    } else {
                        Ok(format_number(a / b))
                    }
                }
                _ => unreachable!(),
            }
        }
        BinaryOperator::Eq
        | BinaryOperator::Ne
        | BinaryOperator::Lt
        | BinaryOperator::Le
        | BinaryOperator::Gt
        | BinaryOperator::Ge => {
            let ordering = match (left_num, right_num) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
                _ => lhs.cmp(rhs),
            };
            let result = match op {
                BinaryOperator::Eq => ordering.is_eq(),
                BinaryOperator::Ne => !ordering.is_eq(),
                BinaryOperator::Lt => ordering.is_lt(),
                BinaryOperator::Le => ordering.is_le(),
                BinaryOperator::Gt => ordering.is_gt(),
                BinaryOperator::Ge => ordering.is_ge(),
                _ => unreachable!(),
            };
            Ok(result.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Program;
    use crate::engine::config::RunConfig;
    use crate::engine::context::ProjectContext;
    use crate::engine::output::Output;
    use crate::engine::value::Value;
    use crate::runner::shell::CancelToken;
    use crate::runner::{LocalIncludeFetcher, SystemShellLauncher, SystemToolDetector};
    use std::sync::Arc;

    fn shared() -> EngineShared {
        let launcher = Arc::new(SystemShellLauncher::new());
        EngineShared {
            launcher: launcher.clone(),
            detector: Arc::new(SystemToolDetector::new(launcher)),
            fetcher: Arc::new(LocalIncludeFetcher::new()),
            output: Output::stdout(),
            config: RunConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    fn context() -> ExecutionContext {
        let mut ctx = ExecutionContext::new(
            Arc::new(Program::default()),
            Arc::new(ProjectContext::default()),
        );
        ctx.set_variable("$count", "4");
        ctx.parameters.insert("name".to_string(), Value::String("drun".to_string()));
        ctx
    }

    fn binary(op: BinaryOperator, left: &str, right: &str) -> Expression {
        Expression::Binary {
            op,
            left: Box::new(Expression::Literal(left.to_string())),
            right: Box::new(Expression::Literal(right.to_string())),
        }
    }

    #[test]
    fn test_literal_interpolates() {
        let expr = Expression::Literal("hello {name}".to_string());
        assert_eq!(evaluate(&expr, &context(), &shared()).unwrap(), "hello drun");
    }

    #[test]
    fn test_identifier_lookup() {
        let ctx = context();
        let s = shared();
        assert_eq!(
            evaluate(&Expression::Identifier("$count".to_string()), &ctx, &s).unwrap(),
            "4"
        );
        assert_eq!(
            evaluate(&Expression::Identifier("name".to_string()), &ctx, &s).unwrap(),
            "drun"
        );
        let err = evaluate(&Expression::Identifier("$missing".to_string()), &ctx, &s).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_array_literal_round_trips() {
        let expr = Expression::ArrayLiteral(vec![
            Expression::Literal("linux".to_string()),
            Expression::Literal("darwin".to_string()),
        ]);
        assert_eq!(
            evaluate(&expr, &context(), &shared()).unwrap(),
            "[linux,darwin]"
        );
    }

    #[test]
    fn test_arithmetic() {
        let ctx = context();
        let s = shared();
        assert_eq!(evaluate(&binary(BinaryOperator::Add, "2", "3"), &ctx, &s).unwrap(), "5");
        assert_eq!(evaluate(&binary(BinaryOperator::Mul, "2.5", "2"), &ctx, &s).unwrap(), "5");
        assert_eq!(evaluate(&binary(BinaryOperator::Div, "7", "2"), &ctx, &s).unwrap(), "3.5");
        assert_eq!(evaluate(&binary(BinaryOperator::Sub, "1", "4"), &ctx, &s).unwrap(), "-3");
    }

    #[test]
    fn test_plus_concatenates_strings() {
        assert_eq!(
            evaluate(&binary(BinaryOperator::Add, "app-", "v1"), &context(), &shared()).unwrap(),
            "app-v1"
        );
    }

    #[test]
    fn test_division_by_zero() {
        let err = evaluate(&binary(BinaryOperator::Div, "1", "0"), &context(), &shared()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
    }

    #[test]
    fn test_non_numeric_arithmetic_is_type_error() {
        let err = evaluate(&binary(BinaryOperator::Mul, "a", "2"), &context(), &shared()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_comparisons() {
        let ctx = context();
        let s = shared();
        assert_eq!(evaluate(&binary(BinaryOperator::Lt, "9", "10"), &ctx, &s).unwrap(), "true");
        // lexicographic when not numeric
        assert_eq!(evaluate(&binary(BinaryOperator::Lt, "9a", "10a"), &ctx, &s).unwrap(), "false");
        assert_eq!(evaluate(&binary(BinaryOperator::Eq, "abc", "abc"), &ctx, &s).unwrap(), "true");
    }

    #[test]
    fn test_now_function() {
        let expr = Expression::FunctionCall {
            name: "now".to_string(),
            args: vec![],
        };
        let value = evaluate(&expr, &context(), &shared()).unwrap();
        assert!(value.parse::<i64>().is_ok());
    }

    #[test]
    fn test_function_call_dry_run_placeholder() {
        let launcher = Arc::new(SystemShellLauncher::new());
        let s = EngineShared {
            launcher: launcher.clone(),
            detector: Arc::new(SystemToolDetector::new(launcher)),
            fetcher: Arc::new(LocalIncludeFetcher::new()),
            output: Output::stdout(),
            config: RunConfig {
                dry_run: true,
                ..Default::default()
            },
            cancel: CancelToken::new(),
        };
        let expr = Expression::FunctionCall {
            name: "uuidgen".to_string(),
            args: vec![],
        };
        assert_eq!(evaluate(&expr, &context(), &s).unwrap(), DRY_RUN_VALUE);
    }
}
