//! Parameter Values
//!
//! Typed values for task and project parameters. All other runtime
//! variables are string-valued; numeric semantics are parsed on demand.

use serde::{Deserialize, Serialize};

use super::errors::{EngineError, ErrorKind};
use crate::ast::types::ParameterType;

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    List(Vec<String>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::List(_) => "list",
        }
    }

    /// Render for interpolation. Lists are whitespace-joined so operation
    /// chains and loop splitting see them as token arrays.
    pub fn render(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Boolean(b) => b.to_string(),
            Value::List(items) => items.join(" "),
        }
    }

    /// Coerce a raw input string to the declared parameter type.
    pub fn coerce(input: &str, param_type: ParameterType, name: &str) -> Result<Value, EngineError> {
        match param_type {
            ParameterType::String => Ok(Value::String(input.to_string())),
            ParameterType::Integer => input.trim().parse::<i64>().map(Value::Integer).map_err(|_| {
                EngineError::new(
                    ErrorKind::Type,
                    format!("parameter '{}' expects an integer, got '{}'", name, input),
                )
            }),
            ParameterType::Number => input.trim().parse::<f64>().map(Value::Number).map_err(|_| {
                EngineError::new(
                    ErrorKind::Type,
                    format!("parameter '{}' expects a number, got '{}'", name, input),
                )
            }),
            ParameterType::Boolean => match input.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(EngineError::new(
                    ErrorKind::Type,
                    format!("parameter '{}' expects true or false, got '{}'", name, input),
                )),
            },
            ParameterType::List => Ok(Value::List(split_list(input))),
        }
    }
}

/// Format a float the way expression arithmetic reports results: integers
/// without a decimal point, everything else shortest-round-trip.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Split a list literal: `[a,b,c]` or bare comma-separated. Items are
/// trimmed and surrounding quotes stripped.
pub fn split_list(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    let inner = if trimmed.starts_with('[') && trimmed.ends_with(']') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    if inner.trim().is_empty() {
        return Vec::new();
    }
    inner
        .split(',')
        .map(|item| item.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
