//! Interpolation
//!
//! Expands `{EXPR}` placeholders in strings. `EXPR` is a plain identifier,
//! a `$name` variable, a namespaced `ns.name`, a builtin (`now`,
//! `hostname`, `env VAR`, `current git branch`, ...), or any of those
//! followed by pipe operations.
//!
//! Expansion is single-pass: the result of one expansion is never
//! rescanned, so placeholder values cannot explode into further
//! expansions. `\{` emits a literal `{`.

use std::time::Duration;

use chrono::{Local, Utc};

use super::config::EngineShared;
use super::context::ExecutionContext;
use super::errors::EngineError;
use super::operations::{apply_chain, parse_operation, Operation};

const BUILTIN_TIMEOUT: Duration = Duration::from_secs(10);
/// Shell-backed builtins and function calls resolve to this in dry-run.
pub const DRY_RUN_VALUE: &str = "dry-run";

/// Expand all placeholders in `text`.
///
/// Unresolved references either reproduce the literal `{EXPR}` text (when
/// `allow_undefined` is set) or raise an undefined-variable error.
pub fn interpolate(
    text: &str,
    ctx: &ExecutionContext,
    shared: &EngineShared,
) -> Result<String, EngineError> {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'{') => {
                chars.next();
                result.push('{');
            }
            '{' => {
                let mut expr = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    expr.push(inner);
                }
                if !closed {
                    // No closing brace; emit the rest verbatim
                    result.push('{');
                    result.push_str(&expr);
                    break;
                }
                match expand_expr(&expr, ctx, shared)? {
                    Some(value) => result.push_str(&value),
                    None if shared.config.allow_undefined => {
                        result.push('{');
                        result.push_str(&expr);
                        result.push('}');
                    }
                    None => return Err(EngineError::undefined_variable(expr.trim())),
                }
            }
            _ => result.push(ch),
        }
    }

    Ok(result)
}

/// Expand one placeholder expression: base reference plus pipe operations.
/// `Ok(None)` means the base could not be resolved.
fn expand_expr(
    expr: &str,
    ctx: &ExecutionContext,
    shared: &EngineShared,
) -> Result<Option<String>, EngineError> {
    let segments = split_pipes(expr);
    let (base, op_segments) = match segments.split_first() {
        Some((base, rest)) => (base.trim(), rest),
        None => return Ok(None),
    };
    if base.is_empty() {
        return Ok(None);
    }

    let ops: Vec<Operation> = op_segments
        .iter()
        .map(|segment| parse_operation(segment.trim()))
        .collect::<Result<_, _>>()?;

    let resolved = resolve_base(base, ctx, shared)?;
    match resolved {
        Some(value) => Ok(Some(apply_chain(&value, &ops)?)),
        None => Ok(None),
    }
}

/// Resolve a placeholder base reference.
fn resolve_base(
    base: &str,
    ctx: &ExecutionContext,
    shared: &EngineShared,
) -> Result<Option<String>, EngineError> {
    if base.starts_with('$') {
        return Ok(ctx.get_variable(base).map(str::to_string));
    }
    if let Some(value) = resolve_identifier(base, ctx) {
        return Ok(Some(value));
    }
    builtin(base, shared)
}

/// Lookup chain for a bare identifier: parameters → variables → project
/// settings → project parameter defaults. Builtins come last and are
/// handled by the caller.
pub(crate) fn resolve_identifier(name: &str, ctx: &ExecutionContext) -> Option<String> {
    if let Some(value) = ctx.get_parameter(name) {
        return Some(value.render());
    }
    if let Some(value) = ctx.get_variable(name) {
        return Some(value.to_string());
    }
    if let Some(value) = ctx.project.settings.get(name) {
        return Some(value.clone());
    }
    ctx.project.parameter_default(name).map(str::to_string)
}

/// Builtin placeholder values. Shell-backed builtins go through the
/// launcher; in dry-run they yield a fixed placeholder instead.
fn builtin(name: &str, shared: &EngineShared) -> Result<Option<String>, EngineError> {
    match name {
        "now" => Ok(Some(Utc::now().timestamp().to_string())),
        "today" => Ok(Some(Local::now().format("%Y-%m-%d").to_string())),
        "pwd" | "current dir" => Ok(std::env::current_dir()
            .ok()
            .map(|p| p.display().to_string())),
        "hostname" => shell_builtin("hostname", shared),
        "current git branch" => shell_builtin("git rev-parse --abbrev-ref HEAD", shared),
        "current git commit" => shell_builtin("git rev-parse --short HEAD", shared),
        _ => {
            if let Some(var) = name.strip_prefix("env ") {
                return Ok(std::env::var(var.trim()).ok());
            }
            Ok(None)
        }
    }
}

fn shell_builtin(script: &str, shared: &EngineShared) -> Result<Option<String>, EngineError> {
    if shared.config.dry_run {
        return Ok(Some(DRY_RUN_VALUE.to_string()));
    }
    let request = crate::runner::shell::ShellRequest {
        timeout: Some(BUILTIN_TIMEOUT),
        ..crate::runner::shell::ShellRequest::capture(script)
    };
    match shared.launcher.launch(&request, &shared.cancel) {
        Ok(response) if response.success => Ok(Some(response.stdout.trim().to_string())),
        _ => Ok(None),
    }
}

/// Split on `|` while honoring quotes, so operation arguments may contain
/// pipe characters.
fn split_pipes(expr: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in expr.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '|' => segments.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            },
        }
    }
    segments.push(current);
    segments
}
