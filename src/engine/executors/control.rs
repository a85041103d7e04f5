//! Control Flow Executor
//!
//! Conditionals run their branch against the enclosing scope, so variable
//! writes persist. Loops clone a child context per iteration, so the loop
//! variable and any iteration writes vanish when the loop ends. `break`
//! and `continue` travel as control-flow signals and are intercepted
//! here.
//!
//! Parallel loops fan out to a bounded worker pool: workers pull
//! iteration indices from a shared queue, run the body against their own
//! child context with a private output buffer (flushed as a contiguous
//! block per iteration), and report into a first-error sink. Workers run
//! to completion; there is no pre-emption.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use regex_lite::Regex;

use crate::ast::types::{ConditionalNode, ForNode, LoopMode, LoopSource};
use crate::engine::conditions::eval_condition;
use crate::engine::config::EngineShared;
use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::{EngineError, ErrorKind};
use crate::engine::expression::evaluate;
use crate::engine::interpolation::interpolate;
use crate::engine::output::Output;
use crate::engine::value::split_list;

pub fn execute_conditional(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &ConditionalNode,
) -> Result<(), EngineError> {
    if eval_condition(&node.condition, ctx, runner.shared())? {
        runner.run_statements(ctx, &node.then_body)
    } else {
        runner.run_statements(ctx, &node.else_body)
    }
}

pub fn execute_for(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &ForNode,
) -> Result<(), EngineError> {
    let items = collect_items(runner, ctx, node)?;
    let items = apply_filter(runner, ctx, node, items)?;
    match node.mode {
        LoopMode::Sequential => run_sequential(runner, ctx, node, items),
        LoopMode::Parallel => run_parallel(runner, ctx, node, items),
    }
}

/// Materialize the iteration values for a loop source.
fn collect_items(
    runner: &StatementRunner,
    ctx: &ExecutionContext,
    node: &ForNode,
) -> Result<Vec<String>, EngineError> {
    let shared = runner.shared();
    match &node.source {
        LoopSource::Items { expression } => {
            let value = evaluate(expression, ctx, shared)?;
            let trimmed = value.trim();
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                Ok(split_list(trimmed))
            } else {
                Ok(trimmed.split_whitespace().map(str::to_string).collect())
            }
        }
        LoopSource::Range { start, end, step } => {
            let start = parse_integer(&evaluate(start, ctx, shared)?)?;
            let end = parse_integer(&evaluate(end, ctx, shared)?)?;
            let step = match step {
                Some(expr) => parse_integer(&evaluate(expr, ctx, shared)?)?,
                None => {
                    if start <= end {
                        1
                    } else {
                        -1
                    }
                }
            };
            if step == 0 {
                return Err(EngineError::type_error("range step must not be zero"));
            }
            let mut items = Vec::new();
            let mut current = start;
            while (step > 0 && current <= end) || (step < 0 && current >= end) {
                items.push(current.to_string());
                current += step;
            }
            Ok(items)
        }
        LoopSource::Lines { source } => {
            let text = interpolate(source, ctx, shared)?;
            Ok(text
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect())
        }
        LoopSource::Matches { source, pattern } => {
            let text = interpolate(source, ctx, shared)?;
            let pattern = interpolate(pattern, ctx, shared)?;
            let regex = Regex::new(&pattern).map_err(|e| {
                EngineError::type_error(format!("invalid pattern '{}': {}", pattern, e))
            })?;
            Ok(regex
                .find_iter(&text)
                .map(|m| m.as_str().to_string())
                .collect())
        }
    }
}

fn parse_integer(text: &str) -> Result<i64, EngineError> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| EngineError::type_error(format!("range bound '{}' is not numeric", text)))?;
    Ok(value as i64)
}

/// Apply the loop's `where` filter with the loop variable bound per item.
fn apply_filter(
    runner: &StatementRunner,
    ctx: &ExecutionContext,
    node: &ForNode,
    items: Vec<String>,
) -> Result<Vec<String>, EngineError> {
    let condition = match &node.filter {
        Some(condition) => condition,
        None => return Ok(items),
    };
    let mut kept = Vec::new();
    for item in items {
        let mut probe = ctx.child();
        probe.set_variable(node.variable.clone(), item.clone());
        if eval_condition(condition, &probe, runner.shared())? {
            kept.push(item);
        }
    }
    Ok(kept)
}

fn run_sequential(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &ForNode,
    items: Vec<String>,
) -> Result<(), EngineError> {
    for item in items {
        runner.shared().cancel.check()?;
        let mut child = ctx.child();
        child.set_variable(node.variable.clone(), item);
        match runner.run_statements(&mut child, &node.body) {
            Ok(()) => {}
            Err(err) if err.kind == ErrorKind::Break => break,
            Err(err) if err.kind == ErrorKind::Continue => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn run_parallel(
    runner: &StatementRunner,
    ctx: &ExecutionContext,
    node: &ForNode,
    items: Vec<String>,
) -> Result<(), EngineError> {
    if items.is_empty() {
        return Ok(());
    }
    let shared = runner.shared();
    let cap = shared.config.max_workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    });
    let workers = items.len().min(cap.max(1));

    let next = AtomicUsize::new(0);
    let first_error: Mutex<Option<EngineError>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= items.len() {
                        break;
                    }
                    if shared.cancel.is_cancelled() {
                        record_error(&first_error, EngineError::cancelled());
                        break;
                    }

                    // Private output per iteration, flushed as one block
                    let (buffered, capture) = Output::memory();
                    let worker_shared = EngineShared {
                        output: buffered,
                        ..runner.shared().clone()
                    };
                    let worker_runner = StatementRunner::new(Arc::new(worker_shared));

                    let mut child = ctx.child();
                    child.set_variable(node.variable.clone(), items[index].clone());
                    let result = worker_runner.run_statements(&mut child, &node.body);

                    let text = capture.contents();
                    if !text.is_empty() {
                        let lines: Vec<String> = text.lines().map(str::to_string).collect();
                        shared.output.block(&lines);
                    }

                    match result {
                        Ok(()) => {}
                        // break/continue end their own iteration only
                        Err(err) if err.is_control_flow() => {}
                        Err(err) => record_error(&first_error, err),
                    }
                }
            });
        }
    });

    match first_error.into_inner().unwrap() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn record_error(sink: &Mutex<Option<EngineError>>, err: EngineError) {
    let mut guard = sink.lock().unwrap();
    if guard.is_none() {
        *guard = Some(err);
    }
}
