//! Dependency Resolution
//!
//! Orders a task's transitive `depends on` closure with an iterative
//! depth-first topological sort. `visiting` tracks the active chain for
//! cycle reporting; `visited` dedups shared dependencies so the first
//! occurrence wins. Dependencies are traversed in declaration order and
//! the target task comes last.

use std::collections::HashSet;

use indexmap::IndexMap;

use super::errors::{EngineError, ErrorKind};
use crate::ast::types::TaskNode;

enum Frame {
    Enter(String),
    Exit(String),
}

/// A dependency declared inside a namespaced task refers to a sibling in
/// the same namespace first, then to a top-level task.
fn resolve_dep_name(current: &str, dep: &str, tasks: &IndexMap<String, TaskNode>) -> String {
    if let Some((namespace, _)) = current.rsplit_once('.') {
        let namespaced = format!("{}.{}", namespace, dep);
        if tasks.contains_key(&namespaced) {
            return namespaced;
        }
    }
    dep.to_string()
}

/// Resolve the execution order for `target`: `[T1, ..., Tn, target]` with
/// no duplicates.
pub fn resolve_order(
    target: &str,
    tasks: &IndexMap<String, TaskNode>,
) -> Result<Vec<String>, EngineError> {
    let mut order = Vec::new();
    let mut visiting: HashSet<String> = HashSet::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut path: Vec<String> = Vec::new();
    let mut stack = vec![Frame::Enter(target.to_string())];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(name) => {
                if visited.contains(&name) {
                    continue;
                }
                if visiting.contains(&name) {
                    let start = path.iter().position(|p| p == &name).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].to_vec();
                    cycle.push(name.clone());
                    return Err(EngineError::new(
                        ErrorKind::CircularDependency,
                        format!("circular dependency detected: {}", cycle.join(" -> ")),
                    ));
                }
                let task = tasks.get(&name).ok_or_else(|| {
                    EngineError::not_found(format!("unknown task in dependency chain: {}", name))
                })?;

                visiting.insert(name.clone());
                path.push(name.clone());
                stack.push(Frame::Exit(name.clone()));
                // Reverse push so declaration order pops first
                for dep in task.depends_on.iter().rev() {
                    stack.push(Frame::Enter(resolve_dep_name(&name, dep, tasks)));
                }
            }
            Frame::Exit(name) => {
                visiting.remove(&name);
                path.pop();
                visited.insert(name.clone());
                order.push(name);
            }
        }
    }

    Ok(order)
}
