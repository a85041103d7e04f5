//! Git Executor
//!
//! Assembles `git` command lines from interpolated options. `status` can
//! capture its output into a variable.

use indexmap::IndexMap;

use crate::ast::types::GitNode;
use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::{EngineError, ErrorKind};
use crate::engine::interpolation::interpolate;
use crate::engine::output::DRY_RUN_CAPTURE;

use super::{run_tool_command, shell_quote};

pub fn execute(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &GitNode,
) -> Result<(), EngineError> {
    let shared = runner.shared();
    let mut options = IndexMap::new();
    for (key, value) in &node.options {
        options.insert(key.clone(), interpolate(value, ctx, shared)?);
    }

    let command = build_command(&node.operation, &options)?;
    let response = run_tool_command(runner, ctx, &command, ErrorKind::Git, None)?;

    if let Some(ref target) = node.capture_as {
        match response {
            Some(response) => {
                ctx.set_variable(target.clone(), response.stdout.trim().to_string())
            }
            // dry-run
            None => ctx.set_variable(target.clone(), DRY_RUN_CAPTURE),
        }
    }
    Ok(())
}

fn build_command(
    operation: &str,
    options: &IndexMap<String, String>,
) -> Result<String, EngineError> {
    let require = |key: &str| -> Result<&str, EngineError> {
        options.get(key).map(String::as_str).ok_or_else(|| {
            EngineError::new(
                ErrorKind::Git,
                format!("git {} requires option '{}'", operation, key),
            )
        })
    };

    let command = match operation {
        "clone" => {
            let mut parts = vec![format!("git clone {}", shell_quote(require("url")?))];
            if let Some(branch) = options.get("branch") {
                parts.push(format!("-b {}", shell_quote(branch)));
            }
            if let Some(depth) = options.get("depth") {
                parts.push(format!("--depth {}", shell_quote(depth)));
            }
            if let Some(directory) = options.get("directory") {
                parts.push(shell_quote(directory));
            }
            parts.join(" ")
        }
        "init" => match options.get("directory") {
            Some(directory) => format!("git init {}", shell_quote(directory)),
            None => "git init".to_string(),
        },
        "add" => {
            let paths = options.get("paths").map(String::as_str).unwrap_or(".");
            let quoted: Vec<String> = paths.split_whitespace().map(shell_quote).collect();
            format!("git add {}", quoted.join(" "))
        }
        "commit" => {
            let mut command = format!("git commit -m {}", shell_quote(require("message")?));
            if options.get("all").map(String::as_str) == Some("true") {
                command.push_str(" -a");
            }
            command
        }
        "push" => {
            let remote = options.get("remote").map(String::as_str).unwrap_or("origin");
            match options.get("branch") {
                Some(branch) => {
                    format!("git push {} {}", shell_quote(remote), shell_quote(branch))
                }
                None => format!("git push {}", shell_quote(remote)),
            }
        }
        "pull" => {
            let remote = options.get("remote").map(String::as_str).unwrap_or("origin");
            match options.get("branch") {
                Some(branch) => {
                    format!("git pull {} {}", shell_quote(remote), shell_quote(branch))
                }
                None => format!("git pull {}", shell_quote(remote)),
            }
        }
        "checkout" => {
            let branch = shell_quote(require("branch")?);
            if options.get("create").map(String::as_str) == Some("true") {
                format!("git checkout -b {}", branch)
            } else {
                format!("git checkout {}", branch)
            }
        }
        "status" => "git status --porcelain".to_string(),
        other => format!("git {}", other),
    };
    Ok(command)
}
