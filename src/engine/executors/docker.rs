//! Docker Executor
//!
//! Assembles the equivalent `docker` command line from the statement's
//! interpolated options and runs it through the shell launcher.

use indexmap::IndexMap;

use crate::ast::types::DockerNode;
use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::{EngineError, ErrorKind};
use crate::engine::interpolation::interpolate;

use super::{run_tool_command, shell_quote};

pub fn execute(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &DockerNode,
) -> Result<(), EngineError> {
    let shared = runner.shared();
    let resource = match &node.resource {
        Some(resource) => Some(interpolate(resource, ctx, shared)?),
        None => None,
    };
    let mut options = IndexMap::new();
    for (key, value) in &node.options {
        options.insert(key.clone(), interpolate(value, ctx, shared)?);
    }

    let command = build_command(&node.operation, resource.as_deref(), &options)?;
    run_tool_command(runner, ctx, &command, ErrorKind::Docker, None)?;
    Ok(())
}

fn build_command(
    operation: &str,
    resource: Option<&str>,
    options: &IndexMap<String, String>,
) -> Result<String, EngineError> {
    let require = |what: &str| -> Result<&str, EngineError> {
        resource.ok_or_else(|| {
            EngineError::new(
                ErrorKind::Docker,
                format!("docker {} requires {}", operation, what),
            )
        })
    };

    let command = match operation {
        "build" => {
            let mut parts = vec!["docker build".to_string()];
            parts.push(format!("-t {}", shell_quote(require("an image tag")?)));
            if let Some(file) = options.get("file") {
                parts.push(format!("-f {}", shell_quote(file)));
            }
            if options.get("no_cache").map(String::as_str) == Some("true") {
                parts.push("--no-cache".to_string());
            }
            for (key, value) in options {
                if let Some(arg) = key.strip_prefix("build_arg.") {
                    parts.push(format!("--build-arg {}={}", arg, shell_quote(value)));
                }
            }
            let context = options.get("context").map(String::as_str).unwrap_or(".");
            parts.push(shell_quote(context));
            parts.join(" ")
        }
        "push" | "pull" => format!("docker {} {}", operation, shell_quote(require("an image")?)),
        "run" => {
            let mut parts = vec!["docker run".to_string()];
            if options.get("detach").map(String::as_str) == Some("true") {
                parts.push("-d".to_string());
            }
            if let Some(name) = options.get("name") {
                parts.push(format!("--name {}", shell_quote(name)));
            }
            if let Some(ports) = options.get("ports") {
                for port in ports.split_whitespace() {
                    parts.push(format!("-p {}", shell_quote(port)));
                }
            }
            if let Some(volumes) = options.get("volumes") {
                for volume in volumes.split_whitespace() {
                    parts.push(format!("-v {}", shell_quote(volume)));
                }
            }
            for (key, value) in options {
                if let Some(var) = key.strip_prefix("env.") {
                    parts.push(format!("-e {}={}", var, shell_quote(value)));
                }
            }
            parts.push(shell_quote(require("an image")?));
            if let Some(cmd) = options.get("command") {
                parts.push(cmd.clone());
            }
            parts.join(" ")
        }
        "stop" => format!("docker stop {}", shell_quote(require("a container")?)),
        "remove" => format!("docker rm -f {}", shell_quote(require("a container")?)),
        "compose up" => {
            let mut parts = vec!["docker compose".to_string()];
            if let Some(file) = options.get("file") {
                parts.push(format!("-f {}", shell_quote(file)));
            }
            parts.push("up".to_string());
            if options.get("detach").map(String::as_str) != Some("false") {
                parts.push("-d".to_string());
            }
            parts.join(" ")
        }
        "compose down" => {
            let mut parts = vec!["docker compose".to_string()];
            if let Some(file) = options.get("file") {
                parts.push(format!("-f {}", shell_quote(file)));
            }
            parts.push("down".to_string());
            parts.join(" ")
        }
        other => {
            let mut parts = vec![format!("docker {}", other)];
            if let Some(resource) = resource {
                parts.push(shell_quote(resource));
            }
            parts.join(" ")
        }
    };
    Ok(command)
}
