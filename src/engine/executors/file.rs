//! File Executor
//!
//! File operations are rendered as the equivalent shell commands
//! (`mkdir -p`, `cp -r`, `mv`, `rm`, heredoc writes, `cat`) so dry-run
//! can print exactly what would run.

use crate::ast::types::{FileNode, FileOperation};
use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::{EngineError, ErrorKind};
use crate::engine::interpolation::interpolate;
use crate::engine::output::DRY_RUN_CAPTURE;

use std::time::Duration;

use super::{run_tool_command, shell_quote};

const HEREDOC_TAG: &str = "DRUN_EOF";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub fn execute(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &FileNode,
) -> Result<(), EngineError> {
    let shared = runner.shared();
    let path = interpolate(&node.path, ctx, shared)?;
    let target = match &node.target {
        Some(target) => Some(interpolate(target, ctx, shared)?),
        None => None,
    };
    let content = match &node.content {
        Some(content) => Some(interpolate(content, ctx, shared)?),
        None => None,
    };

    let timeout = match node.operation {
        FileOperation::Download => Some(DOWNLOAD_TIMEOUT),
        _ => None,
    };
    let command = build_command(node, &path, target.as_deref(), content.as_deref())?;
    let response = run_tool_command(runner, ctx, &command, ErrorKind::File, timeout)?;

    if node.operation == FileOperation::Read {
        if let Some(ref capture_as) = node.capture_as {
            match response {
                Some(response) => {
                    ctx.set_variable(capture_as.clone(), response.stdout.trim_end().to_string())
                }
                None => ctx.set_variable(capture_as.clone(), DRY_RUN_CAPTURE),
            }
        }
    }
    Ok(())
}

fn build_command(
    node: &FileNode,
    path: &str,
    target: Option<&str>,
    content: Option<&str>,
) -> Result<String, EngineError> {
    let quoted = shell_quote(path);
    let command = match node.operation {
        FileOperation::Create => {
            if node.is_directory {
                format!("mkdir -p {}", quoted)
            } else {
                format!("touch {}", quoted)
            }
        }
        FileOperation::Copy => {
            let target = require_target(node, target)?;
            format!("cp -r {} {}", quoted, shell_quote(target))
        }
        FileOperation::Move => {
            let target = require_target(node, target)?;
            format!("mv {} {}", quoted, shell_quote(target))
        }
        FileOperation::Delete => {
            if node.is_directory {
                format!("rm -rf {}", quoted)
            } else {
                format!("rm -f {}", quoted)
            }
        }
        FileOperation::Write => heredoc(">", &quoted, content.unwrap_or("")),
        FileOperation::Append => heredoc(">>", &quoted, content.unwrap_or("")),
        FileOperation::Read => format!("cat {}", quoted),
        FileOperation::Download => {
            let target = require_target(node, target)?;
            format!("curl -fsSL -o {} {}", shell_quote(target), quoted)
        }
    };
    Ok(command)
}

fn require_target<'a>(node: &FileNode, target: Option<&'a str>) -> Result<&'a str, EngineError> {
    target.ok_or_else(|| {
        EngineError::new(
            ErrorKind::File,
            format!("file operation on '{}' requires a target path", node.path),
        )
    })
}

/// Quoted heredoc keeps the content byte-for-byte.
fn heredoc(redirect: &str, quoted_path: &str, content: &str) -> String {
    format!(
        "cat {} {} << '{}'\n{}\n{}",
        redirect, quoted_path, HEREDOC_TAG, content, HEREDOC_TAG
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::RunConfig;
    use crate::engine::testing::{dry_run_runner, harness, RecordingLauncher, TestHarness};
    use std::sync::Arc;

    fn node(operation: FileOperation, path: &str) -> FileNode {
        FileNode {
            operation,
            path: path.to_string(),
            target: None,
            content: None,
            is_directory: false,
            capture_as: None,
            line: 1,
        }
    }

    #[test]
    fn test_create_directory() {
        let launcher = Arc::new(RecordingLauncher::ok(""));
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher.clone(), RunConfig::default());
        let mut n = node(FileOperation::Create, "build/out");
        n.is_directory = true;
        execute(&runner, &mut ctx, &n).unwrap();
        assert_eq!(launcher.launched(), vec!["mkdir -p build/out"]);
    }

    #[test]
    fn test_copy_requires_target() {
        let launcher = Arc::new(RecordingLauncher::ok(""));
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher, RunConfig::default());
        let err = execute(&runner, &mut ctx, &node(FileOperation::Copy, "a.txt")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::File);
    }

    #[test]
    fn test_write_uses_quoted_heredoc() {
        let launcher = Arc::new(RecordingLauncher::ok(""));
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher.clone(), RunConfig::default());
        let mut n = node(FileOperation::Write, "conf/app.env");
        n.content = Some("MODE=prod\nDEBUG=false".to_string());
        execute(&runner, &mut ctx, &n).unwrap();
        let launched = launcher.launched().remove(0);
        assert!(launched.starts_with("cat > conf/app.env << 'DRUN_EOF'"));
        assert!(launched.contains("MODE=prod\nDEBUG=false"));
        assert!(launched.ends_with("DRUN_EOF"));
    }

    #[test]
    fn test_read_captures_contents() {
        let launcher = Arc::new(RecordingLauncher::ok("v1.2.3\n"));
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher, RunConfig::default());
        let mut n = node(FileOperation::Read, "VERSION");
        n.capture_as = Some("$version".to_string());
        execute(&runner, &mut ctx, &n).unwrap();
        assert_eq!(ctx.get_variable("$version"), Some("v1.2.3"));
    }

    #[test]
    fn test_download_builds_curl_command() {
        let launcher = Arc::new(RecordingLauncher::ok(""));
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher.clone(), RunConfig::default());
        let mut n = node(FileOperation::Download, "https://releases.test/tool.tar.gz");
        n.target = Some("/tmp/tool.tar.gz".to_string());
        execute(&runner, &mut ctx, &n).unwrap();
        assert_eq!(
            launcher.launched(),
            vec!["curl -fsSL -o /tmp/tool.tar.gz https://releases.test/tool.tar.gz"]
        );
    }

    #[test]
    fn test_dry_run_prints_command() {
        let TestHarness {
            runner,
            mut ctx,
            capture,
        } = dry_run_runner();
        let mut n = node(FileOperation::Delete, "dist");
        n.is_directory = true;
        execute(&runner, &mut ctx, &n).unwrap();
        assert!(capture.contents().contains("[DRY RUN] rm -rf dist"));
    }
}
