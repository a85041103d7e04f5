//! Network Executor
//!
//! Probes: HTTP health checks via `curl`, port checks via `nc`, `ping`,
//! and wait-for-service polling. A probe with a capture target binds a
//! status string instead of raising; without one, an unreachable target
//! is a network error. Timeouts follow the engine defaults.

use std::time::{Duration, Instant};

use crate::ast::types::{NetworkNode, NetworkOperation};
use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::{EngineError, ErrorKind};
use crate::engine::interpolation::interpolate;

use super::shell_quote;

const HEALTH_TIMEOUT_SECS: u64 = 10;
const PORT_TIMEOUT_SECS: u64 = 5;
const WAIT_TOTAL_SECS: u64 = 60;
const WAIT_POLL_SECS: u64 = 2;

const STATUS_HEALTHY: &str = "healthy";
const STATUS_UNHEALTHY: &str = "unhealthy";

pub fn execute(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &NetworkNode,
) -> Result<(), EngineError> {
    let shared = runner.shared();
    let target = interpolate(&node.target, ctx, shared)?;
    let port = match &node.port {
        Some(port) => Some(interpolate(port, ctx, shared)?),
        None => None,
    };

    match node.operation {
        NetworkOperation::HealthCheck => {
            let timeout = node.timeout_secs.unwrap_or(HEALTH_TIMEOUT_SECS);
            let command = health_command(&target, timeout);
            probe(runner, ctx, node, &command, &target, timeout)
        }
        NetworkOperation::PortCheck => {
            let timeout = node.timeout_secs.unwrap_or(PORT_TIMEOUT_SECS);
            let command = port_command(&target, port.as_deref(), timeout)?;
            probe(runner, ctx, node, &command, &target, timeout)
        }
        NetworkOperation::Ping => {
            let timeout = node.timeout_secs.unwrap_or(PORT_TIMEOUT_SECS);
            let command = format!("ping -c 1 -W {} {}", timeout, shell_quote(&target));
            probe(runner, ctx, node, &command, &target, timeout)
        }
        NetworkOperation::WaitForService => {
            wait_for_service(runner, ctx, node, &target, port.as_deref())
        }
    }
}

fn health_command(target: &str, timeout: u64) -> String {
    format!(
        "curl -fsS -o /dev/null --max-time {} {}",
        timeout,
        shell_quote(target)
    )
}

fn port_command(target: &str, port: Option<&str>, timeout: u64) -> Result<String, EngineError> {
    let port = port.ok_or_else(|| {
        EngineError::new(
            ErrorKind::Network,
            format!("port check on '{}' requires a port", target),
        )
    })?;
    Ok(format!(
        "nc -z -w {} {} {}",
        timeout,
        shell_quote(target),
        shell_quote(port)
    ))
}

/// Run a single probe command. Capture targets observe the status; bare
/// probes raise on failure.
fn probe(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &NetworkNode,
    command: &str,
    target: &str,
    timeout: u64,
) -> Result<(), EngineError> {
    let shared = runner.shared();
    if shared.config.dry_run {
        shared.output.dry_run(command);
        if let Some(ref capture_as) = node.capture_as {
            ctx.set_variable(capture_as.clone(), STATUS_HEALTHY);
        }
        return Ok(());
    }
    if shared.config.verbose {
        shared.output.line(&format!("$ {}", command));
    }

    let response = shared.run_script(ctx, command, Some(Duration::from_secs(timeout + 2)))?;
    let healthy = response.success;

    if let Some(ref capture_as) = node.capture_as {
        ctx.set_variable(
            capture_as.clone(),
            if healthy { STATUS_HEALTHY } else { STATUS_UNHEALTHY },
        );
        return Ok(());
    }
    if !healthy {
        return Err(EngineError::new(
            ErrorKind::Network,
            format!("'{}' is not reachable", target),
        )
        .with_command(command.to_string())
        .with_exit_code(response.exit_code));
    }
    shared.output.success(&format!("{} is reachable", target));
    Ok(())
}

/// Poll until the service answers or the total timeout elapses.
fn wait_for_service(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &NetworkNode,
    target: &str,
    port: Option<&str>,
) -> Result<(), EngineError> {
    let shared = runner.shared();
    let total = Duration::from_secs(node.timeout_secs.unwrap_or(WAIT_TOTAL_SECS));
    let poll = Duration::from_secs(WAIT_POLL_SECS);

    let command = if target.starts_with("http://") || target.starts_with("https://") {
        health_command(target, WAIT_POLL_SECS)
    } else {
        port_command(target, port, WAIT_POLL_SECS)?
    };

    if shared.config.dry_run {
        shared.output.dry_run(&format!("wait for {} ({})", target, command));
        return Ok(());
    }

    let started = Instant::now();
    loop {
        shared.cancel.check()?;
        let response = shared.run_script(ctx, &command, Some(poll + Duration::from_secs(2)))?;
        if response.success {
            shared
                .output
                .success(&format!("{} is ready after {:.0?}", target, started.elapsed()));
            return Ok(());
        }
        if started.elapsed() >= total {
            return Err(EngineError::timeout(format!(
                "service '{}' not ready after {:.0?}",
                target, total
            ))
            .with_command(command));
        }
        std::thread::sleep(poll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::RunConfig;
    use crate::engine::testing::{harness, RecordingLauncher, TestHarness};
    use crate::runner::shell::ShellResponse;
    use std::sync::Arc;

    fn node(operation: NetworkOperation, target: &str) -> NetworkNode {
        NetworkNode {
            operation,
            target: target.to_string(),
            port: None,
            timeout_secs: None,
            capture_as: None,
            line: 1,
        }
    }

    #[test]
    fn test_health_check_success() {
        let launcher = Arc::new(RecordingLauncher::ok(""));
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher.clone(), RunConfig::default());
        execute(
            &runner,
            &mut ctx,
            &node(NetworkOperation::HealthCheck, "https://svc.test/health"),
        )
        .unwrap();
        let launched = launcher.launched().remove(0);
        assert!(launched.starts_with("curl -fsS -o /dev/null --max-time 10"));
    }

    #[test]
    fn test_unreachable_without_capture_is_error() {
        let launcher = Arc::new(RecordingLauncher::failing(7, "connection refused"));
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher, RunConfig::default());
        let err = execute(
            &runner,
            &mut ctx,
            &node(NetworkOperation::HealthCheck, "https://down.test"),
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
    }

    #[test]
    fn test_capture_binds_status_instead_of_raising() {
        let launcher = Arc::new(RecordingLauncher::failing(7, ""));
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher, RunConfig::default());
        let mut n = node(NetworkOperation::HealthCheck, "https://down.test");
        n.capture_as = Some("$status".to_string());
        execute(&runner, &mut ctx, &n).unwrap();
        assert_eq!(ctx.get_variable("$status"), Some("unhealthy"));
    }

    #[test]
    fn test_port_check_requires_port() {
        let launcher = Arc::new(RecordingLauncher::ok(""));
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher, RunConfig::default());
        let err = execute(&runner, &mut ctx, &node(NetworkOperation::PortCheck, "db.test"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
    }

    #[test]
    fn test_wait_for_service_polls_until_ready() {
        let launcher = Arc::new(RecordingLauncher::ok("").queue(vec![
            ShellResponse {
                exit_code: 1,
                success: false,
                ..Default::default()
            },
            ShellResponse {
                success: true,
                ..Default::default()
            },
        ]));
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher.clone(), RunConfig::default());
        let mut n = node(NetworkOperation::WaitForService, "http://svc.test/ready");
        n.timeout_secs = Some(30);
        execute(&runner, &mut ctx, &n).unwrap();
        assert_eq!(launcher.launched().len(), 2);
    }
}
