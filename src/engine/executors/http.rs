//! HTTP Executor
//!
//! Renders the request as the equivalent `curl` invocation. The response
//! status is read from a trailing `%{http_code}` marker; non-2xx raises
//! unless `allow failure` is set. `capture response as $x` binds the body.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::ast::types::{HttpAuth, HttpNode};
use crate::engine::context::ExecutionContext;
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::{EngineError, ErrorKind};
use crate::engine::interpolation::interpolate;
use crate::engine::output::DRY_RUN_CAPTURE;

use super::shell_quote;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const STATUS_MARKER: &str = "\n__DRUN_STATUS__:";

pub fn execute(
    runner: &StatementRunner,
    ctx: &mut ExecutionContext,
    node: &HttpNode,
) -> Result<(), EngineError> {
    let shared = runner.shared();
    let url = interpolate(&node.url, ctx, shared)?;
    let method = node.method.to_uppercase();
    let timeout_secs = node.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

    let mut parts = vec![format!(
        "curl -sS -X {} -w {}",
        method,
        shell_quote(&format!("{}%{{http_code}}", STATUS_MARKER))
    )];
    parts.push(format!("--max-time {}", timeout_secs));

    for (key, value) in &node.headers {
        let value = interpolate(value, ctx, shared)?;
        parts.push(format!("-H {}", shell_quote(&format!("{}: {}", key, value))));
    }
    match &node.auth {
        Some(HttpAuth::Bearer { token }) => {
            let token = interpolate(token, ctx, shared)?;
            parts.push(format!(
                "-H {}",
                shell_quote(&format!("Authorization: Bearer {}", token))
            ));
        }
        Some(HttpAuth::Basic { user, password }) => {
            let user = interpolate(user, ctx, shared)?;
            let password = interpolate(password, ctx, shared)?;
            let encoded = BASE64.encode(format!("{}:{}", user, password));
            parts.push(format!(
                "-H {}",
                shell_quote(&format!("Authorization: Basic {}", encoded))
            ));
        }
        None => {}
    }
    if let Some(ref body) = node.body {
        let body = interpolate(body, ctx, shared)?;
        if node.json_body {
            parts.push("-H 'Content-Type: application/json'".to_string());
        }
        parts.push(format!("--data {}", shell_quote(&body)));
    }
    parts.push(shell_quote(&url));
    let command = parts.join(" ");

    if shared.config.dry_run {
        shared.output.dry_run(&command);
        if let Some(ref target) = node.capture_as {
            ctx.set_variable(target.clone(), DRY_RUN_CAPTURE);
        }
        return Ok(());
    }
    if shared.config.verbose {
        shared.output.line(&format!("$ {}", command));
    }

    // Launcher timeout slightly above curl's own so curl reports first
    let response = shared.run_script(ctx, &command, Some(Duration::from_secs(timeout_secs + 5)))?;
    if !response.success {
        return Err(EngineError::new(
            ErrorKind::Http,
            format!("request failed: {}", response.stderr.trim()),
        )
        .with_command(url)
        .with_exit_code(response.exit_code));
    }

    let (body, status) = split_status(&response.stdout);
    let ok = (200..300).contains(&status);
    if !ok && !node.allow_failure {
        return Err(EngineError::new(
            ErrorKind::Http,
            format!("{} {} returned status {}", method, url, status),
        )
        .with_command(url)
        .with_exit_code(status as i32));
    }

    if let Some(ref target) = node.capture_as {
        ctx.set_variable(target.clone(), body.trim().to_string());
    }
    if shared.config.verbose {
        shared.output.info(&format!("{} {} -> {}", method, url, status));
    }
    Ok(())
}

/// Split the curl output into body and the trailing status marker.
fn split_status(stdout: &str) -> (&str, u16) {
    match stdout.rsplit_once(STATUS_MARKER) {
        Some((body, status)) => (body, status.trim().parse().unwrap_or(0)),
        None => (stdout, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::RunConfig;
    use crate::engine::testing::{dry_run_runner, harness, RecordingLauncher, TestHarness};
    use crate::runner::shell::ShellResponse;
    use std::sync::Arc;

    fn get_node(url: &str, capture_as: Option<&str>) -> HttpNode {
        HttpNode {
            method: "get".to_string(),
            url: url.to_string(),
            capture_as: capture_as.map(str::to_string),
            ..Default::default()
        }
    }

    fn responding(stdout: &str) -> Arc<RecordingLauncher> {
        Arc::new(RecordingLauncher::ok("").queue(vec![ShellResponse {
            stdout: stdout.to_string(),
            success: true,
            ..Default::default()
        }]))
    }

    #[test]
    fn test_get_captures_body_on_2xx() {
        let launcher = responding("{\"ok\":true}\n__DRUN_STATUS__:200");
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher.clone(), RunConfig::default());
        execute(&runner, &mut ctx, &get_node("https://api.test/health", Some("$body"))).unwrap();
        assert_eq!(ctx.get_variable("$body"), Some("{\"ok\":true}"));
        let launched = launcher.launched();
        assert!(launched[0].starts_with("curl -sS -X GET"));
        assert!(launched[0].contains("--max-time 30"));
    }

    #[test]
    fn test_non_2xx_raises_http_error() {
        let launcher = responding("missing\n__DRUN_STATUS__:404");
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher, RunConfig::default());
        let err = execute(&runner, &mut ctx, &get_node("https://api.test/ghost", None)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Http);
        assert!(err.message.contains("404"));
    }

    #[test]
    fn test_allow_failure_tolerates_non_2xx() {
        let launcher = responding("nope\n__DRUN_STATUS__:500");
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher, RunConfig::default());
        let node = HttpNode {
            allow_failure: true,
            ..get_node("https://api.test/flaky", Some("$out"))
        };
        execute(&runner, &mut ctx, &node).unwrap();
        assert_eq!(ctx.get_variable("$out"), Some("nope"));
    }

    #[test]
    fn test_post_with_json_body_and_bearer() {
        let launcher = responding("created\n__DRUN_STATUS__:201");
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher.clone(), RunConfig::default());
        ctx.set_variable("$token", "t0ps3cret");
        let node = HttpNode {
            method: "post".to_string(),
            url: "https://api.test/items".to_string(),
            body: Some("{\"name\":\"x\"}".to_string()),
            json_body: true,
            auth: Some(HttpAuth::Bearer {
                token: "{$token}".to_string(),
            }),
            ..Default::default()
        };
        execute(&runner, &mut ctx, &node).unwrap();
        let command = launcher.launched().remove(0);
        assert!(command.contains("Authorization: Bearer t0ps3cret"));
        assert!(command.contains("Content-Type: application/json"));
        assert!(command.contains("--data"));
    }

    #[test]
    fn test_basic_auth_is_base64_encoded() {
        let launcher = responding("ok\n__DRUN_STATUS__:200");
        let TestHarness {
            runner, mut ctx, ..
        } = harness(launcher.clone(), RunConfig::default());
        let node = HttpNode {
            auth: Some(HttpAuth::Basic {
                user: "admin".to_string(),
                password: "secret".to_string(),
            }),
            ..get_node("https://api.test", None)
        };
        execute(&runner, &mut ctx, &node).unwrap();
        let command = launcher.launched().remove(0);
        assert!(command.contains(&BASE64.encode("admin:secret")));
    }

    #[test]
    fn test_dry_run_binds_placeholder() {
        let TestHarness {
            runner,
            mut ctx,
            capture,
        } = dry_run_runner();
        execute(&runner, &mut ctx, &get_node("https://api.test", Some("$r"))).unwrap();
        assert!(capture.contents().contains("[DRY RUN] curl"));
        assert_eq!(ctx.get_variable("$r"), Some(DRY_RUN_CAPTURE));
    }
}
