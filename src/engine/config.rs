//! Run Configuration & Shared Runtime
//!
//! `RunConfig` carries the per-run flags the CLI hands in; `EngineShared`
//! bundles the collaborators (launcher, detector, fetcher, output) with
//! the config and cancel token so executors and evaluators reach them
//! through one handle.

use std::sync::Arc;
use std::time::Duration;

use crate::engine::context::ExecutionContext;
use crate::engine::errors::EngineError;
use crate::engine::output::Output;
use crate::runner::shell::{host_platform, CancelToken, ShellRequest, ShellResponse};
use crate::runner::{IncludeFetcher, ShellLauncher, ToolDetector};

/// Engine flags for one run.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub dry_run: bool,
    pub verbose: bool,
    pub allow_undefined: bool,
    /// Explicit environment override; falls back to `DRUN_ENV`, then the
    /// detector heuristic
    pub environment: Option<String>,
    /// Parallel-loop worker cap; defaults to the CPU count
    pub max_workers: Option<usize>,
    pub cache_enabled: bool,
}

/// Collaborators and config shared across every executor in a run.
/// Cloning is shallow; parallel workers clone this to swap in a private
/// output buffer.
#[derive(Clone)]
pub struct EngineShared {
    pub launcher: Arc<dyn ShellLauncher>,
    pub detector: Arc<dyn ToolDetector>,
    pub fetcher: Arc<dyn IncludeFetcher>,
    pub output: Output,
    pub config: RunConfig,
    pub cancel: CancelToken,
}

impl EngineShared {
    /// Current environment name: explicit option, `DRUN_ENV`, detector.
    pub fn environment_name(&self) -> String {
        if let Some(ref env) = self.config.environment {
            return env.clone();
        }
        if let Ok(env) = std::env::var("DRUN_ENV") {
            if !env.is_empty() {
                return env;
            }
        }
        self.detector.environment()
    }

    /// Assemble a launch request using the project's shell config for the
    /// host platform. `DRUN_SHELL_ARGS` is injected when platform args are
    /// configured.
    pub fn shell_request(
        &self,
        ctx: &ExecutionContext,
        script: String,
        timeout: Option<Duration>,
    ) -> ShellRequest {
        let mut request = ShellRequest {
            script,
            timeout,
            capture_output: true,
            ..Default::default()
        };
        if let Some(config) = ctx.project.shell_config_for(host_platform()) {
            request.shell = config.executable.clone();
            request.args = config.args.clone();
            for (key, value) in &config.environment {
                request.env.insert(key.clone(), value.clone());
            }
            if !config.args.is_empty() {
                request
                    .env
                    .insert("DRUN_SHELL_ARGS".to_string(), config.args.join(" "));
            }
        }
        request
    }

    /// Launch a script with the context's shell configuration.
    pub fn run_script(
        &self,
        ctx: &ExecutionContext,
        script: &str,
        timeout: Option<Duration>,
    ) -> Result<ShellResponse, EngineError> {
        let request = self.shell_request(ctx, script.to_string(), timeout);
        self.launcher.launch(&request, &self.cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::{ProjectContext, ShellConfig};
    use crate::ast::types::Program;

    fn shared_with_config(config: RunConfig) -> EngineShared {
        let launcher = Arc::new(crate::runner::SystemShellLauncher::new());
        EngineShared {
            launcher: launcher.clone(),
            detector: Arc::new(crate::runner::SystemToolDetector::new(launcher)),
            fetcher: Arc::new(crate::runner::LocalIncludeFetcher::new()),
            output: Output::stdout(),
            config,
            cancel: CancelToken::new(),
        }
    }

    #[test]
    fn test_environment_explicit_override_wins() {
        let shared = shared_with_config(RunConfig {
            environment: Some("staging".to_string()),
            ..Default::default()
        });
        assert_eq!(shared.environment_name(), "staging");
    }

    #[test]
    fn test_shell_request_uses_platform_config() {
        let shared = shared_with_config(RunConfig::default());
        let mut project = ProjectContext::default();
        project.shell_configs.insert(
            host_platform().to_string(),
            ShellConfig {
                executable: "/bin/bash".to_string(),
                args: vec!["-e".to_string(), "-c".to_string()],
                environment: Default::default(),
            },
        );
        let ctx = ExecutionContext::new(Arc::new(Program::default()), Arc::new(project));

        let request = shared.shell_request(&ctx, "echo hi".to_string(), None);
        assert_eq!(request.shell, "/bin/bash");
        assert_eq!(
            request.env.get("DRUN_SHELL_ARGS").map(String::as_str),
            Some("-e -c")
        );
    }
}
