//! Test Harness
//!
//! Shared fixtures for engine tests: a recording shell launcher serving
//! canned responses, a fixed tool detector, and a runner wired to an
//! in-memory output sink.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ast::types::Program;
use crate::engine::config::{EngineShared, RunConfig};
use crate::engine::context::{ExecutionContext, ProjectContext};
use crate::engine::dispatch::StatementRunner;
use crate::engine::errors::EngineError;
use crate::engine::output::{Output, OutputCapture};
use crate::runner::fetcher::IncludeFetcher;
use crate::runner::shell::{CancelToken, ShellRequest, ShellResponse};
use crate::runner::{ShellLauncher, ToolDetector};

/// Launcher fake: records every script and serves queued responses,
/// falling back to a default.
pub struct RecordingLauncher {
    pub scripts: Mutex<Vec<String>>,
    queued: Mutex<Vec<ShellResponse>>,
    fallback: ShellResponse,
}

impl RecordingLauncher {
    pub fn ok(stdout: &str) -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            queued: Mutex::new(Vec::new()),
            fallback: ShellResponse {
                stdout: stdout.to_string(),
                success: true,
                ..Default::default()
            },
        }
    }

    pub fn failing(exit_code: i32, stderr: &str) -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            queued: Mutex::new(Vec::new()),
            fallback: ShellResponse {
                stderr: stderr.to_string(),
                exit_code,
                success: false,
                ..Default::default()
            },
        }
    }

    /// Serve these responses first, in order, then the fallback.
    pub fn queue(self, responses: Vec<ShellResponse>) -> Self {
        *self.queued.lock().unwrap() = responses;
        self
    }

    pub fn launched(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

impl ShellLauncher for RecordingLauncher {
    fn launch(
        &self,
        request: &ShellRequest,
        _cancel: &CancelToken,
    ) -> Result<ShellResponse, EngineError> {
        self.scripts.lock().unwrap().push(request.script.clone());
        let mut queued = self.queued.lock().unwrap();
        if queued.is_empty() {
            Ok(self.fallback.clone())
        } else {
            Ok(queued.remove(0))
        }
    }
}

/// Detector fake with fixed availability and versions.
#[derive(Default)]
pub struct FixedDetector {
    pub available: Vec<String>,
    pub versions: HashMap<String, String>,
}

impl ToolDetector for FixedDetector {
    fn is_available(&self, tool: &str) -> bool {
        self.available.iter().any(|t| t == tool)
    }

    fn version(&self, tool: &str) -> Option<String> {
        self.versions.get(tool).cloned()
    }

    fn environment(&self) -> String {
        "local".to_string()
    }
}

/// Fetcher fake serving programs from a map.
#[derive(Default)]
pub struct MapFetcher {
    pub programs: HashMap<String, Program>,
}

impl IncludeFetcher for MapFetcher {
    fn fetch(&self, url: &str) -> Result<Program, EngineError> {
        self.programs
            .get(url)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("no such include: {}", url)))
    }
}

pub struct TestHarness {
    pub runner: StatementRunner,
    pub ctx: ExecutionContext,
    pub capture: OutputCapture,
}

pub fn harness(launcher: Arc<dyn ShellLauncher>, config: RunConfig) -> TestHarness {
    harness_with(launcher, Arc::new(FixedDetector::default()), config)
}

pub fn harness_with(
    launcher: Arc<dyn ShellLauncher>,
    detector: Arc<dyn ToolDetector>,
    config: RunConfig,
) -> TestHarness {
    let (output, capture) = Output::memory();
    let shared = Arc::new(EngineShared {
        launcher,
        detector,
        fetcher: Arc::new(MapFetcher::default()),
        output,
        config,
        cancel: CancelToken::new(),
    });
    let ctx = ExecutionContext::new(
        Arc::new(Program::default()),
        Arc::new(ProjectContext::default()),
    );
    TestHarness {
        runner: StatementRunner::new(shared),
        ctx,
        capture,
    }
}

/// Default harness: every launched script succeeds with empty stdout.
pub fn test_runner() -> TestHarness {
    harness(Arc::new(RecordingLauncher::ok("")), RunConfig::default())
}

/// Harness in dry-run mode.
pub fn dry_run_runner() -> TestHarness {
    harness(
        Arc::new(RecordingLauncher::ok("")),
        RunConfig {
            dry_run: true,
            ..Default::default()
        },
    )
}
