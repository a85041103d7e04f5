//! Tool Detector
//!
//! Answers `isAvailable`, `version`, and `environment` queries for the
//! detection statements and condition predicates. The system detector
//! shells out through the launcher and memoizes availability behind a
//! read/write lock (reads concurrent, writes exclusive).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use lazy_static::lazy_static;
use regex_lite::Regex;

use super::shell::{CancelToken, ShellLauncher, ShellRequest};

/// Detector seam consumed by the engine.
pub trait ToolDetector: Send + Sync {
    /// Is the tool binary resolvable on this host?
    fn is_available(&self, tool: &str) -> bool;

    /// Version string reported by the tool, if it can be determined.
    fn version(&self, tool: &str) -> Option<String>;

    /// Host environment heuristic (`ci`, `local`, ...). Explicit overrides
    /// and `DRUN_ENV` are applied by the engine before this is consulted.
    fn environment(&self) -> String;
}

lazy_static! {
    static ref VERSION_TOKEN: Regex = Regex::new(r"v?(\d+\.\d+(?:\.\d+)?)").unwrap();
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Detector backed by the shell launcher (`command -v`, `TOOL --version`).
pub struct SystemToolDetector {
    launcher: Arc<dyn ShellLauncher>,
    availability: RwLock<HashMap<String, bool>>,
}

impl SystemToolDetector {
    pub fn new(launcher: Arc<dyn ShellLauncher>) -> Self {
        Self {
            launcher,
            availability: RwLock::new(HashMap::new()),
        }
    }

    fn probe(&self, script: String) -> Option<String> {
        let request = ShellRequest {
            timeout: Some(PROBE_TIMEOUT),
            ..ShellRequest::capture(script)
        };
        let response = self.launcher.launch(&request, &CancelToken::new()).ok()?;
        if response.success {
            Some(response.stdout)
        } else {
            None
        }
    }
}

impl ToolDetector for SystemToolDetector {
    fn is_available(&self, tool: &str) -> bool {
        if let Some(&cached) = self.availability.read().unwrap().get(tool) {
            return cached;
        }
        let available = self
            .probe(format!("command -v {}", tool))
            .map(|out| !out.trim().is_empty())
            .unwrap_or(false);
        self.availability
            .write()
            .unwrap()
            .insert(tool.to_string(), available);
        available
    }

    fn version(&self, tool: &str) -> Option<String> {
        let output = self.probe(format!("{} --version", tool))?;
        let first_line = output.lines().next().unwrap_or("");
        VERSION_TOKEN
            .captures(first_line)
            .map(|caps| caps[1].to_string())
    }

    fn environment(&self) -> String {
        if std::env::var("CI").is_ok() {
            "ci".to_string()
        } else {
            "local".to_string()
        }
    }
}
