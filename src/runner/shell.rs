//! Shell Launcher
//!
//! The low-level launcher executes a script string under a configured
//! shell and reports `{stdout, stderr, exitCode, duration, success}`.
//! A non-zero exit is reported, not raised; the calling executor decides
//! whether it is an error.
//!
//! Launches honor a per-operation timeout and a cancel token: in-flight
//! processes are killed promptly when either trips.

use std::collections::HashMap;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::errors::EngineError;

/// Shared cancellation flag. Checked before each statement dispatch and
/// polled by in-flight blocking calls.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Error out early if the token has tripped.
    pub fn check(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::cancelled())
        } else {
            Ok(())
        }
    }
}

/// Input contract for one launch.
#[derive(Debug, Clone, Default)]
pub struct ShellRequest {
    pub script: String,
    /// Shell executable; empty selects the platform default
    pub shell: String,
    /// Shell arguments before the script, e.g. `["-c"]`
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<String>,
    /// None means unlimited
    pub timeout: Option<Duration>,
    pub capture_output: bool,
    pub stream_output: bool,
}

impl ShellRequest {
    /// A capture request for `script` under the platform default shell.
    pub fn capture(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            capture_output: true,
            ..Default::default()
        }
    }
}

/// Output contract for one launch.
#[derive(Debug, Clone, Default)]
pub struct ShellResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
    pub success: bool,
}

/// The launcher seam. The system implementation spawns real processes;
/// tests substitute recording fakes.
pub trait ShellLauncher: Send + Sync {
    fn launch(&self, request: &ShellRequest, cancel: &CancelToken) -> Result<ShellResponse, EngineError>;
}

/// Platform default shell invocation: `/bin/sh -c` on POSIX, `cmd /C` on
/// Windows.
pub fn default_shell() -> (String, Vec<String>) {
    if cfg!(windows) {
        ("cmd".to_string(), vec!["/C".to_string()])
    } else {
        ("/bin/sh".to_string(), vec!["-c".to_string()])
    }
}

/// Host platform tag matching `shell config for PLATFORM:` blocks.
pub fn host_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "darwin"
    } else if cfg!(windows) {
        "windows"
    } else {
        "linux"
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Launcher backed by `std::process`.
#[derive(Debug, Default)]
pub struct SystemShellLauncher;

impl SystemShellLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ShellLauncher for SystemShellLauncher {
    fn launch(&self, request: &ShellRequest, cancel: &CancelToken) -> Result<ShellResponse, EngineError> {
        cancel.check()?;

        let (shell, args) = if request.shell.is_empty() {
            default_shell()
        } else {
            (request.shell.clone(), request.args.clone())
        };

        let mut command = Command::new(&shell);
        command.args(&args).arg(&request.script);
        for (key, value) in &request.env {
            command.env(key, value);
        }
        if let Some(ref dir) = request.working_dir {
            command.current_dir(dir);
        }
        if request.capture_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        command.stdin(Stdio::null());

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            EngineError::shell(format!("failed to spawn {}: {}", shell, e))
                .with_command(request.script.clone())
        })?;

        // Drain pipes on background threads so a full pipe buffer cannot
        // block the child while we poll for exit.
        let stdout_reader = child.stdout.take().map(spawn_drain);
        let stderr_reader = child.stderr.take().map(spawn_drain);

        let status = loop {
            if let Some(status) = child.try_wait().map_err(|e| {
                EngineError::shell(format!("wait failed: {}", e)).with_command(request.script.clone())
            })? {
                break status;
            }
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::cancelled().with_command(request.script.clone()));
            }
            if let Some(timeout) = request.timeout {
                if started.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(EngineError::timeout(format!(
                        "command timed out after {:.0?}",
                        timeout
                    ))
                    .with_command(request.script.clone()));
                }
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout_reader.map(join_drain).unwrap_or_default();
        let stderr = stderr_reader.map(join_drain).unwrap_or_default();
        let exit_code = status.code().unwrap_or(-1);

        Ok(ShellResponse {
            stdout,
            stderr,
            exit_code,
            duration: started.elapsed(),
            success: status.success(),
        })
    }
}

fn spawn_drain<R: Read + Send + 'static>(mut reader: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buffer = String::new();
        let _ = reader.read_to_string(&mut buffer);
        buffer
    })
}

fn join_drain(handle: std::thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::errors::ErrorKind;

    #[test]
    fn test_cancel_token_check() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert_eq!(token.check().unwrap_err().kind, ErrorKind::Cancelled);
    }

    #[test]
    fn test_default_shell_is_platform_specific() {
        let (shell, args) = default_shell();
        if cfg!(windows) {
            assert_eq!(shell, "cmd");
            assert_eq!(args, vec!["/C".to_string()]);
        } else {
            assert_eq!(shell, "/bin/sh");
            assert_eq!(args, vec!["-c".to_string()]);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_captures_output_and_exit_code() {
        let launcher = SystemShellLauncher::new();
        let response = launcher
            .launch(&ShellRequest::capture("echo hello; exit 3"), &CancelToken::new())
            .unwrap();
        assert_eq!(response.stdout.trim(), "hello");
        assert_eq!(response.exit_code, 3);
        assert!(!response.success);
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_times_out() {
        let launcher = SystemShellLauncher::new();
        let request = ShellRequest {
            timeout: Some(Duration::from_millis(100)),
            ..ShellRequest::capture("sleep 5")
        };
        let err = launcher.launch(&request, &CancelToken::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }
}
