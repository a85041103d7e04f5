//! Output Writer
//!
//! Shared writer for user-facing log lines. Writes are line-atomic: each
//! line goes out as a single locked write, and multi-line emissions take
//! the lock once so parallel workers cannot split a banner.

use std::io::Write;
use std::sync::{Arc, Mutex};

pub const DRY_RUN_BANNER: &str = "[DRY RUN]";
/// Placeholder bound to capture targets in dry-run mode so downstream
/// interpolation still works.
pub const DRY_RUN_CAPTURE: &str = "[DRY RUN] command output";

#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    Buffer(Arc<Mutex<String>>),
}

/// Cloneable handle to the shared output sink.
#[derive(Debug, Clone)]
pub struct Output {
    sink: Sink,
}

/// Read side of an in-memory sink, used by tests and plan rendering.
#[derive(Debug, Clone)]
pub struct OutputCapture {
    buffer: Arc<Mutex<String>>,
}

impl OutputCapture {
    pub fn contents(&self) -> String {
        self.buffer.lock().unwrap().clone()
    }
}

impl Output {
    pub fn stdout() -> Self {
        Self { sink: Sink::Stdout }
    }

    /// In-memory sink plus a capture handle for reading it back.
    pub fn memory() -> (Self, OutputCapture) {
        let buffer = Arc::new(Mutex::new(String::new()));
        (
            Self {
                sink: Sink::Buffer(buffer.clone()),
            },
            OutputCapture { buffer },
        )
    }

    /// Write one line atomically.
    pub fn line(&self, text: &str) {
        match &self.sink {
            Sink::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                let _ = writeln!(handle, "{}", text);
            }
            Sink::Buffer(buffer) => {
                let mut guard = buffer.lock().unwrap();
                guard.push_str(text);
                guard.push('\n');
            }
        }
    }

    /// Write several lines as one contiguous block.
    pub fn block(&self, lines: &[String]) {
        match &self.sink {
            Sink::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                for line in lines {
                    let _ = writeln!(handle, "{}", line);
                }
            }
            Sink::Buffer(buffer) => {
                let mut guard = buffer.lock().unwrap();
                for line in lines {
                    guard.push_str(line);
                    guard.push('\n');
                }
            }
        }
    }

    pub fn info(&self, message: &str) {
        self.line(&format!("ℹ️  {}", message));
    }

    pub fn step(&self, message: &str) {
        self.line(&format!("📋 {}", message));
    }

    pub fn warn(&self, message: &str) {
        self.line(&format!("⚠️  {}", message));
    }

    pub fn error(&self, message: &str) {
        self.line(&format!("❌ {}", message));
    }

    pub fn success(&self, message: &str) {
        self.line(&format!("✅ {}", message));
    }

    /// Dry-run banner for a command that would have run.
    pub fn dry_run(&self, command: &str) {
        self.line(&format!("{} {}", DRY_RUN_BANNER, command));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_captures_lines() {
        let (output, capture) = Output::memory();
        output.info("hello");
        output.dry_run("docker build .");
        let text = capture.contents();
        assert!(text.contains("ℹ️  hello"));
        assert!(text.contains("[DRY RUN] docker build ."));
    }

    #[test]
    fn test_block_is_contiguous() {
        let (output, capture) = Output::memory();
        output.block(&["a".to_string(), "b".to_string()]);
        assert_eq!(capture.contents(), "a\nb\n");
    }
}
