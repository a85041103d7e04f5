//! Engine Errors
//!
//! Every runtime failure carries a kind tag, a message, and execution
//! context (task, file, line, and for shell/HTTP the command and exit
//! code). `try`/`catch` matches on the kind tag or a message substring.
//!
//! Break and continue are modeled as error kinds so they unwind nested
//! statement execution the same way other errors do; loop executors
//! intercept them and `catch` clauses never match them.

use thiserror::Error;

/// Error kind tags. `Break` and `Continue` are internal control-flow
/// signals, not user-visible failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Parse,
    NotFound,
    MissingParameter,
    UnknownParameter,
    Constraint,
    Type,
    UndefinedVariable,
    DivisionByZero,
    CircularDependency,
    DuplicateInclude,
    Shell,
    Http,
    Network,
    File,
    Docker,
    Git,
    Detection,
    Timeout,
    Cancelled,
    /// `fail "msg"`
    Task,
    /// `throw LABEL "msg"`
    UserThrown,
    Break,
    Continue,
}

impl ErrorKind {
    /// The tag string used by `catch` matchers and error display.
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::Config => "ConfigError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::MissingParameter => "MissingParameterError",
            ErrorKind::UnknownParameter => "UnknownParameterError",
            ErrorKind::Constraint => "ConstraintError",
            ErrorKind::Type => "TypeError",
            ErrorKind::UndefinedVariable => "UndefinedVariableError",
            ErrorKind::DivisionByZero => "DivisionByZeroError",
            ErrorKind::CircularDependency => "CircularDependencyError",
            ErrorKind::DuplicateInclude => "DuplicateIncludeError",
            ErrorKind::Shell => "ShellError",
            ErrorKind::Http => "HTTPError",
            ErrorKind::Network => "NetworkError",
            ErrorKind::File => "FileError",
            ErrorKind::Docker => "DockerError",
            ErrorKind::Git => "GitError",
            ErrorKind::Detection => "DetectionError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Cancelled => "CancelledError",
            ErrorKind::Task => "TaskError",
            ErrorKind::UserThrown => "UserThrown",
            ErrorKind::Break => "Break",
            ErrorKind::Continue => "Continue",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Where an error happened. Attached as errors unwind; the first value set
/// for each field wins so the innermost frame is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    pub task: Option<String>,
    pub file: Option<String>,
    pub line: Option<usize>,
    /// Shell command or HTTP URL
    pub command: Option<String>,
    pub exit_code: Option<i32>,
}

/// Unified engine error: `{kind, message, context}` plus the user label
/// from `throw`.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind}: {message}")]
pub struct EngineError {
    pub kind: ErrorKind,
    pub message: String,
    /// `throw LABEL "msg"` label, used by catch matching
    pub label: Option<String>,
    pub context: ErrorContext,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            label: None,
            context: ErrorContext::default(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            format!("undefined variable: {}", name),
        )
    }

    pub fn shell(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Shell, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "execution cancelled")
    }

    /// Internal break signal.
    pub fn break_signal() -> Self {
        Self::new(ErrorKind::Break, "break")
    }

    /// Internal continue signal.
    pub fn continue_signal() -> Self {
        Self::new(ErrorKind::Continue, "continue")
    }

    pub fn user_thrown(label: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::UserThrown,
            message: message.into(),
            label,
            context: ErrorContext::default(),
        }
    }

    /// Attach the shell command (or URL) unless already set.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        if self.context.command.is_none() {
            self.context.command = Some(command.into());
        }
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        if self.context.exit_code.is_none() {
            self.context.exit_code = Some(code);
        }
        self
    }

    /// Fill in task/file/line context, keeping values from inner frames.
    pub fn with_location(mut self, task: &str, file: &str, line: usize) -> Self {
        if self.context.task.is_none() && !task.is_empty() {
            self.context.task = Some(task.to_string());
        }
        if self.context.file.is_none() && !file.is_empty() {
            self.context.file = Some(file.to_string());
        }
        if self.context.line.is_none() && line > 0 {
            self.context.line = Some(line);
        }
        self
    }

    /// True for break/continue, which unwind loops but are not failures.
    pub fn is_control_flow(&self) -> bool {
        matches!(self.kind, ErrorKind::Break | ErrorKind::Continue)
    }

    /// True if a `catch` clause is allowed to observe this error at all.
    /// Control-flow signals and cancellation always propagate.
    pub fn is_catchable(&self) -> bool {
        !self.is_control_flow() && self.kind != ErrorKind::Cancelled
    }

    /// Match against a `catch` matcher: `any`, a kind tag, a `throw` label,
    /// or a message substring. Tag and label comparisons are
    /// case-insensitive.
    pub fn matches(&self, matcher: &str) -> bool {
        if !self.is_catchable() {
            return false;
        }
        if matcher.eq_ignore_ascii_case("any") {
            return true;
        }
        if matcher.eq_ignore_ascii_case(self.kind.tag()) {
            return true;
        }
        if let Some(ref label) = self.label {
            if matcher.eq_ignore_ascii_case(label) {
                return true;
            }
        }
        self.message.contains(matcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(ErrorKind::Shell.tag(), "ShellError");
        assert_eq!(ErrorKind::Http.tag(), "HTTPError");
        assert_eq!(ErrorKind::UserThrown.tag(), "UserThrown");
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = EngineError::shell("command failed");
        assert_eq!(err.to_string(), "ShellError: command failed");
    }

    #[test]
    fn test_catch_matching() {
        let err = EngineError::shell("exit status 2 from rm");
        assert!(err.matches("any"));
        assert!(err.matches("ShellError"));
        assert!(err.matches("shellerror"));
        assert!(err.matches("exit status 2"));
        assert!(!err.matches("HTTPError"));
    }

    #[test]
    fn test_catch_matches_throw_label() {
        let err = EngineError::user_thrown(Some("deploy_failed".to_string()), "boom");
        assert!(err.matches("deploy_failed"));
        assert!(err.matches("UserThrown"));
    }

    #[test]
    fn test_control_flow_never_caught() {
        assert!(!EngineError::break_signal().matches("any"));
        assert!(!EngineError::continue_signal().matches("Break"));
        assert!(!EngineError::cancelled().matches("any"));
        assert!(EngineError::break_signal().is_control_flow());
    }

    #[test]
    fn test_context_inner_frame_wins() {
        let err = EngineError::shell("boom")
            .with_location("inner", "a.drun", 3)
            .with_location("outer", "b.drun", 9);
        assert_eq!(err.context.task.as_deref(), Some("inner"));
        assert_eq!(err.context.line, Some(3));
    }
}
