//! Abstract Syntax Tree (AST) Types for drun
//!
//! This module defines the complete AST structure for `.drun` programs.
//! The lexer and parser are external collaborators; the engine consumes
//! these nodes through this stable interface. All nodes derive `serde`
//! traits so a parsed program round-trips as JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// =============================================================================
// PROGRAM & PROJECT
// =============================================================================

/// Root node: a complete `.drun` program.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    /// `version: 2.0` header, if present
    #[serde(default)]
    pub version: Option<String>,
    /// `project NAME:` block, if present
    #[serde(default)]
    pub project: Option<ProjectNode>,
    /// Top-level `snippet NAME:` blocks
    #[serde(default)]
    pub snippets: Vec<SnippetNode>,
    /// Top-level `template NAME:` blocks
    #[serde(default)]
    pub templates: Vec<TemplateNode>,
    /// `task NAME:` blocks
    #[serde(default)]
    pub tasks: Vec<TaskNode>,
    /// Source file the program was parsed from
    #[serde(default)]
    pub source_file: Option<String>,
}

/// `project NAME [version V]:` block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectNode {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// `set KEY to VALUE` / `set KEY as list to [..]`
    #[serde(default)]
    pub settings: Vec<SettingNode>,
    /// `include "URL" [as NS]`
    #[serde(default)]
    pub includes: Vec<IncludeNode>,
    /// Project-level parameter declarations
    #[serde(default)]
    pub parameters: Vec<ParameterNode>,
    /// `shell config for PLATFORM:` blocks
    #[serde(default)]
    pub shell_configs: Vec<ShellConfigNode>,
    /// `on drun setup:` body
    #[serde(default)]
    pub setup: Vec<Statement>,
    /// `on drun teardown:` body
    #[serde(default)]
    pub teardown: Vec<Statement>,
    /// `before any task:` body
    #[serde(default)]
    pub before_any_task: Vec<Statement>,
    /// `after any task:` body
    #[serde(default)]
    pub after_any_task: Vec<Statement>,
    #[serde(default)]
    pub line: usize,
}

/// `set KEY to VALUE` inside a project block. List values are carried as
/// `[a,b,c]` literals so loop splitting can round-trip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SettingNode {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub line: usize,
}

/// `include "URL" [as NS]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IncludeNode {
    pub url: String,
    /// Explicit namespace from `as NS`; defaults to the filename stem
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub line: usize,
}

/// `shell config for PLATFORM:` block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShellConfigNode {
    /// Platform tag: `linux`, `darwin`, `windows`, ...
    pub platform: String,
    pub executable: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub line: usize,
}

// =============================================================================
// SNIPPETS, TEMPLATES, TASKS
// =============================================================================

/// `snippet NAME:` — a reusable statement block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnippetNode {
    pub name: String,
    #[serde(default)]
    pub body: Vec<Statement>,
    #[serde(default)]
    pub line: usize,
}

/// `template NAME:` — a parameterized reusable block, includable under a
/// namespace.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateNode {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterNode>,
    #[serde(default)]
    pub body: Vec<Statement>,
    #[serde(default)]
    pub line: usize,
}

/// `task NAME:` block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskNode {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `requires P [from [..]]` and `given P defaults to V`
    #[serde(default)]
    pub parameters: Vec<ParameterNode>,
    /// `depends on T1, T2, ...` in declaration order
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub body: Vec<Statement>,
    #[serde(default)]
    pub line: usize,
}

/// Declared parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    List,
}

/// A declared task or project parameter.
///
/// `requires P from ["a","b"]` sets `required` and `allowed`;
/// `given P defaults to V` sets `default`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterNode {
    pub name: String,
    #[serde(default)]
    pub param_type: ParameterType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<String>,
    /// `from [v1,...,vk]` constraint; empty means unconstrained
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub line: usize,
}

// =============================================================================
// STATEMENTS
// =============================================================================

/// Union of all statement types. Each variant is routed to its domain
/// executor by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Action(ActionNode),
    Variable(VariableNode),
    Shell(ShellNode),
    Conditional(ConditionalNode),
    For(ForNode),
    Break(BreakNode),
    Continue(ContinueNode),
    Try(TryNode),
    Throw(ThrowNode),
    Rethrow(RethrowNode),
    Ignore(IgnoreNode),
    UseSnippet(UseSnippetNode),
    Docker(DockerNode),
    Git(GitNode),
    Http(HttpNode),
    File(FileNode),
    Network(NetworkNode),
    Detection(DetectionNode),
}

impl Statement {
    /// Source line for error context.
    pub fn line(&self) -> usize {
        match self {
            Statement::Action(n) => n.line,
            Statement::Variable(n) => n.line(),
            Statement::Shell(n) => n.line,
            Statement::Conditional(n) => n.line,
            Statement::For(n) => n.line,
            Statement::Break(n) => n.line,
            Statement::Continue(n) => n.line,
            Statement::Try(n) => n.line,
            Statement::Throw(n) => n.line,
            Statement::Rethrow(n) => n.line,
            Statement::Ignore(n) => n.line,
            Statement::UseSnippet(n) => n.line,
            Statement::Docker(n) => n.line,
            Statement::Git(n) => n.line,
            Statement::Http(n) => n.line,
            Statement::File(n) => n.line,
            Statement::Network(n) => n.line,
            Statement::Detection(n) => n.line(),
        }
    }
}

/// Message kind for action statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Info,
    Step,
    Warn,
    Error,
    Success,
    /// `fail "msg"` raises a task error after printing
    Fail,
}

/// `info "..."`, `step "..."`, `fail "..."`, etc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNode {
    pub kind: ActionKind,
    pub message: String,
    #[serde(default)]
    pub line: usize,
}

/// Variable statements: declaration, mutation, transformation, capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableNode {
    /// `let $x = EXPR`
    Let {
        name: String,
        value: Expression,
        #[serde(default)]
        line: usize,
    },
    /// `set $x to EXPR`
    Set {
        name: String,
        value: Expression,
        #[serde(default)]
        line: usize,
    },
    /// `transform $x with OPERATION` — applies an operation chain to the
    /// current value of `$x`
    Transform {
        name: String,
        operation: String,
        #[serde(default)]
        line: usize,
    },
    /// `capture "EXPR" as $x` — interpolates (pipe operations allowed) and
    /// binds the result
    Capture {
        name: String,
        expression: String,
        #[serde(default)]
        line: usize,
    },
    /// `capture from shell "CMD" as $x` — binds trimmed stdout
    CaptureShell {
        name: String,
        command: String,
        #[serde(default)]
        line: usize,
    },
}

impl VariableNode {
    pub fn line(&self) -> usize {
        match self {
            VariableNode::Let { line, .. }
            | VariableNode::Set { line, .. }
            | VariableNode::Transform { line, .. }
            | VariableNode::Capture { line, .. }
            | VariableNode::CaptureShell { line, .. } => *line,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VariableNode::Let { name, .. }
            | VariableNode::Set { name, .. }
            | VariableNode::Transform { name, .. }
            | VariableNode::Capture { name, .. }
            | VariableNode::CaptureShell { name, .. } => name,
        }
    }
}

/// Shell statement verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellAction {
    Run,
    Exec,
    Shell,
    Capture,
}

/// `run "CMD"`, `exec "CMD"`, multi-line `shell:` blocks, and
/// `capture "CMD" as $x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellNode {
    pub action: ShellAction,
    pub command: String,
    /// Capture target for `capture ... as $x`
    #[serde(default)]
    pub capture_as: Option<String>,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default)]
    pub line: usize,
}

/// `when COND: ... otherwise: ...` and `if COND then ... else ...`.
/// Both surface forms share one execution shape: the body runs against the
/// enclosing scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalNode {
    pub condition: ConditionNode,
    pub then_body: Vec<Statement>,
    #[serde(default)]
    pub else_body: Vec<Statement>,
    #[serde(default)]
    pub line: usize,
}

/// Loop execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    #[default]
    Sequential,
    Parallel,
}

/// What a `for` loop iterates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoopSource {
    /// `for each $x in EXPR`
    Items { expression: Expression },
    /// `for $i in range START to END [step STEP]`
    Range {
        start: Expression,
        end: Expression,
        #[serde(default)]
        step: Option<Expression>,
    },
    /// `for each line $l in "TEXT"` — one iteration per line
    Lines { source: String },
    /// `for each match $m in "TEXT" matching "PATTERN"`
    Matches { source: String, pattern: String },
}

/// `for each $x in ...: [where COND] [in parallel]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForNode {
    pub variable: String,
    pub source: LoopSource,
    /// `where COND` filter applied per item, with the loop variable bound
    #[serde(default)]
    pub filter: Option<ConditionNode>,
    #[serde(default)]
    pub mode: LoopMode,
    pub body: Vec<Statement>,
    #[serde(default)]
    pub line: usize,
}

/// `break`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BreakNode {
    #[serde(default)]
    pub line: usize,
}

/// `continue`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContinueNode {
    #[serde(default)]
    pub line: usize,
}

/// One `catch` clause. A `matcher` of `None` or `"any"` matches every
/// catchable error; otherwise the matcher is compared against the error
/// kind tag, the user throw label, and the message (substring).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatchClause {
    #[serde(default)]
    pub matcher: Option<String>,
    #[serde(default)]
    pub body: Vec<Statement>,
    #[serde(default)]
    pub line: usize,
}

/// `try: ... catch X: ... finally: ...`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TryNode {
    pub body: Vec<Statement>,
    #[serde(default)]
    pub catch_clauses: Vec<CatchClause>,
    #[serde(default)]
    pub finally_body: Vec<Statement>,
    #[serde(default)]
    pub line: usize,
}

/// `throw KIND "MSG"` / `throw "MSG"`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThrowNode {
    /// User-chosen error label, e.g. `throw deploy_failed "..."`
    #[serde(default)]
    pub label: Option<String>,
    pub message: String,
    #[serde(default)]
    pub line: usize,
}

/// `rethrow` — re-raises the currently caught error (catch bodies only).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RethrowNode {
    #[serde(default)]
    pub line: usize,
}

/// `ignore` — swallows the currently caught error (catch bodies only).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IgnoreNode {
    #[serde(default)]
    pub line: usize,
}

/// `use snippet "NAME"` — runs a snippet body (possibly `ns.name`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UseSnippetNode {
    pub name: String,
    #[serde(default)]
    pub line: usize,
}

// =============================================================================
// DOMAIN STATEMENTS
// =============================================================================

/// Docker operations. All option values are interpolated before the
/// equivalent `docker` command line is assembled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DockerNode {
    /// `build`, `push`, `pull`, `run`, `stop`, `remove`, `compose up`,
    /// `compose down`
    pub operation: String,
    /// Image or container reference
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub options: IndexMap<String, String>,
    #[serde(default)]
    pub line: usize,
}

/// Git operations, assembled into `git` command lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GitNode {
    /// `clone`, `init`, `add`, `commit`, `push`, `pull`, `checkout`, `status`
    pub operation: String,
    #[serde(default)]
    pub options: IndexMap<String, String>,
    /// Capture target for `git status` output
    #[serde(default)]
    pub capture_as: Option<String>,
    #[serde(default)]
    pub line: usize,
}

/// HTTP request authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HttpAuth {
    Bearer { token: String },
    Basic { user: String, password: String },
}

/// HTTP statements: `get/post/put/delete URL ...`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HttpNode {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    /// `content type json` marks the body as JSON
    #[serde(default)]
    pub json_body: bool,
    #[serde(default)]
    pub auth: Option<HttpAuth>,
    /// `capture response as $x`
    #[serde(default)]
    pub capture_as: Option<String>,
    /// `allow failure` — non-2xx does not raise
    #[serde(default)]
    pub allow_failure: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub line: usize,
}

/// File operation verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    Create,
    Copy,
    Move,
    Delete,
    Write,
    Append,
    Read,
    /// `download "URL" to "PATH"`
    Download,
}

/// File statements: `create file/dir`, `copy X to Y`, `read file X as $v`...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub operation: FileOperation,
    pub path: String,
    /// Destination for copy/move
    #[serde(default)]
    pub target: Option<String>,
    /// Content for write/append
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_directory: bool,
    /// Capture target for `read`
    #[serde(default)]
    pub capture_as: Option<String>,
    #[serde(default)]
    pub line: usize,
}

/// Network probe verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkOperation {
    HealthCheck,
    PortCheck,
    Ping,
    WaitForService,
}

/// Network statements: `check health of ...`, `wait for service ...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub operation: NetworkOperation,
    /// URL or host
    pub target: String,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Capture target for the probe status string
    #[serde(default)]
    pub capture_as: Option<String>,
    #[serde(default)]
    pub line: usize,
}

/// Tool detection statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DetectionNode {
    /// `detect TOOL as $v` — binds the tool version string
    Detect {
        tool: String,
        capture_as: String,
        #[serde(default)]
        line: usize,
    },
    /// `detect available [T1,...] as $v` — binds the first available name
    DetectAvailable {
        alternatives: Vec<String>,
        capture_as: String,
        #[serde(default)]
        line: usize,
    },
    /// `if TOOL is [not] available: ... else: ...`
    IfAvailable {
        tool: String,
        #[serde(default)]
        negated: bool,
        then_body: Vec<Statement>,
        #[serde(default)]
        else_body: Vec<Statement>,
        #[serde(default)]
        line: usize,
    },
    /// `if TOOL version OP V: ... else: ...`
    IfVersion {
        tool: String,
        operator: String,
        version: String,
        then_body: Vec<Statement>,
        #[serde(default)]
        else_body: Vec<Statement>,
        #[serde(default)]
        line: usize,
    },
    /// `when in ENVIRONMENT: ... else: ...`
    WhenEnvironment {
        environment: String,
        then_body: Vec<Statement>,
        #[serde(default)]
        else_body: Vec<Statement>,
        #[serde(default)]
        line: usize,
    },
}

impl DetectionNode {
    pub fn line(&self) -> usize {
        match self {
            DetectionNode::Detect { line, .. }
            | DetectionNode::DetectAvailable { line, .. }
            | DetectionNode::IfAvailable { line, .. }
            | DetectionNode::IfVersion { line, .. }
            | DetectionNode::WhenEnvironment { line, .. } => *line,
        }
    }
}

// =============================================================================
// EXPRESSIONS & CONDITIONS
// =============================================================================

/// Binary expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
        }
    }
}

/// Expression AST. All expressions evaluate to string values; numeric
/// semantics are applied on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Quoted literal; interpolated before use
    Literal(String),
    /// Bare identifier or `$name` / `ns.name` reference
    Identifier(String),
    /// `[e1, ..., ek]`
    ArrayLiteral(Vec<Expression>),
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `name(a1, ...)` — `now()` is built in; anything else is rendered and
    /// run through the shell launcher
    FunctionCall { name: String, args: Vec<Expression> },
}

/// Comparison operators usable in conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    /// `is` — string equality after interpolation
    Is,
    /// `is not`
    IsNot,
    /// `==` — numeric if both sides parse, else lexicographic
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOperator {
    /// Parse an operator as it appears in the DSL surface.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "is" => Some(ComparisonOperator::Is),
            "is not" => Some(ComparisonOperator::IsNot),
            "==" => Some(ComparisonOperator::Eq),
            "!=" => Some(ComparisonOperator::Ne),
            "<" => Some(ComparisonOperator::Lt),
            "<=" => Some(ComparisonOperator::Le),
            ">" => Some(ComparisonOperator::Gt),
            ">=" => Some(ComparisonOperator::Ge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Is => "is",
            ComparisonOperator::IsNot => "is not",
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
        }
    }
}

/// String test kinds for conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringTest {
    Contains,
    StartsWith,
    EndsWith,
    /// Regular-expression match
    Matches,
}

/// Condition AST for `when`, `if`, loop filters, and detection gates.
/// Operand strings are interpolated before evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionNode {
    /// `X is Y`, `X is not Y`, `X < Y`, ...
    Comparison {
        left: String,
        op: ComparisonOperator,
        right: String,
    },
    /// `X is empty` / `X is not empty`
    Empty {
        value: String,
        #[serde(default)]
        negated: bool,
    },
    /// `X contains Y`, `X starts with Y`, `X ends with Y`, `X matches Y`
    Test {
        value: String,
        test: StringTest,
        pattern: String,
    },
    /// `tool T is [not] available`; with alternatives, available = AND over
    /// all, not-available = OR over all
    ToolAvailable {
        tools: Vec<String>,
        #[serde(default)]
        negated: bool,
    },
    /// `T version OP V`
    ToolVersion {
        tool: String,
        op: ComparisonOperator,
        version: String,
    },
    /// `when in ENV`
    InEnvironment { environment: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_round_trips_as_json() {
        let program = Program {
            version: Some("2.0".to_string()),
            tasks: vec![TaskNode {
                name: "build".to_string(),
                body: vec![Statement::Action(ActionNode {
                    kind: ActionKind::Info,
                    message: "Building {name}".to_string(),
                    line: 3,
                })],
                line: 2,
                ..Default::default()
            }],
            ..Default::default()
        };

        let json = serde_json::to_string(&program).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(program, back);
    }

    #[test]
    fn test_statement_line_numbers() {
        let stmt = Statement::Variable(VariableNode::Let {
            name: "$x".to_string(),
            value: Expression::Literal("1".to_string()),
            line: 42,
        });
        assert_eq!(stmt.line(), 42);

        let stmt = Statement::Detection(DetectionNode::Detect {
            tool: "docker".to_string(),
            capture_as: "$v".to_string(),
            line: 7,
        });
        assert_eq!(stmt.line(), 7);
    }

    #[test]
    fn test_operator_display() {
        assert_eq!(BinaryOperator::Add.as_str(), "+");
        assert_eq!(ComparisonOperator::IsNot.as_str(), "is not");
    }
}
