//! drun - An execution engine for the drun task-automation DSL
//!
//! This library executes parsed `.drun` programs: named, parameterized
//! tasks with dependencies, lifecycle hooks, includes, and domain
//! statements for shell, docker, git, http, file, and network work.

pub mod ast;
pub mod engine;
pub mod runner;

pub use ast::types::*;
pub use engine::{Engine, EngineError, EngineOptions, ErrorKind, Output, Plan, RunConfig, Value};
pub use runner::{CancelToken, IncludeFetcher, ShellLauncher, ToolDetector};
