//! Execution & Project Context
//!
//! `ExecutionContext` is the per-task, per-scope record: typed parameters,
//! string variables, and references to the project and program. Contexts
//! form a parent/child chain; a child receives a shallow snapshot of the
//! parent's variable map, so writes in a child never reach the parent.
//!
//! `ProjectContext` is built once per Execute call from the program's
//! project block plus any merged includes, and is immutable afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use super::errors::EngineError;
use super::value::Value;
use crate::ast::types::{
    ParameterNode, Program, ProjectNode, ShellConfigNode, SnippetNode, Statement, TaskNode,
    TemplateNode,
};

/// Resolved shell configuration for one platform tag.
#[derive(Debug, Clone, Default)]
pub struct ShellConfig {
    pub executable: String,
    pub args: Vec<String>,
    pub environment: IndexMap<String, String>,
}

/// Project-level lifecycle hook bodies.
#[derive(Debug, Clone, Default)]
pub struct LifecycleHooks {
    pub setup: Vec<Statement>,
    pub teardown: Vec<Statement>,
    pub before_any_task: Vec<Statement>,
    pub after_any_task: Vec<Statement>,
}

/// Immutable project state shared by every task in a run.
#[derive(Debug, Clone, Default)]
pub struct ProjectContext {
    pub name: String,
    pub version: String,
    /// `set KEY to VALUE` entries in declaration order
    pub settings: IndexMap<String, String>,
    /// Project-level parameter declarations (defaults feed interpolation)
    pub parameters: Vec<ParameterNode>,
    /// Local snippets by name
    pub snippets: IndexMap<String, SnippetNode>,
    /// Shell configurations keyed by platform tag (`linux`, `darwin`, ...)
    pub shell_configs: HashMap<String, ShellConfig>,
    pub hooks: LifecycleHooks,
    /// Included snippets/templates/tasks under `ns.name` keys
    pub included_snippets: IndexMap<String, SnippetNode>,
    pub included_templates: IndexMap<String, TemplateNode>,
    pub included_tasks: IndexMap<String, TaskNode>,
    /// Canonical keys of files already merged, for circular-include detection
    pub included_files: HashSet<String>,
}

impl ProjectContext {
    /// Build from a project block. Includes are merged separately by the
    /// include resolver before the context is frozen.
    pub fn from_project(project: &ProjectNode) -> Self {
        let mut settings = IndexMap::new();
        for setting in &project.settings {
            settings.insert(setting.key.clone(), setting.value.clone());
        }

        let mut shell_configs = HashMap::new();
        for config in &project.shell_configs {
            shell_configs.insert(
                config.platform.clone(),
                ShellConfig {
                    executable: config.executable.clone(),
                    args: config.args.clone(),
                    environment: config.environment.clone(),
                },
            );
        }

        Self {
            name: project.name.clone(),
            version: project.version.clone().unwrap_or_default(),
            settings,
            parameters: project.parameters.clone(),
            shell_configs,
            hooks: LifecycleHooks {
                setup: project.setup.clone(),
                teardown: project.teardown.clone(),
                before_any_task: project.before_any_task.clone(),
                after_any_task: project.after_any_task.clone(),
            },
            ..Default::default()
        }
    }

    /// Register the program's top-level snippets.
    pub fn add_snippets(&mut self, snippets: &[SnippetNode]) {
        for snippet in snippets {
            self.snippets.insert(snippet.name.clone(), snippet.clone());
        }
    }

    /// Look up a snippet: local name first, then `ns.name` includes.
    pub fn find_snippet(&self, name: &str) -> Option<&SnippetNode> {
        self.snippets
            .get(name)
            .or_else(|| self.included_snippets.get(name))
    }

    /// Default value for a declared project parameter.
    pub fn parameter_default(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.default.as_deref())
    }

    /// Shell configuration for the given platform tag.
    pub fn shell_config_for(&self, platform: &str) -> Option<&ShellConfig> {
        self.shell_configs.get(platform)
    }
}

/// Per-task, per-scope execution state.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Typed task parameters bound at task entry
    pub parameters: HashMap<String, Value>,
    /// String variables: `$name` (user/loop) and `ns.name` (included)
    pub variables: HashMap<String, String>,
    pub project: Arc<ProjectContext>,
    pub program: Arc<Program>,
    pub current_file: String,
    pub current_task: String,
    /// Non-empty only while executing statements from an included body
    pub current_namespace: String,
    /// The error a surrounding `catch` clause is handling; consumed by
    /// `rethrow`
    pub caught_error: Option<EngineError>,
}

impl ExecutionContext {
    pub fn new(program: Arc<Program>, project: Arc<ProjectContext>) -> Self {
        let current_file = program.source_file.clone().unwrap_or_default();
        Self {
            parameters: HashMap::new(),
            variables: HashMap::new(),
            project,
            program,
            current_file,
            current_task: String::new(),
            current_namespace: String::new(),
            caught_error: None,
        }
    }

    /// Clone into a child scope. The variable map is snapshotted, so child
    /// writes stay in the child; parameters and project are shared state.
    pub fn child(&self) -> Self {
        self.clone()
    }

    /// Look up a variable by exact key, falling back to the `$`-prefixed
    /// form for bare identifiers, and to the current namespace for
    /// included-body references.
    pub fn get_variable(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.variables.get(name) {
            return Some(value.as_str());
        }
        if !name.starts_with('$') {
            if let Some(value) = self.variables.get(&format!("${}", name)) {
                return Some(value.as_str());
            }
        }
        if !self.current_namespace.is_empty() && !name.contains('.') {
            let namespaced = format!("{}.{}", self.current_namespace, name);
            if let Some(value) = self.variables.get(&namespaced) {
                return Some(value.as_str());
            }
        }
        None
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn get_parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .get(name)
            .or_else(|| self.parameters.get(name.trim_start_matches('$')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_context() -> ExecutionContext {
        ExecutionContext::new(
            Arc::new(Program::default()),
            Arc::new(ProjectContext::default()),
        )
    }

    #[test]
    fn test_child_writes_do_not_leak_upward() {
        let mut parent = empty_context();
        parent.set_variable("$x", "parent");

        let mut child = parent.child();
        child.set_variable("$x", "child");
        child.set_variable("$y", "only-in-child");

        assert_eq!(parent.get_variable("$x"), Some("parent"));
        assert_eq!(parent.get_variable("$y"), None);
        assert_eq!(child.get_variable("$x"), Some("child"));
    }

    #[test]
    fn test_child_sees_parent_snapshot() {
        let mut parent = empty_context();
        parent.set_variable("$a", "1");
        let child = parent.child();
        assert_eq!(child.get_variable("$a"), Some("1"));
    }

    #[test]
    fn test_bare_identifier_falls_back_to_dollar_form() {
        let mut ctx = empty_context();
        ctx.set_variable("$branch", "main");
        assert_eq!(ctx.get_variable("branch"), Some("main"));
        assert_eq!(ctx.get_variable("$branch"), Some("main"));
    }

    #[test]
    fn test_namespace_fallback() {
        let mut ctx = empty_context();
        ctx.current_namespace = "docker".to_string();
        ctx.set_variable("docker.registry", "ghcr.io");
        assert_eq!(ctx.get_variable("registry"), Some("ghcr.io"));
    }

    #[test]
    fn test_project_context_from_project() {
        let project = ProjectNode {
            name: "demo".to_string(),
            version: Some("1.0".to_string()),
            settings: vec![crate::ast::types::SettingNode {
                key: "registry".to_string(),
                value: "ghcr.io".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let ctx = ProjectContext::from_project(&project);
        assert_eq!(ctx.name, "demo");
        assert_eq!(ctx.settings.get("registry").map(String::as_str), Some("ghcr.io"));
    }
}
