//! Engine Facade
//!
//! Orchestrates a run: version check, project construction with include
//! merging, target resolution, dependency ordering, lifecycle hooks,
//! parameter binding, and statement execution. The async entry points
//! bridge into the synchronous core with `block_in_place`, matching the
//! blocking collaborator seams.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use super::config::{EngineShared, RunConfig};
use super::context::{ExecutionContext, ProjectContext};
use super::dependencies::resolve_order;
use super::dispatch::StatementRunner;
use super::errors::{EngineError, ErrorKind};
use super::hooks::{HookChannel, HookManager};
use super::includes::merge_includes;
use super::output::Output;
use super::plan::Plan;
use super::value::Value;
use crate::ast::types::{ParameterNode, Program, TaskNode};
use crate::runner::shell::CancelToken;
use crate::runner::{
    IncludeFetcher, LocalIncludeFetcher, ShellLauncher, SystemShellLauncher, SystemToolDetector,
    ToolDetector,
};

/// Supported DSL major version.
const SUPPORTED_MAJOR: &str = "2";

/// Construction options; unset collaborators get system defaults.
#[derive(Default)]
pub struct EngineOptions {
    pub launcher: Option<Arc<dyn ShellLauncher>>,
    pub detector: Option<Arc<dyn ToolDetector>>,
    pub fetcher: Option<Arc<dyn IncludeFetcher>>,
    pub output: Option<Output>,
    pub config: RunConfig,
}

/// One entry of `ListTasks`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSummary {
    pub name: String,
    pub description: String,
}

/// The execution engine. All state lives on the instance; no globals.
pub struct Engine {
    launcher: Arc<dyn ShellLauncher>,
    detector: Arc<dyn ToolDetector>,
    fetcher: Arc<dyn IncludeFetcher>,
    output: Output,
    config: RunConfig,
    cancel: CancelToken,
    plan_cache: RwLock<HashMap<String, Vec<String>>>,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        let launcher = options
            .launcher
            .unwrap_or_else(|| Arc::new(SystemShellLauncher::new()));
        let detector = options
            .detector
            .unwrap_or_else(|| Arc::new(SystemToolDetector::new(launcher.clone())));
        let fetcher = options
            .fetcher
            .unwrap_or_else(|| Arc::new(LocalIncludeFetcher::new()));
        Self {
            launcher,
            detector,
            fetcher,
            output: options.output.unwrap_or_else(Output::stdout),
            config: options.config,
            cancel: CancelToken::new(),
            plan_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.config.dry_run = dry_run;
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
    }

    pub fn set_allow_undefined(&mut self, allow: bool) {
        self.config.allow_undefined = allow;
    }

    /// Handle the CLI trips on interrupt; checked before every dispatch.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Release caches. Idempotent.
    pub fn cleanup(&self) {
        self.plan_cache.write().unwrap().clear();
    }

    pub async fn execute(&self, program: &Program, task_name: &str) -> Result<(), EngineError> {
        self.execute_with_params(program, task_name, &HashMap::new())
            .await
    }

    pub async fn execute_with_params(
        &self,
        program: &Program,
        task_name: &str,
        params: &HashMap<String, String>,
    ) -> Result<(), EngineError> {
        tokio::task::block_in_place(|| self.execute_sync(program, task_name, params))
    }

    /// Declared or included tasks, in declaration order.
    pub fn list_tasks(&self, program: &Program) -> Result<Vec<TaskSummary>, EngineError> {
        let project = self.build_project(program)?;
        let registry = task_registry(program, &project);
        Ok(registry
            .values()
            .map(|task| TaskSummary {
                name: task.name.clone(),
                description: task.description.clone().unwrap_or_default(),
            })
            .collect())
    }

    /// Resolve the plan for a task without executing it.
    pub fn explain(&self, program: &Program, task_name: &str) -> Result<Plan, EngineError> {
        check_version(program)?;
        let project = self.build_project(program)?;
        let registry = task_registry(program, &project);
        let target = resolve_target(task_name, &registry)?;
        let order = resolve_order(&target, &registry)?;
        Ok(Plan::new(&order, &registry))
    }

    fn execute_sync(
        &self,
        program: &Program,
        task_name: &str,
        params: &HashMap<String, String>,
    ) -> Result<(), EngineError> {
        check_version(program)?;

        let project = Arc::new(self.build_project(program)?);
        let program = Arc::new(program.clone());
        let registry = task_registry(&program, &project);
        let target = resolve_target(task_name, &registry)?;
        let order = self.plan_for(&target, &registry)?;

        let shared = Arc::new(EngineShared {
            launcher: self.launcher.clone(),
            detector: self.detector.clone(),
            fetcher: self.fetcher.clone(),
            output: self.output.clone(),
            config: self.config.clone(),
            cancel: self.cancel.clone(),
        });
        let runner = StatementRunner::new(shared);

        warn_unknown_params(&self.output, params, &order, &registry, &project);

        if self.config.verbose {
            self.output
                .line(&format!("plan: {}", order.join(" -> ")));
        }

        let run_result = self.run_plan(&runner, &program, &project, &order, &registry, params);

        // Teardown runs exactly once, even after failure, and never masks
        // the run error
        let mut teardown_ctx = ExecutionContext::new(program, project.clone());
        HookManager::run_best_effort(
            &runner,
            &mut teardown_ctx,
            HookChannel::Teardown,
            &project.hooks.teardown,
        );

        run_result
    }

    /// Setup hooks plus the ordered task loop.
    fn run_plan(
        &self,
        runner: &StatementRunner,
        program: &Arc<Program>,
        project: &Arc<ProjectContext>,
        order: &[String],
        registry: &IndexMap<String, TaskNode>,
        params: &HashMap<String, String>,
    ) -> Result<(), EngineError> {
        let mut setup_ctx = ExecutionContext::new(program.clone(), project.clone());
        HookManager::run_strict(
            runner,
            &mut setup_ctx,
            HookChannel::Setup,
            &project.hooks.setup,
        )?;

        for name in order {
            let task = registry
                .get(name)
                .ok_or_else(|| EngineError::not_found(format!("task '{}' not found", name)))?
                .clone();

            let mut ctx = ExecutionContext::new(program.clone(), project.clone());
            ctx.current_task = name.clone();
            if let Some((namespace, _)) = name.rsplit_once('.') {
                ctx.current_namespace = namespace.to_string();
            }

            HookManager::run_strict(
                runner,
                &mut ctx,
                HookChannel::BeforeAnyTask,
                &project.hooks.before_any_task,
            )?;

            bind_parameters(&task, params, &mut ctx)?;

            if self.config.verbose {
                self.output.step(&format!("task: {}", name));
            }

            let body_result = runner.run_statements(&mut ctx, &task.body).map_err(|err| {
                if err.is_control_flow() {
                    EngineError::new(ErrorKind::Task, format!("{} outside of a loop", err.message))
                } else {
                    err
                }
            });

            HookManager::run_best_effort(
                runner,
                &mut ctx,
                HookChannel::AfterAnyTask,
                &project.hooks.after_any_task,
            );

            // Propagate immediately and skip the remaining tasks
            body_result?;
        }
        Ok(())
    }

    fn build_project(&self, program: &Program) -> Result<ProjectContext, EngineError> {
        let mut project = match &program.project {
            Some(node) => ProjectContext::from_project(node),
            None => ProjectContext::default(),
        };
        project.add_snippets(&program.snippets);
        if let Some(ref node) = program.project {
            merge_includes(&mut project, &node.includes, self.fetcher.as_ref())?;
        }
        Ok(project)
    }

    fn plan_for(
        &self,
        target: &str,
        registry: &IndexMap<String, TaskNode>,
    ) -> Result<Vec<String>, EngineError> {
        if self.config.cache_enabled {
            if let Some(cached) = self.plan_cache.read().unwrap().get(target) {
                return Ok(cached.clone());
            }
        }
        let order = resolve_order(target, registry)?;
        if self.config.cache_enabled {
            self.plan_cache
                .write()
                .unwrap()
                .insert(target.to_string(), order.clone());
        }
        Ok(order)
    }
}

fn check_version(program: &Program) -> Result<(), EngineError> {
    let version = program
        .version
        .as_deref()
        .ok_or_else(|| EngineError::config("missing 'version:' header"))?;
    let major = version.trim().split('.').next().unwrap_or_default();
    if major != SUPPORTED_MAJOR {
        return Err(EngineError::config(format!(
            "unsupported version '{}', expected {}.x",
            version, SUPPORTED_MAJOR
        )));
    }
    Ok(())
}

/// All known tasks: local declarations first, then namespaced includes.
fn task_registry(program: &Program, project: &ProjectContext) -> IndexMap<String, TaskNode> {
    let mut registry = IndexMap::new();
    for task in &program.tasks {
        registry.insert(task.name.clone(), task.clone());
    }
    for (key, task) in &project.included_tasks {
        registry.insert(key.clone(), task.clone());
    }
    registry
}

/// A task name resolves to exactly one registry key, possibly via its
/// namespaced form.
fn resolve_target(
    task_name: &str,
    registry: &IndexMap<String, TaskNode>,
) -> Result<String, EngineError> {
    if registry.contains_key(task_name) {
        return Ok(task_name.to_string());
    }
    let suffix = format!(".{}", task_name);
    let candidates: Vec<&String> = registry
        .keys()
        .filter(|key| key.ends_with(&suffix))
        .collect();
    match candidates.as_slice() {
        [single] => Ok((*single).clone()),
        [] => Err(EngineError::not_found(format!(
            "task '{}' not found",
            task_name
        ))),
        _ => Err(EngineError::not_found(format!(
            "task '{}' is ambiguous: {}",
            task_name,
            candidates
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Bind declared parameters — coercion, constraints, defaults, required
/// checks — and pass through extra inputs as strings. Extra inputs were
/// already reported by `warn_unknown_params`.
fn bind_parameters(
    task: &TaskNode,
    params: &HashMap<String, String>,
    ctx: &mut ExecutionContext,
) -> Result<(), EngineError> {
    for param in &task.parameters {
        match params.get(&param.name) {
            Some(raw) => {
                if !param.allowed.is_empty() && !param.allowed.contains(raw) {
                    return Err(EngineError::new(
                        ErrorKind::Constraint,
                        format!(
                            "value '{}' is not in allowed values: [{}]",
                            raw,
                            param.allowed.join(" ")
                        ),
                    ));
                }
                let value = Value::coerce(raw, param.param_type, &param.name)?;
                ctx.parameters.insert(param.name.clone(), value);
            }
            None => match &param.default {
                Some(default) => {
                    let value = Value::coerce(default, param.param_type, &param.name)?;
                    ctx.parameters.insert(param.name.clone(), value);
                }
                None if param.required => {
                    return Err(EngineError::new(
                        ErrorKind::MissingParameter,
                        format!(
                            "required parameter '{}' missing for task '{}'",
                            param.name, task.name
                        ),
                    ));
                }
                None => {}
            },
        }
    }
    let declared: HashSet<&str> = task.parameters.iter().map(|p| p.name.as_str()).collect();
    for (key, value) in params {
        if !declared.contains(key.as_str()) {
            ctx.parameters
                .entry(key.clone())
                .or_insert_with(|| Value::String(value.clone()));
        }
    }
    Ok(())
}

/// Inputs that no task in the plan and no project parameter declares are
/// reported once, up front.
fn warn_unknown_params(
    output: &Output,
    params: &HashMap<String, String>,
    order: &[String],
    registry: &IndexMap<String, TaskNode>,
    project: &ProjectContext,
) {
    let mut declared: HashSet<&str> = HashSet::new();
    for name in order {
        if let Some(task) = registry.get(name) {
            declared.extend(task.parameters.iter().map(|p: &ParameterNode| p.name.as_str()));
        }
    }
    declared.extend(project.parameters.iter().map(|p| p.name.as_str()));

    let mut unknown: Vec<&str> = params
        .keys()
        .map(String::as_str)
        .filter(|key| !declared.contains(key))
        .collect();
    unknown.sort_unstable();
    for key in unknown {
        output.warn(&format!(
            "{}: parameter '{}' is not declared by any task in the plan",
            ErrorKind::UnknownParameter.tag(),
            key
        ));
    }
}
