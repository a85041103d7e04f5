//! Plan Export
//!
//! Renders a resolved task plan as Graphviz DOT, Mermaid, or JSON. The
//! JSON structure is `{nodes: [{id, task, dependsOn, parameters}]}`.

use indexmap::IndexMap;
use serde::Serialize;

use super::errors::{EngineError, ErrorKind};
use crate::ast::types::TaskNode;

/// One task in the plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanNode {
    pub id: usize,
    pub task: String,
    #[serde(rename = "dependsOn")]
    pub depends_on: Vec<String>,
    /// Declared parameters: default value, or `<required>`
    pub parameters: IndexMap<String, String>,
}

/// An ordered task plan.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub nodes: Vec<PlanNode>,
}

impl Plan {
    /// Build from a resolved order and the task registry.
    pub fn new(order: &[String], tasks: &IndexMap<String, TaskNode>) -> Self {
        let nodes = order
            .iter()
            .enumerate()
            .map(|(id, name)| {
                let task = tasks.get(name);
                let depends_on = task.map(|t| t.depends_on.clone()).unwrap_or_default();
                let mut parameters = IndexMap::new();
                if let Some(task) = task {
                    for param in &task.parameters {
                        let value = param
                            .default
                            .clone()
                            .unwrap_or_else(|| "<required>".to_string());
                        parameters.insert(param.name.clone(), value);
                    }
                }
                PlanNode {
                    id,
                    task: name.clone(),
                    depends_on,
                    parameters,
                }
            })
            .collect();
        Self { nodes }
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::new(ErrorKind::Config, format!("plan export failed: {}", e)))
    }

    /// Graphviz DOT with one edge per dependency.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph plan {\n");
        for node in &self.nodes {
            out.push_str(&format!("    \"{}\";\n", node.task));
        }
        for node in &self.nodes {
            for dep in &node.depends_on {
                out.push_str(&format!("    \"{}\" -> \"{}\";\n", node.task, dep));
            }
        }
        out.push_str("}\n");
        out
    }

    /// Mermaid flowchart, top-down.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");
        for node in &self.nodes {
            if node.depends_on.is_empty() {
                out.push_str(&format!("    {}[\"{}\"]\n", mermaid_id(&node.task), node.task));
            }
            for dep in &node.depends_on {
                out.push_str(&format!(
                    "    {}[\"{}\"] --> {}[\"{}\"]\n",
                    mermaid_id(dep),
                    dep,
                    mermaid_id(&node.task),
                    node.task
                ));
            }
        }
        out
    }
}

fn mermaid_id(name: &str) -> String {
    name.replace(['.', '-', ' '], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::ParameterNode;

    fn registry() -> IndexMap<String, TaskNode> {
        let mut tasks = IndexMap::new();
        tasks.insert(
            "build".to_string(),
            TaskNode {
                name: "build".to_string(),
                ..Default::default()
            },
        );
        tasks.insert(
            "deploy".to_string(),
            TaskNode {
                name: "deploy".to_string(),
                depends_on: vec!["build".to_string()],
                parameters: vec![ParameterNode {
                    name: "env".to_string(),
                    required: true,
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        tasks
    }

    fn plan() -> Plan {
        Plan::new(&["build".to_string(), "deploy".to_string()], &registry())
    }

    #[test]
    fn test_json_structure() {
        let json = plan().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nodes"][1]["task"], "deploy");
        assert_eq!(value["nodes"][1]["dependsOn"][0], "build");
        assert_eq!(value["nodes"][1]["parameters"]["env"], "<required>");
    }

    #[test]
    fn test_dot_contains_edge() {
        let dot = plan().to_dot();
        assert!(dot.starts_with("digraph plan {"));
        assert!(dot.contains("\"deploy\" -> \"build\";"));
    }

    #[test]
    fn test_mermaid_contains_edge() {
        let mermaid = plan().to_mermaid();
        assert!(mermaid.starts_with("graph TD"));
        assert!(mermaid.contains("build[\"build\"] --> deploy[\"deploy\"]"));
    }
}
