//! Include Resolution
//!
//! Merges `include "URL" [as NS]` fragments into the project context.
//! Each file gets a canonical cache key; keys are inserted into
//! `included_files` *before* recursing into nested includes, so circular
//! include chains terminate as no-ops. Snippets, templates, and tasks
//! land under `ns.name` keys; a key collision is an error.

use super::context::ProjectContext;
use super::errors::{EngineError, ErrorKind};
use crate::ast::types::IncludeNode;
use crate::runner::IncludeFetcher;

/// Canonical cache key: scheme + host lowered, path, optional `@revision`.
pub fn canonical_key(url: &str) -> String {
    let (without_rev, revision) = match url.rsplit_once('@') {
        // `user@host` style ssh URLs keep their `@`; only treat a suffix
        // after the path as a revision
        Some((head, rev)) if head.contains('/') => (head, Some(rev)),
        _ => (url, None),
    };
    let normalized = match without_rev.split_once("://") {
        Some((scheme, rest)) => {
            let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
            format!(
                "{}://{}/{}",
                scheme.to_ascii_lowercase(),
                host.to_ascii_lowercase(),
                path.trim_end_matches('/')
            )
        }
        None => without_rev.trim_end_matches('/').to_string(),
    };
    match revision {
        Some(rev) => format!("{}@{}", normalized, rev),
        None => normalized,
    }
}

/// Namespace for an include: explicit `as NS` or the filename stem.
fn namespace_for(include: &IncludeNode) -> String {
    if let Some(ref ns) = include.namespace {
        return ns.clone();
    }
    let path = include.url.rsplit('/').next().unwrap_or(&include.url);
    path.split('.').next().unwrap_or(path).to_string()
}

/// Fetch, parse, and merge every include into the project context.
pub fn merge_includes(
    project: &mut ProjectContext,
    includes: &[IncludeNode],
    fetcher: &dyn IncludeFetcher,
) -> Result<(), EngineError> {
    for include in includes {
        let key = canonical_key(&include.url);
        // Re-inclusion of a known key is a no-op; the insert-before-recurse
        // order is what breaks cycles
        if !project.included_files.insert(key) {
            continue;
        }

        let fragment = fetcher.fetch(&include.url)?;
        let namespace = namespace_for(include);

        for snippet in &fragment.snippets {
            let key = format!("{}.{}", namespace, snippet.name);
            if project.included_snippets.contains_key(&key) || project.snippets.contains_key(&key) {
                return Err(duplicate(&key, &include.url));
            }
            project.included_snippets.insert(key, snippet.clone());
        }
        for template in &fragment.templates {
            let key = format!("{}.{}", namespace, template.name);
            if project.included_templates.contains_key(&key) {
                return Err(duplicate(&key, &include.url));
            }
            project.included_templates.insert(key, template.clone());
        }
        for task in &fragment.tasks {
            let key = format!("{}.{}", namespace, task.name);
            if project.included_tasks.contains_key(&key) {
                return Err(duplicate(&key, &include.url));
            }
            let mut namespaced = task.clone();
            namespaced.name = key.clone();
            project.included_tasks.insert(key, namespaced);
        }

        if let Some(ref nested_project) = fragment.project {
            merge_includes(project, &nested_project.includes, fetcher)?;
        }
    }
    Ok(())
}

fn duplicate(key: &str, url: &str) -> EngineError {
    EngineError::new(
        ErrorKind::DuplicateInclude,
        format!("include '{}' redefines '{}'", url, key),
    )
}
