//! Include Fetcher
//!
//! Retrieves `.drun` files referenced by `include "URL"` and hands back
//! parsed AST fragments. Remote retrieval and parsing are external
//! collaborators; the engine only consumes this seam. The local fetcher
//! loads JSON-serialized programs from the filesystem.

use crate::ast::types::Program;
use crate::engine::errors::{EngineError, ErrorKind};

/// Fetcher seam consumed by the include resolver.
pub trait IncludeFetcher: Send + Sync {
    /// Fetch and parse the program fragment at `url`.
    fn fetch(&self, url: &str) -> Result<Program, EngineError>;
}

/// Fetcher for local paths and `file://` URLs holding JSON-serialized
/// program fragments.
#[derive(Debug, Default)]
pub struct LocalIncludeFetcher;

impl LocalIncludeFetcher {
    pub fn new() -> Self {
        Self
    }
}

impl IncludeFetcher for LocalIncludeFetcher {
    fn fetch(&self, url: &str) -> Result<Program, EngineError> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EngineError::new(ErrorKind::File, format!("cannot read include '{}': {}", path, e))
        })?;
        let mut program: Program = serde_json::from_str(&contents).map_err(|e| {
            EngineError::new(ErrorKind::Parse, format!("cannot parse include '{}': {}", path, e))
        })?;
        if program.source_file.is_none() {
            program.source_file = Some(path.to_string());
        }
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_a_file_error() {
        let fetcher = LocalIncludeFetcher::new();
        let err = fetcher.fetch("/nonexistent/include.json").unwrap_err();
        assert_eq!(err.kind, ErrorKind::File);
    }
}
