//! Tools an agent may call while working on a task.
//!
//! Every tool binds its resource (a file path, a documentation URL) at
//! construction and is immutable afterwards. Tasks hold shared references to
//! their tools; agents build a [`ToolRegistry`] per task to dispatch calls.

mod docs;
mod file;
mod text;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::llm::ToolSchema;

pub use docs::DocsSearchTool;
pub use file::FileReadTool;
pub(crate) use text::truncate;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Documentation corpus {url} unavailable: {reason}")]
    CorpusUnavailable { url: String, reason: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// A named capability an agent may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<String, ToolError>;
}

/// Name and description of a registered tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Ordered set of tools available to one task.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a task's bound tools.
    ///
    /// A later tool with an already-registered name replaces the earlier one
    /// in place, so names stay unique and declaration order is kept.
    pub fn from_tools(tools: &[Arc<dyn Tool>]) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(Arc::clone(tool));
        }
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    pub fn get_tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|t| ToolSchema::function(t.name(), t.description(), t.parameters_schema()))
            .collect()
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.execute(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            self.0
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, args: Value) -> Result<String, ToolError> {
            Ok(format!("{}:{}", self.0, args))
        }
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let registry = ToolRegistry::from_tools(&[Arc::new(Echo("a")) as Arc<dyn Tool>]);
        let out = registry.execute("echo", json!({"x": 1})).await.unwrap();
        assert_eq!(out, r#"a:{"x":1}"#);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let registry = ToolRegistry::new();
        let err = registry.execute("missing", Value::Null).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "missing"));
    }

    #[test]
    fn duplicate_names_replace_in_place() {
        let registry = ToolRegistry::from_tools(&[
            Arc::new(Echo("first")) as Arc<dyn Tool>,
            Arc::new(Echo("second")) as Arc<dyn Tool>,
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_tools()[0].description, "second");
        assert_eq!(registry.get_tool_schemas()[0].function.name, "echo");
    }
}
