//! File-content tool: returns the contents of one fixed file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::text::{printable_runs, truncate};
use super::{Tool, ToolError};

const MAX_OUTPUT_CHARS: usize = 100_000;
const MIN_PRINTABLE_RUN: usize = 4;

/// Read the file bound at construction.
pub struct FileReadTool {
    path: PathBuf,
    description: String,
}

impl FileReadTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let description = format!(
            "Read the full content of the source document at {}. Takes no arguments.",
            path.display()
        );
        Self { path, description }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> Result<String, ToolError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ToolError::NotFound(self.path.clone()),
            _ => ToolError::Read {
                path: self.path.clone(),
                source: e,
            },
        })?;

        tracing::debug!("Read {} bytes from {}", bytes.len(), self.path.display());

        let content = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => printable_runs(e.as_bytes(), MIN_PRINTABLE_RUN),
        };

        Ok(truncate(&content, MAX_OUTPUT_CHARS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_text_content_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "line one\nline two\n").unwrap();

        let tool = FileReadTool::new(&path);
        assert_eq!(tool.execute(Value::Null).await.unwrap(), "line one\nline two\n");
    }

    #[tokio::test]
    async fn binary_content_is_reduced_to_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture.pdf");
        std::fs::write(&path, b"%PDF-1.4\n\xff\xfe\x00Newton method\x00\x01").unwrap();

        let out = FileReadTool::new(&path).execute(Value::Null).await.unwrap();
        assert!(out.contains("%PDF-1.4"));
        assert!(out.contains("Newton method"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.pdf");

        let err = FileReadTool::new(&path).execute(Value::Null).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(p) if p == path));
    }

    #[tokio::test]
    async fn directory_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileReadTool::new(dir.path()).execute(Value::Null).await.unwrap_err();
        assert!(matches!(err, ToolError::Read { .. }));
    }
}
