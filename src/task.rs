//! Units of work executed by the crew.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::agent::Agent;
use crate::llm::TokenUsage;
use crate::tools::Tool;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task '{task}' cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        task: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Task status enumeration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is waiting for its turn
    Pending,
    /// Task is currently running
    Running,
    /// Task completed successfully
    Completed,
    /// Task failed with an error
    Failed,
}

/// One tool (or sandbox) invocation made while working on a task.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub args: Value,
    pub success: bool,
    /// Leading part of the result or error text
    pub excerpt: String,
}

/// What an agent produced for a task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub task: String,
    pub agent_role: String,
    /// Final answer, persisted verbatim when the task has an output file
    pub raw: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub usage: TokenUsage,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

enum TaskState {
    Pending,
    Running,
    Completed(TaskOutput),
    Failed(String),
}

impl TaskState {
    fn status(&self) -> TaskStatus {
        match self {
            Self::Pending => TaskStatus::Pending,
            Self::Running => TaskStatus::Running,
            Self::Completed(_) => TaskStatus::Completed,
            Self::Failed(_) => TaskStatus::Failed,
        }
    }
}

/// A unit of work: what to do, what the result should look like, who does
/// it, with which tools, and optionally where the result is written.
///
/// The agent and tools are shared, not owned. Only the state changes after
/// construction, and only forward: pending, running, then completed or failed.
pub struct Task {
    name: String,
    description: String,
    expected_output: String,
    agent: Arc<Agent>,
    tools: Vec<Arc<dyn Tool>>,
    output_file: Option<PathBuf>,
    state: TaskState,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: Arc<Agent>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
            tools: Vec::new(),
            output_file: None,
            state: TaskState::Pending,
        }
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Contract for the result. Documentation for the agent; not validated.
    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    /// The recorded result, once completed.
    pub fn output(&self) -> Option<&TaskOutput> {
        match &self.state {
            TaskState::Completed(output) => Some(output),
            _ => None,
        }
    }

    /// The failure reason, once failed.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            TaskState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub(crate) fn start(&mut self) -> Result<(), TaskError> {
        match self.state {
            TaskState::Pending => {
                self.state = TaskState::Running;
                Ok(())
            }
            _ => Err(self.invalid(TaskStatus::Running)),
        }
    }

    pub(crate) fn complete(&mut self, output: TaskOutput) -> Result<(), TaskError> {
        match self.state {
            TaskState::Running => {
                self.state = TaskState::Completed(output);
                Ok(())
            }
            _ => Err(self.invalid(TaskStatus::Completed)),
        }
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) -> Result<(), TaskError> {
        match self.state {
            TaskState::Running => {
                self.state = TaskState::Failed(reason.into());
                Ok(())
            }
            _ => Err(self.invalid(TaskStatus::Failed)),
        }
    }

    fn invalid(&self, to: TaskStatus) -> TaskError {
        TaskError::InvalidTransition {
            task: self.name.clone(),
            from: self.status(),
            to,
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("agent", &self.agent.role())
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("output_file", &self.output_file)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentProfile, AgentSettings};
    use crate::llm::{ChatMessage, ChatResponse, LlmClient, LlmError, ToolSchema};
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl LlmClient for Silent {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _tools: Option<&[ToolSchema]>,
        ) -> Result<ChatResponse, LlmError> {
            Ok(ChatResponse::text("ok"))
        }
    }

    fn task() -> Task {
        let agent = Arc::new(Agent::read_only(
            AgentProfile::new("Analyzer", "analyze", "expert"),
            AgentSettings::new("test-model"),
            Arc::new(Silent),
        ));
        Task::new("read_pdf", "Read the document", "An analysis", agent)
    }

    fn output() -> TaskOutput {
        TaskOutput {
            task: "read_pdf".to_string(),
            agent_role: "Analyzer".to_string(),
            raw: "A".to_string(),
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn lifecycle_moves_forward_once() {
        let mut task = task();
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(task.output().is_none());

        task.start().unwrap();
        assert_eq!(task.status(), TaskStatus::Running);

        task.complete(output()).unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.output().map(|o| o.raw.as_str()), Some("A"));

        let err = task.complete(output()).unwrap_err();
        assert!(matches!(
            err,
            TaskError::InvalidTransition {
                from: TaskStatus::Completed,
                to: TaskStatus::Completed,
                ..
            }
        ));
        assert!(task.start().is_err());
    }

    #[test]
    fn cannot_complete_without_starting() {
        let mut task = task();
        assert!(task.complete(output()).is_err());
        assert!(task.fail("boom").is_err());
    }

    #[test]
    fn failure_is_terminal() {
        let mut task = task();
        task.start().unwrap();
        task.fail("backend down").unwrap();
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.error(), Some("backend down"));
        assert!(task.complete(output()).is_err());
    }

    #[test]
    fn builder_binds_tools_and_output() {
        let task = task()
            .with_tool(Arc::new(crate::tools::FileReadTool::new("doc.pdf")))
            .with_output_file("out.py");
        assert_eq!(task.tools().len(), 1);
        assert_eq!(task.output_file(), Some(Path::new("out.py")));
        assert_eq!(task.expected_output(), "An analysis");
    }
}
