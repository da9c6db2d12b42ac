//! Agents: role-bound workers that turn a task into a result.
//!
//! An agent follows the "tools in a loop" pattern:
//! 1. Build the prompt from its persona, the task and prior results
//! 2. Call the reasoning capability with the task's tools
//! 3. If a tool is requested, execute it and feed the result back
//! 4. Repeat until a final answer or the iteration cap is reached
//!
//! Code execution is a capability of the [`ExecutingAgent`] variant only;
//! a [`ReadOnlyAgent`] has no sandbox to run anything in.

mod agent_loop;
mod prompt;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::context::ExecutionContext;
use crate::events::EventSink;
use crate::llm::{LlmClient, LlmError};
use crate::sandbox::{ExecutionOutcome, Sandbox, SandboxError};
use crate::task::{Task, TaskOutput};
use crate::tools::ToolError;

pub use prompt::{build_system_prompt, build_task_prompt};

/// Name of the built-in request executing agents use to run code.
pub const RUN_CODE_TOOL: &str = "run_code";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Reasoning capability unavailable: {0}")]
    CapabilityUnavailable(#[source] LlmError),

    #[error("Tool '{tool}' failed: {source}")]
    ToolInvocation {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("Sandboxed execution failed: {0}")]
    Execution(#[source] SandboxError),

    #[error("Malformed output: {0}")]
    MalformedOutput(String),
}

impl From<LlmError> for AgentError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::EmptyResponse => Self::MalformedOutput(err.to_string()),
            other => Self::CapabilityUnavailable(other),
        }
    }
}

/// Who the agent is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl AgentProfile {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }
}

/// How the agent talks to its reasoning capability.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Model identifier passed to the capability
    pub model: String,

    /// Capability calls allowed per task
    pub max_iterations: usize,

    /// Consecutive failing tool calls tolerated per task
    pub max_tool_failures: usize,
}

impl AgentSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_iterations: 15,
            max_tool_failures: 3,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.default_model.clone(),
            max_iterations: config.max_iterations,
            max_tool_failures: config.max_tool_failures,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// State shared by both agent variants.
struct AgentCore {
    profile: AgentProfile,
    settings: AgentSettings,
    llm: Arc<dyn LlmClient>,
}

/// Agent limited to reasoning and the task's tools.
pub struct ReadOnlyAgent {
    core: AgentCore,
}

/// Agent that may additionally run the code it writes in a sandbox.
pub struct ExecutingAgent {
    core: AgentCore,
    sandbox: Sandbox,
}

impl ExecutingAgent {
    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Run code under the sandbox's time and memory limits.
    pub async fn run_sandboxed(&self, code: &str) -> Result<ExecutionOutcome, AgentError> {
        self.sandbox.run(code).await.map_err(AgentError::Execution)
    }
}

pub enum Agent {
    ReadOnly(ReadOnlyAgent),
    Executing(ExecutingAgent),
}

impl Agent {
    pub fn read_only(profile: AgentProfile, settings: AgentSettings, llm: Arc<dyn LlmClient>) -> Self {
        Self::ReadOnly(ReadOnlyAgent {
            core: AgentCore {
                profile,
                settings,
                llm,
            },
        })
    }

    pub fn executing(
        profile: AgentProfile,
        settings: AgentSettings,
        llm: Arc<dyn LlmClient>,
        sandbox: Sandbox,
    ) -> Self {
        Self::Executing(ExecutingAgent {
            core: AgentCore {
                profile,
                settings,
                llm,
            },
            sandbox,
        })
    }

    fn core(&self) -> &AgentCore {
        match self {
            Self::ReadOnly(a) => &a.core,
            Self::Executing(a) => &a.core,
        }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.core().profile
    }

    pub fn role(&self) -> &str {
        &self.core().profile.role
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.core().settings
    }

    pub fn can_execute(&self) -> bool {
        matches!(self, Self::Executing(_))
    }

    pub fn as_executing(&self) -> Option<&ExecutingAgent> {
        match self {
            Self::Executing(a) => Some(a),
            Self::ReadOnly(_) => None,
        }
    }

    /// Produce a result for `task` given everything completed before it.
    pub async fn execute(
        &self,
        task: &Task,
        context: &ExecutionContext,
        events: &EventSink,
    ) -> Result<TaskOutput, AgentError> {
        let sandbox = self.as_executing().map(|a| &a.sandbox);
        agent_loop::run(self.core(), sandbox, task, context, events).await
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("role", &self.role())
            .field("model", &self.settings().model)
            .field("can_execute", &self.can_execute())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SandboxConfig;
    use crate::llm::{ChatMessage, ChatResponse, ToolSchema};
    use async_trait::async_trait;

    struct Mute;

    #[async_trait]
    impl LlmClient for Mute {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _tools: Option<&[ToolSchema]>,
        ) -> Result<ChatResponse, LlmError> {
            Err(LlmError::Unavailable("offline".to_string()))
        }
    }

    fn profile() -> AgentProfile {
        AgentProfile::new("Tester", "Test", "Tests things.")
    }

    #[test]
    fn empty_reply_is_malformed_output() {
        assert!(matches!(
            AgentError::from(LlmError::EmptyResponse),
            AgentError::MalformedOutput(_)
        ));
        assert!(matches!(
            AgentError::from(LlmError::Http {
                status: 500,
                message: "boom".to_string()
            }),
            AgentError::CapabilityUnavailable(_)
        ));
    }

    #[test]
    fn read_only_agent_has_no_sandbox() {
        let agent = Agent::read_only(profile(), AgentSettings::new("m"), Arc::new(Mute));
        assert!(!agent.can_execute());
        assert!(agent.as_executing().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn executing_agent_runs_code() {
        let sandbox = Sandbox::new(&SandboxConfig {
            interpreter: "sh".to_string(),
            timeout_ms: 5_000,
            memory_mb: 256,
        });
        let agent = Agent::executing(profile(), AgentSettings::new("m"), Arc::new(Mute), sandbox);

        let executing = agent.as_executing().unwrap();
        let outcome = executing.run_sandboxed("echo hello").await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout.trim(), "hello");

        let err = executing.run_sandboxed("exit 3").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Execution(SandboxError::Failed { exit_code: 3, .. })
        ));
    }

    #[test]
    fn settings_follow_config() {
        let mut config = Config::new("k".to_string(), "gpt-4o".to_string());
        config.max_iterations = 4;
        let settings = AgentSettings::from_config(&config).with_model("other");
        assert_eq!(settings.model, "other");
        assert_eq!(settings.max_iterations, 4);
        assert_eq!(settings.max_tool_failures, 3);
    }
}
