//! Core agent loop implementation.

use chrono::Utc;
use serde_json::{json, Value};

use crate::context::ExecutionContext;
use crate::events::{CrewEvent, EventSink};
use crate::llm::{ChatMessage, Completion, TokenUsage, ToolCall, ToolSchema};
use crate::sandbox::{Sandbox, SandboxError};
use crate::task::{Task, TaskOutput, ToolCallRecord};
use crate::tools::{truncate, ToolError, ToolRegistry};

use super::prompt::{build_system_prompt, build_task_prompt};
use super::{AgentCore, AgentError, RUN_CODE_TOOL};

const EXCERPT_CHARS: usize = 500;

/// Most recent failure, reported if the agent gives up.
enum CallFailure {
    Tool { tool: String, error: ToolError },
    Sandbox(SandboxError),
}

impl CallFailure {
    fn message(&self) -> String {
        match self {
            Self::Tool { error, .. } => error.to_string(),
            Self::Sandbox(error) => error.to_string(),
        }
    }

    fn into_agent_error(self) -> AgentError {
        match self {
            Self::Tool { tool, error } => AgentError::ToolInvocation { tool, source: error },
            Self::Sandbox(error) => AgentError::Execution(error),
        }
    }
}

pub(super) async fn run(
    core: &AgentCore,
    sandbox: Option<&Sandbox>,
    task: &Task,
    context: &ExecutionContext,
    events: &EventSink,
) -> Result<TaskOutput, AgentError> {
    let started_at = Utc::now();
    let tools = ToolRegistry::from_tools(task.tools());

    let mut messages = vec![
        ChatMessage::system(build_system_prompt(&core.profile, &tools, sandbox.is_some())),
        ChatMessage::user(build_task_prompt(task, context)),
    ];

    let mut tool_schemas = tools.get_tool_schemas();
    if sandbox.is_some() {
        tool_schemas.push(run_code_schema());
    }

    let mut usage = TokenUsage::default();
    let mut records = Vec::new();
    let mut consecutive_failures = 0usize;

    for iteration in 0..core.settings.max_iterations {
        tracing::debug!(
            "Agent '{}' iteration {} on task '{}'",
            core.profile.role,
            iteration + 1,
            task.name()
        );

        let schemas = (!tool_schemas.is_empty()).then_some(tool_schemas.as_slice());
        let response = core
            .llm
            .chat_completion(&core.settings.model, &messages, schemas)
            .await?;

        if let Some(u) = &response.usage {
            usage.accumulate(u);
        }

        let (content, calls) = match response.into_completion()? {
            Completion::FinalAnswer(answer) => {
                return Ok(TaskOutput {
                    task: task.name().to_string(),
                    agent_role: core.profile.role.clone(),
                    raw: answer,
                    tool_calls: records,
                    usage,
                    started_at,
                    finished_at: Utc::now(),
                });
            }
            Completion::ToolRequests { content, calls } => (content, calls),
        };

        messages.push(ChatMessage::assistant_tool_calls(content, calls.clone()));

        for call in &calls {
            let args = parse_arguments(call);
            let args_value = args.as_ref().cloned().unwrap_or(Value::Null);
            let name = call.function.name.as_str();

            events.emit(CrewEvent::ToolCalled {
                task: task.name().to_string(),
                tool: name.to_string(),
                args: args_value.clone(),
            });

            let result = match (name, sandbox) {
                (RUN_CODE_TOOL, Some(sandbox)) => run_code(sandbox, args).await,
                _ => {
                    let outcome = match args {
                        Ok(args) => tools.execute(name, args).await,
                        Err(e) => Err(e),
                    };
                    outcome.map_err(|error| CallFailure::Tool {
                        tool: name.to_string(),
                        error,
                    })
                }
            };

            let (success, text) = match result {
                Ok(output) => {
                    consecutive_failures = 0;
                    (true, output)
                }
                Err(failure) => {
                    consecutive_failures += 1;
                    let text = format!("Error: {}", failure.message());
                    tracing::warn!(
                        "Tool '{}' failed for task '{}' ({} in a row): {}",
                        name,
                        task.name(),
                        consecutive_failures,
                        failure.message()
                    );
                    if consecutive_failures > core.settings.max_tool_failures {
                        return Err(failure.into_agent_error());
                    }
                    (false, text)
                }
            };

            let excerpt = truncate(&text, EXCERPT_CHARS);
            let event = if name == RUN_CODE_TOOL && sandbox.is_some() {
                CrewEvent::CodeExecuted {
                    task: task.name().to_string(),
                    success,
                    excerpt: excerpt.clone(),
                }
            } else {
                CrewEvent::ToolFinished {
                    task: task.name().to_string(),
                    tool: name.to_string(),
                    success,
                    excerpt: excerpt.clone(),
                }
            };
            events.emit(event);

            records.push(ToolCallRecord {
                tool: name.to_string(),
                args: args_value,
                success,
                excerpt,
            });

            messages.push(ChatMessage::tool_result(call.id.clone(), text));
        }
    }

    Err(AgentError::MalformedOutput(format!(
        "no final answer after {} iterations",
        core.settings.max_iterations
    )))
}

/// Empty argument strings mean "no arguments".
fn parse_arguments(call: &ToolCall) -> Result<Value, ToolError> {
    let raw = call.function.arguments.trim();
    if raw.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).map_err(|e| {
        ToolError::InvalidArguments(format!(
            "arguments for '{}' are not valid JSON: {}",
            call.function.name, e
        ))
    })
}

async fn run_code(sandbox: &Sandbox, args: Result<Value, ToolError>) -> Result<String, CallFailure> {
    let code = args
        .and_then(|args| {
            args["code"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ToolError::InvalidArguments("Missing 'code' argument".to_string()))
        })
        .map_err(|error| CallFailure::Tool {
            tool: RUN_CODE_TOOL.to_string(),
            error,
        })?;

    sandbox
        .run(&code)
        .await
        .map(|outcome| outcome.render())
        .map_err(CallFailure::Sandbox)
}

fn run_code_schema() -> ToolSchema {
    ToolSchema::function(
        RUN_CODE_TOOL,
        "Run a complete program in an isolated sandbox with a time and memory limit. Returns exit code, stdout and stderr.",
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Full source code of the program to run"
                }
            },
            "required": ["code"]
        }),
    )
}
