//! Prompt templates for agents.

use crate::context::ExecutionContext;
use crate::task::Task;
use crate::tools::ToolRegistry;

use super::{AgentProfile, RUN_CODE_TOOL};

/// Build the system prompt: persona, available tools and execution rights.
pub fn build_system_prompt(profile: &AgentProfile, tools: &ToolRegistry, can_execute: bool) -> String {
    let tool_section = if tools.is_empty() {
        "You have no tools for this task. Work from the task and the context you are given.".to_string()
    } else {
        let list = tools
            .list_tools()
            .iter()
            .map(|t| format!("- **{}**: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n");
        format!("You have access to the following tools:\n{}", list)
    };

    let execution_section = if can_execute {
        format!(
            "You may run code you write with the **{}** tool. It runs in an isolated sandbox with a time and memory limit and returns the exit code, stdout and stderr. Use it to check that your code works before you answer.",
            RUN_CODE_TOOL
        )
    } else {
        "You cannot execute code.".to_string()
    };

    format!(
        r#"You are {role}.
{backstory}

Your personal goal is: {goal}

## Tools
{tool_section}

## Code Execution
{execution_section}

## Rules
1. Use tools when they help; don't guess what a document or page says.
2. If a tool returns an error, decide whether to retry differently or continue without it.
3. When you are done, reply with the final result only, with no tool call."#,
        role = profile.role,
        backstory = profile.backstory.trim(),
        goal = profile.goal,
        tool_section = tool_section,
        execution_section = execution_section,
    )
}

/// Build the user prompt for one task, including prior task results.
pub fn build_task_prompt(task: &Task, context: &ExecutionContext) -> String {
    let mut prompt = format!(
        "## Task\n{}\n\n## Expected Output\n{}",
        task.description().trim(),
        task.expected_output().trim()
    );

    if !context.is_empty() {
        prompt.push_str("\n\n## Context From Previous Tasks\n");
        prompt.push_str(&context.render());
    }

    prompt
}
