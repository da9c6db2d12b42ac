//! Reasoning capability: chat-completion types and the client trait.
//!
//! Agents only see [`LlmClient`]; the concrete backend is chosen when the
//! pipeline is built.

mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use openai::OpenAiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Reasoning backend unreachable: {0}")]
    Unavailable(String),

    #[error("Reasoning backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Failed to decode reasoning backend response: {0}")]
    Decode(String),

    #[error("Reasoning backend returned neither content nor tool calls")]
    EmptyResponse,
}

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in the conversation sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// A tool invocation requested by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.to_string(),
            },
        }
    }
}

/// Function name plus JSON-encoded arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

/// Tool description in the OpenAI function-tool format.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            tool_type: function_type(),
            function: FunctionSchema {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
    }
}

/// Raw backend reply.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub usage: Option<TokenUsage>,
}

/// What the backend decided to do on this turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    FinalAnswer(String),
    ToolRequests {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::default()
        }
    }

    /// Tool calls take precedence over content; a reply with neither is an error.
    pub fn into_completion(self) -> Result<Completion, LlmError> {
        match (self.tool_calls, self.content) {
            (Some(calls), content) if !calls.is_empty() => {
                Ok(Completion::ToolRequests { content, calls })
            }
            (_, Some(content)) => Ok(Completion::FinalAnswer(content)),
            _ => Err(LlmError::EmptyResponse),
        }
    }
}

/// A text-completion backend with optional tool calling.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_calls_win_over_content() {
        let response = ChatResponse {
            content: Some("let me check".to_string()),
            tool_calls: Some(vec![ToolCall::new("c1", "read_file", json!({}))]),
            usage: None,
        };
        match response.into_completion().unwrap() {
            Completion::ToolRequests { content, calls } => {
                assert_eq!(content.as_deref(), Some("let me check"));
                assert_eq!(calls[0].function.name, "read_file");
            }
            other => panic!("unexpected completion: {:?}", other),
        }
    }

    #[test]
    fn empty_tool_call_list_falls_back_to_content() {
        let response = ChatResponse {
            content: Some("done".to_string()),
            tool_calls: Some(Vec::new()),
            usage: None,
        };
        assert_eq!(
            response.into_completion().unwrap(),
            Completion::FinalAnswer("done".to_string())
        );
    }

    #[test]
    fn empty_reply_is_an_error() {
        assert!(matches!(
            ChatResponse::default().into_completion(),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn messages_serialize_in_openai_shape() {
        let msg = ChatMessage::tool_result("call_1", "ok");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"role": "tool", "content": "ok", "tool_call_id": "call_1"})
        );
    }
}
