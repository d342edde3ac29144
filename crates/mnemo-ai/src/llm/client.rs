//! Provider-neutral completion contract.
//!
//! Every call the gateway makes is a single prompt block, optionally followed
//! by the user's turn. No multi-turn history crosses this boundary: prior
//! exchanges travel inside the prompt as JSON.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::tools::ToolSchema;

/// Who a prompt segment is attributed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    /// Role name on the chat-completions wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A tool the model asked for. Arguments are already decoded from the wire
/// string; undecodable text is kept as a JSON string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    /// Output hit `max_tokens`.
    Truncated,
    Other,
}

impl FinishReason {
    pub(crate) fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            None | Some("stop") => Self::Stop,
            Some("tool_calls" | "function_call") => Self::ToolCalls,
            Some("length") => Self::Truncated,
            Some(_) => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Content with at least one non-whitespace character.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|text| !text.trim().is_empty())
    }

    /// Only the first requested tool is ever acted on.
    pub fn into_first_tool_call(self) -> Option<ToolCall> {
        self.tool_calls.into_iter().next()
    }
}

/// One model call.
///
/// `messages` holds the prompt block and, for conversational calls, the
/// user's turn after it. An empty `tools` list means no catalog is offered.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// System prompt followed by the user's message.
    pub fn turn(system_prompt: impl Into<String>, user_turn: impl Into<String>) -> Self {
        Self::from_messages(vec![Message::system(system_prompt), Message::user(user_turn)])
    }

    /// Self-contained instructions sent as a system message.
    pub fn instruction(prompt: impl Into<String>) -> Self {
        Self::from_messages(vec![Message::system(prompt)])
    }

    /// Self-contained prompt sent as a user message.
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self::from_messages(vec![Message::user(prompt)])
    }

    /// Offer `tools` to the model; `None` leaves the catalog out.
    pub fn offering(mut self, tools: Option<&[ToolSchema]>) -> Self {
        self.tools = tools.map(<[ToolSchema]>::to_vec).unwrap_or_default();
        self
    }

    pub fn sampled_at(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn capped_at(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// The last user-attributed segment.
    pub fn user_turn(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }
}

/// A chat-completions backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
