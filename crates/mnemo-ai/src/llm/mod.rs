//! LLM module - client abstraction, OpenAI provider, and the model gateway

mod client;
mod gateway;
mod mock_client;
mod openai;
mod retry;

pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, TokenUsage,
    ToolCall,
};
pub use gateway::{GatewayReply, ModelGateway};
pub use mock_client::{MockLlmClient, MockStep, MockStepKind};
pub use openai::{DEFAULT_OPENAI_BASE_URL, OpenAIClient};
pub use retry::LlmRetryConfig;
