//! Mnemo AI - Conversational assistant with layered memory
//!
//! This crate provides:
//! - Tool-calling conversation loop with a bounded tool budget
//! - OpenAI-compatible chat and embedding clients
//! - Rolling transcript, durable summaries and token-budget compaction
//! - User profile kept current by the model through a tool
//! - Long-term retrieval over every past exchange

pub mod agent;
pub mod embedding;
pub mod error;
mod http_client;
pub mod llm;
pub mod maintenance;
pub mod memory;
pub mod profile;
pub mod retrieval;
pub mod store;
pub mod tools;

// Re-export commonly used types
pub use agent::{ChatConfig, ConversationOrchestrator, TurnPath, TurnReport};
pub use embedding::{EmbeddingConfig, EmbeddingProvider, OpenAIEmbedding};
pub use error::{AiError, Result};
pub use llm::{
    GatewayReply, LlmClient, LlmRetryConfig, Message, MockLlmClient, MockStep, ModelGateway,
    OpenAIClient, Role,
};
pub use maintenance::MaintenanceStatus;
pub use memory::{ContextCompactor, Exchange, MemoryManager, RollingTranscript};
pub use profile::{ProfileManager, UserProfile};
pub use retrieval::{
    InMemoryRetrievalStore, NullRetrievalStore, RetrievalBackend, RetrievalService,
    RetrievalStore, connect_retrieval,
};
pub use store::{
    ChatMessage, ConversationStore, ConversationSummary, InMemoryConversationStore,
    RedbConversationStore,
};
pub use tools::{ToolKind, ToolOutcome, ToolRouter, ToolSchema};
