//! Conversation agent
//!
//! Each turn runs a small state machine:
//!
//! 1. Build the system prompt (profile, latest summary, transcript, previous
//!    tool outcome)
//! 2. Call the chat model with the tool catalog
//! 3. Content ends the turn; a tool request is dispatched and its outcome
//!    folded into the next prompt
//! 4. After a successful tool or once the budget is spent, only a text answer
//!    is accepted
//!
//! ```rust,ignore
//! let orchestrator = ConversationOrchestrator::new(store, gateway, retrieval, ChatConfig::default()).await?;
//! let answer = orchestrator.chat("My name is Alex").await;
//! ```

mod config;
mod orchestrator;
mod prompt;
mod session;
mod state;

pub use config::ChatConfig;
pub use orchestrator::ConversationOrchestrator;
pub use prompt::{FUNCTION_LIMIT_DIRECTIVE, PromptContext, build_system_prompt, outcome_section};
pub use session::{SessionContext, SessionPool};
pub use state::{
    ChatState, FALLBACK_APOLOGY, NO_RESPONSE_WARNING, ToolCallRecord, TurnPath, TurnReport,
};
