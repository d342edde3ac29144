//! Durable conversation store: profile row, message log, summary log.

mod memory;
mod redb_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::profile::{ProfileUpdate, UserProfile};

pub use memory::InMemoryConversationStore;
pub use redb_store::RedbConversationStore;

/// One persisted question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        session_id: impl Into<String>,
        user_id: Option<i64>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            user_id,
            question: question.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An abstractive digest of earlier exchanges in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationSummary {
    pub fn new(session_id: impl Into<String>, user_id: Option<i64>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Durable storage consumed by the conversation core.
///
/// Message and summary logs are append-only and ordered by insertion time
/// within a session.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load_profile(&self) -> Result<Option<UserProfile>>;

    /// Apply `update` to the stored profile atomically, creating the row when
    /// missing. Returns the stored result.
    async fn merge_profile(&self, update: &ProfileUpdate) -> Result<UserProfile>;

    async fn append_message(&self, message: &ChatMessage) -> Result<()>;

    /// Newest `limit` messages of a session, oldest first.
    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>>;

    async fn append_summary(&self, summary: &ConversationSummary) -> Result<()>;

    async fn latest_summary(&self, session_id: &str) -> Result<Option<ConversationSummary>>;
}
