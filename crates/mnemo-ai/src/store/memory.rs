use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ChatMessage, ConversationStore, ConversationSummary};
use crate::error::Result;
use crate::profile::{DEFAULT_PROFILE_ID, ProfileUpdate, UserProfile};

#[derive(Default)]
struct Tables {
    profile: Option<UserProfile>,
    messages: Vec<ChatMessage>,
    summaries: Vec<ConversationSummary>,
}

/// Process-local store for tests and throwaway sessions.
#[derive(Default)]
pub struct InMemoryConversationStore {
    tables: Mutex<Tables>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message across all sessions, in insertion order.
    pub fn all_messages(&self) -> Vec<ChatMessage> {
        self.tables.lock().messages.clone()
    }

    pub fn all_summaries(&self) -> Vec<ConversationSummary> {
        self.tables.lock().summaries.clone()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load_profile(&self) -> Result<Option<UserProfile>> {
        Ok(self.tables.lock().profile.clone())
    }

    async fn merge_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        let mut tables = self.tables.lock();
        let profile = tables
            .profile
            .get_or_insert_with(|| UserProfile::with_id(DEFAULT_PROFILE_ID));
        profile.apply(update);
        Ok(profile.clone())
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<()> {
        self.tables.lock().messages.push(message.clone());
        Ok(())
    }

    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let tables = self.tables.lock();
        let mut recent: Vec<ChatMessage> = tables
            .messages
            .iter()
            .rev()
            .filter(|message| message.session_id == session_id)
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }

    async fn append_summary(&self, summary: &ConversationSummary) -> Result<()> {
        self.tables.lock().summaries.push(summary.clone());
        Ok(())
    }

    async fn latest_summary(&self, session_id: &str) -> Result<Option<ConversationSummary>> {
        Ok(self
            .tables
            .lock()
            .summaries
            .iter()
            .rev()
            .find(|summary| summary.session_id == session_id)
            .cloned())
    }
}
