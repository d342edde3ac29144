//! Typed conversation store over `mnemo-storage`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use mnemo_storage::{ProfileStorage, Storage};

use super::{ChatMessage, ConversationStore, ConversationSummary};
use crate::error::{AiError, Result};
use crate::profile::{DEFAULT_PROFILE_ID, ProfileUpdate, UserProfile};

/// Conversation store backed by the embedded redb database.
#[derive(Clone)]
pub struct RedbConversationStore {
    storage: Arc<Storage>,
}

impl RedbConversationStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let storage = Storage::new(path).map_err(AiError::store)?;
        Ok(Self::new(Arc::new(storage)))
    }

    pub fn storage(&self) -> Arc<Storage> {
        self.storage.clone()
    }
}

#[async_trait]
impl ConversationStore for RedbConversationStore {
    async fn load_profile(&self) -> Result<Option<UserProfile>> {
        let Some(bytes) = self
            .storage
            .profile
            .get_raw(ProfileStorage::DEFAULT_KEY)
            .map_err(AiError::store)?
        else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn merge_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        let written = self
            .storage
            .profile
            .update_raw(ProfileStorage::DEFAULT_KEY, |current| {
                let mut profile = match current {
                    Some(bytes) => serde_json::from_slice::<UserProfile>(bytes)?,
                    None => UserProfile::with_id(DEFAULT_PROFILE_ID),
                };
                profile.apply(update);
                Ok(Some(serde_json::to_vec(&profile)?))
            })
            .map_err(AiError::store)?
            .ok_or_else(|| AiError::Store("Profile update wrote nothing".to_string()))?;

        Ok(serde_json::from_slice(&written)?)
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<()> {
        let bytes = serde_json::to_vec(message)?;
        self.storage
            .messages
            .append_raw(&message.session_id, &bytes)
            .map_err(AiError::store)?;
        Ok(())
    }

    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let entries = self
            .storage
            .messages
            .latest_by_session_raw(session_id, limit)
            .map_err(AiError::store)?;

        entries
            .iter()
            .map(|entry| serde_json::from_slice(&entry.data).map_err(AiError::from))
            .collect()
    }

    async fn append_summary(&self, summary: &ConversationSummary) -> Result<()> {
        let bytes = serde_json::to_vec(summary)?;
        self.storage
            .summaries
            .append_raw(&summary.session_id, &bytes)
            .map_err(AiError::store)?;
        Ok(())
    }

    async fn latest_summary(&self, session_id: &str) -> Result<Option<ConversationSummary>> {
        let entries = self
            .storage
            .summaries
            .latest_by_session_raw(session_id, 1)
            .map_err(AiError::store)?;

        match entries.last() {
            Some(entry) => Ok(Some(serde_json::from_slice(&entry.data)?)),
            None => Ok(None),
        }
    }
}
