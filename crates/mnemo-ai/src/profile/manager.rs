use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::model::{ProfileUpdate, UserProfile};
use crate::error::Result;
use crate::store::ConversationStore;

/// Owns the cached profile row.
///
/// `merge` writes through to the store but leaves the cache alone; callers
/// decide when to `refresh`, so a turn never re-reads the row more than once.
pub struct ProfileManager {
    store: Arc<dyn ConversationStore>,
    cached: RwLock<Option<UserProfile>>,
}

impl ProfileManager {
    /// Create a manager and load the current row.
    pub async fn load(store: Arc<dyn ConversationStore>) -> Result<Self> {
        let manager = Self {
            store,
            cached: RwLock::new(None),
        };
        manager.refresh().await?;
        Ok(manager)
    }

    /// Populated fields of the cached profile.
    pub fn current(&self) -> Map<String, Value> {
        self.cached
            .read()
            .as_ref()
            .map(UserProfile::visible_fields)
            .unwrap_or_default()
    }

    /// Cached profile as prompt-ready JSON (`{}` when no profile exists).
    pub fn current_json(&self) -> String {
        Value::Object(self.current()).to_string()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.cached.read().as_ref().map(|profile| profile.id)
    }

    /// Validate `arguments` and merge them into the stored row.
    ///
    /// Any key outside the allow-list rejects the whole update before the
    /// store is touched.
    pub async fn merge(&self, arguments: &Value) -> Result<UserProfile> {
        let update = ProfileUpdate::from_json(arguments)?;
        let stored = self.store.merge_profile(&update).await?;
        tracing::info!(
            fields = ?update.fields().map(|f| f.as_str()).collect::<Vec<_>>(),
            "Profile updated"
        );
        Ok(stored)
    }

    /// Reload the cached profile from the store.
    pub async fn refresh(&self) -> Result<()> {
        let profile = self.store.load_profile().await?;
        *self.cached.write() = profile;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;
    use crate::store::InMemoryConversationStore;
    use serde_json::json;

    async fn manager() -> (Arc<InMemoryConversationStore>, ProfileManager) {
        let store = Arc::new(InMemoryConversationStore::new());
        let manager = ProfileManager::load(store.clone()).await.unwrap();
        (store, manager)
    }

    #[tokio::test]
    async fn test_empty_profile_renders_as_empty_object() {
        let (_store, manager) = manager().await;
        assert_eq!(manager.current_json(), "{}");
        assert_eq!(manager.user_id(), None);
    }

    #[tokio::test]
    async fn test_merge_does_not_refresh_cache() {
        let (_store, manager) = manager().await;
        manager.merge(&json!({"name": "Alex"})).await.unwrap();
        assert!(manager.current().is_empty());

        manager.refresh().await.unwrap();
        assert_eq!(manager.current()["name"], "Alex");
        assert_eq!(manager.user_id(), Some(1));
    }

    #[tokio::test]
    async fn test_rejected_merge_leaves_store_unchanged() {
        let (store, manager) = manager().await;
        manager.merge(&json!({"name": "Alex"})).await.unwrap();

        let error = manager
            .merge(&json!({"name": "Mallory", "ssn": "123"}))
            .await
            .unwrap_err();
        assert!(matches!(error, AiError::Validation(_)));

        let stored = store.load_profile().await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Alex"));
    }
}
