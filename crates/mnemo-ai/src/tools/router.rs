use std::sync::Arc;

use serde_json::Value;

use super::{ToolInvocation, ToolKind, ToolOutcome};
use crate::error::AiError;
use crate::profile::ProfileManager;
use crate::retrieval::RetrievalService;

/// Dispatches resolved tool calls to the profile manager or retrieval
/// service. Every error becomes a failed outcome.
pub struct ToolRouter {
    profile: Arc<ProfileManager>,
    retrieval: Arc<RetrievalService>,
}

impl ToolRouter {
    pub fn new(profile: Arc<ProfileManager>, retrieval: Arc<RetrievalService>) -> Self {
        Self { profile, retrieval }
    }

    pub async fn dispatch(&self, invocation: &ToolInvocation) -> ToolOutcome {
        let outcome = match invocation.kind {
            ToolKind::ProfileUpdate => self.update_profile(&invocation.arguments).await,
            ToolKind::RetrievalSearch => self.search(&invocation.arguments).await,
        };
        tracing::info!(
            tool = invocation.kind.name(),
            status = %outcome.status,
            "Tool dispatched"
        );
        outcome
    }

    async fn update_profile(&self, arguments: &Value) -> ToolOutcome {
        // Models send either `{"user_info": {...}}` or the fields directly.
        let fields = match arguments.get("user_info") {
            Some(inner @ Value::Object(_)) => inner,
            _ => arguments,
        };

        match self.profile.merge(fields).await {
            Ok(_) => ToolOutcome::succeeded("User information updated."),
            Err(AiError::Validation(message)) => ToolOutcome::failed(message),
            Err(error) => ToolOutcome::failed(format!("Error: {error}")),
        }
    }

    async fn search(&self, arguments: &Value) -> ToolOutcome {
        match arguments.get("query").and_then(Value::as_str).map(str::trim) {
            Some(query) if !query.is_empty() => self.retrieval.search(query).await,
            _ => ToolOutcome::failed("Please provide a non-empty 'query' string."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, ModelGateway};
    use crate::retrieval::{InMemoryRetrievalStore, NO_RELEVANT_INFORMATION};
    use crate::store::{ConversationStore, InMemoryConversationStore};
    use serde_json::json;

    async fn router() -> (Arc<InMemoryConversationStore>, ToolRouter) {
        let store = Arc::new(InMemoryConversationStore::new());
        let profile = Arc::new(ProfileManager::load(store.clone()).await.unwrap());
        let gateway = Arc::new(ModelGateway::new(Arc::new(MockLlmClient::new("mock"))));
        let retrieval = Arc::new(RetrievalService::new(
            Arc::new(InMemoryRetrievalStore::new()),
            gateway,
            3,
        ));
        (store, ToolRouter::new(profile, retrieval))
    }

    #[tokio::test]
    async fn test_profile_update_accepts_wrapped_and_bare_arguments() {
        let (store, router) = router().await;

        let wrapped = ToolInvocation::new(
            ToolKind::ProfileUpdate,
            json!({"user_info": {"name": "Alex"}}),
        );
        let bare = ToolInvocation::new(ToolKind::ProfileUpdate, json!({"occupation": "Nurse"}));

        assert!(router.dispatch(&wrapped).await.is_success());
        assert!(router.dispatch(&bare).await.is_success());

        let stored = store.load_profile().await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Alex"));
        assert_eq!(stored.occupation.as_deref(), Some("Nurse"));
    }

    #[tokio::test]
    async fn test_invalid_profile_key_is_failed_outcome() {
        let (store, router) = router().await;
        let outcome = router
            .dispatch(&ToolInvocation::new(
                ToolKind::ProfileUpdate,
                json!({"ssn": "123"}),
            ))
            .await;

        assert_eq!(outcome.status.as_str(), "Function call failed.");
        assert!(outcome.detail.starts_with("Please provide a valid key"));
        assert!(store.load_profile().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let (_store, router) = router().await;

        let missing = router
            .dispatch(&ToolInvocation::new(ToolKind::RetrievalSearch, json!({})))
            .await;
        assert!(!missing.is_success());

        let empty_index = router
            .dispatch(&ToolInvocation::new(
                ToolKind::RetrievalSearch,
                json!({"query": "hobbies"}),
            ))
            .await;
        assert_eq!(empty_index.detail, NO_RELEVANT_INFORMATION);
    }
}
