use std::sync::Arc;

use chrono::Utc;

use super::RetrievalStore;
use crate::llm::ModelGateway;
use crate::maintenance::MaintenanceStatus;
use crate::tools::ToolOutcome;

pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found in the chat history.";

pub const RAG_SYSTEM_PROMPT: &str = "You will receive a user query and the search results retrieved from a chat history vector database. The search results will include the most likely relevant responses to the query.

Your task is to summarize the key information from both the query and the search results in a clear and concise manner.

Remember keep it concise and focus on the most relevant information.";

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Fresh retrieval unit id: `msg_<unix millis>_<9 random base36 chars>`.
pub fn unit_id() -> String {
    let suffix: String = uuid::Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(ID_SUFFIX_LEN)
        .map(|byte| BASE36[*byte as usize % BASE36.len()] as char)
        .collect();
    format!("msg_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Text indexed for one exchange.
pub fn unit_text(question: &str, answer: &str) -> String {
    format!("user: {}, assistant: {}", question, answer)
}

/// Indexes finished turns and answers `search_vector_db` calls.
pub struct RetrievalService {
    store: Arc<dyn RetrievalStore>,
    gateway: Arc<ModelGateway>,
    top_k: usize,
}

impl RetrievalService {
    pub fn new(store: Arc<dyn RetrievalStore>, gateway: Arc<ModelGateway>, top_k: usize) -> Self {
        Self {
            store,
            gateway,
            top_k,
        }
    }

    pub fn store(&self) -> &Arc<dyn RetrievalStore> {
        &self.store
    }

    /// Index one completed exchange. Never fails the turn.
    pub async fn index_turn(&self, question: &str, answer: &str) -> MaintenanceStatus {
        if !self.store.is_enabled() {
            return MaintenanceStatus::skipped("retrieval disabled");
        }

        let id = unit_id();
        match self.store.index(&unit_text(question, answer), &id).await {
            Ok(()) => {
                tracing::debug!(unit_id = %id, backend = self.store.name(), "Indexed exchange");
                MaintenanceStatus::Applied
            }
            Err(error) => MaintenanceStatus::degraded(error),
        }
    }

    /// Search past exchanges and condense the hits.
    ///
    /// An unreachable index reads as "nothing found"; only a failed
    /// condensation call fails the tool.
    pub async fn search(&self, query: &str) -> ToolOutcome {
        let hits = match self.store.query(query, self.top_k).await {
            Ok(hits) => hits,
            Err(error) => {
                tracing::warn!(%error, "Retrieval query failed; treating as no results");
                Vec::new()
            }
        };

        tracing::info!(query, hits = hits.len(), "Vector search completed");
        if hits.is_empty() {
            return ToolOutcome::succeeded(NO_RELEVANT_INFORMATION);
        }

        let user_turn = format!("Query: {}\n\nSearch Results:\n{}", query, hits.join("\n\n"));
        match self.gateway.condense(RAG_SYSTEM_PROMPT, &user_turn).await {
            Ok(condensed) => ToolOutcome::succeeded(condensed),
            Err(error) => ToolOutcome::failed(format!("Error: {error}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AiError, Result};
    use crate::llm::{MockLlmClient, MockStep};
    use crate::retrieval::{InMemoryRetrievalStore, NullRetrievalStore};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl RetrievalStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn index(&self, _text: &str, _id: &str) -> Result<()> {
            Err(AiError::Retrieval("connection refused".to_string()))
        }

        async fn query(&self, _text: &str, _k: usize) -> Result<Vec<String>> {
            Err(AiError::Retrieval("connection refused".to_string()))
        }
    }

    fn service(store: Arc<dyn RetrievalStore>, steps: Vec<MockStep>) -> (MockLlmClient, RetrievalService) {
        let client = MockLlmClient::from_steps("mock-rag", steps);
        let gateway = Arc::new(ModelGateway::new(Arc::new(client.clone())));
        (client, RetrievalService::new(store, gateway, 3))
    }

    #[test]
    fn test_unit_id_shape() {
        let id = unit_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "msg");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert_ne!(unit_id(), unit_id());
    }

    #[tokio::test]
    async fn test_empty_results_skip_the_model() {
        let (client, service) = service(Arc::new(InMemoryRetrievalStore::new()), vec![]);
        let outcome = service.search("what is my dog called").await;
        assert!(outcome.is_success());
        assert_eq!(outcome.detail, NO_RELEVANT_INFORMATION);
        assert_eq!(client.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_hits_are_condensed_by_the_model() {
        let store = Arc::new(InMemoryRetrievalStore::new());
        store
            .index(&unit_text("my dog is Rex", "Cute!"), "msg_1")
            .await
            .unwrap();
        let (client, service) = service(store, vec![MockStep::text("The dog is named Rex.")]);

        let outcome = service.search("dog name").await;
        assert_eq!(outcome, ToolOutcome::succeeded("The dog is named Rex."));

        let request = &client.requests().await[0];
        assert_eq!(request.messages[0].content, RAG_SYSTEM_PROMPT);
        assert!(request.messages[1].content.starts_with("Query: dog name"));
        assert!(request.messages[1].content.contains("user: my dog is Rex, assistant: Cute!"));
    }

    #[tokio::test]
    async fn test_condensation_error_fails_the_tool() {
        let store = Arc::new(InMemoryRetrievalStore::new());
        store.index("user: dog, assistant: yes", "msg_1").await.unwrap();
        let (_client, service) = service(store, vec![MockStep::error("rag model down")]);

        let outcome = service.search("dog").await;
        assert!(!outcome.is_success());
        assert!(outcome.detail.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_broken_store_degrades() {
        let (client, service) = service(Arc::new(BrokenStore), vec![]);

        assert!(service.index_turn("q", "a").await.is_degraded());
        let outcome = service.search("anything").await;
        assert_eq!(outcome, ToolOutcome::succeeded(NO_RELEVANT_INFORMATION));
        assert_eq!(client.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_null_store_skips_indexing() {
        let (_client, service) = service(Arc::new(NullRetrievalStore), vec![]);
        assert!(matches!(
            service.index_turn("q", "a").await,
            MaintenanceStatus::Skipped(_)
        ));
    }
}
