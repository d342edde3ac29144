//! Model gateway: the three model roles the conversation core talks to.

use std::sync::Arc;

use serde_json::Value;

use super::{CompletionRequest, LlmClient};
use crate::error::{AiError, Result};
use crate::tools::{ToolInvocation, ToolKind, ToolSchema};

/// What a chat completion asked for.
///
/// Content takes priority: a reply that carries both non-empty text and a tool
/// call is treated as an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayReply {
    Content(String),
    Tool(ToolInvocation),
    /// The model named a tool outside the catalog.
    UnknownTool { name: String, arguments: Value },
    /// Neither usable content nor a tool call.
    Empty,
}

/// Routes chat, summarization and retrieval-condensation calls to their
/// configured models.
#[derive(Clone)]
pub struct ModelGateway {
    chat: Arc<dyn LlmClient>,
    summarizer: Arc<dyn LlmClient>,
    condenser: Arc<dyn LlmClient>,
    temperature: f32,
}

impl ModelGateway {
    /// Use one client for every role.
    pub fn new(chat: Arc<dyn LlmClient>) -> Self {
        Self {
            summarizer: chat.clone(),
            condenser: chat.clone(),
            chat,
            temperature: 0.0,
        }
    }

    pub fn with_summarizer(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.summarizer = client;
        self
    }

    pub fn with_condenser(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.condenser = client;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// One chat completion with an optional tool catalog.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_turn: &str,
        tools: Option<&[ToolSchema]>,
    ) -> Result<GatewayReply> {
        let request = CompletionRequest::turn(system_prompt, user_turn)
            .sampled_at(self.temperature)
            .offering(tools);

        let response = self.chat.complete(request).await?;

        if let Some(content) = response.text() {
            return Ok(GatewayReply::Content(content.to_string()));
        }

        let Some(call) = response.into_first_tool_call() else {
            return Ok(GatewayReply::Empty);
        };

        Ok(match ToolKind::from_name(&call.name) {
            Some(kind) => GatewayReply::Tool(ToolInvocation::new(kind, call.arguments)),
            None => GatewayReply::UnknownTool {
                name: call.name,
                arguments: call.arguments,
            },
        })
    }

    /// Ask the summarization model to digest a prompt that carries its own
    /// instructions.
    pub async fn summarize(&self, prompt: &str) -> Result<String> {
        self.text_from(&*self.summarizer, CompletionRequest::instruction(prompt))
            .await
    }

    /// Ask the summarization model to rewrite a transcript slice, bounded to
    /// `max_tokens` of output.
    pub async fn compact(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = CompletionRequest::prompt(prompt).capped_at(max_tokens);
        self.text_from(&*self.summarizer, request).await
    }

    /// Condense retrieved snippets with the retrieval model.
    pub async fn condense(&self, system_prompt: &str, user_turn: &str) -> Result<String> {
        let request = CompletionRequest::turn(system_prompt, user_turn).sampled_at(self.temperature);
        self.text_from(&*self.condenser, request).await
    }

    async fn text_from(&self, client: &dyn LlmClient, request: CompletionRequest) -> Result<String> {
        let response = client.complete(request).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or_else(|| {
                AiError::Protocol(format!("{} returned no content", client.model()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockStep};
    use serde_json::json;

    fn gateway(steps: Vec<MockStep>) -> (MockLlmClient, ModelGateway) {
        let client = MockLlmClient::from_steps("mock-chat", steps);
        let gateway = ModelGateway::new(Arc::new(client.clone())).with_temperature(0.2);
        (client, gateway)
    }

    #[tokio::test]
    async fn test_resolves_known_and_unknown_tools() {
        let (_client, gateway) = gateway(vec![
            MockStep::tool_call("c1", "search_vector_db", json!({"query": "dogs"})),
            MockStep::tool_call("c2", "launch_rockets", json!({})),
        ]);

        let known = gateway.complete("sys", "hi", None).await.unwrap();
        assert_eq!(
            known,
            GatewayReply::Tool(ToolInvocation::new(
                ToolKind::RetrievalSearch,
                json!({"query": "dogs"})
            ))
        );

        let unknown = gateway.complete("sys", "hi", None).await.unwrap();
        assert!(matches!(unknown, GatewayReply::UnknownTool { name, .. } if name == "launch_rockets"));
    }

    #[tokio::test]
    async fn test_blank_content_is_empty_reply() {
        let (_client, gateway) = gateway(vec![MockStep::text("   "), MockStep::empty()]);
        assert_eq!(gateway.complete("s", "u", None).await.unwrap(), GatewayReply::Empty);
        assert_eq!(gateway.complete("s", "u", None).await.unwrap(), GatewayReply::Empty);
    }

    #[tokio::test]
    async fn test_tool_catalog_is_forwarded_only_when_given() {
        let (client, gateway) = gateway(vec![MockStep::text("a"), MockStep::text("b")]);
        let catalog = ToolKind::catalog();

        gateway.complete("s", "u", Some(&catalog)).await.unwrap();
        gateway.complete("s", "u", None).await.unwrap();

        let requests = client.requests().await;
        assert_eq!(requests[0].tools.len(), 2);
        assert!(requests[1].tools.is_empty());
        assert_eq!(requests[0].temperature, Some(0.2));
    }

    #[tokio::test]
    async fn test_compact_sets_token_cap_and_rejects_empty_output() {
        let (client, gateway) = gateway(vec![MockStep::empty()]);
        let error = gateway.compact("squeeze this", 300).await.unwrap_err();
        assert!(matches!(error, AiError::Protocol(_)));

        let requests = client.requests().await;
        assert_eq!(requests[0].max_tokens, Some(300));
        assert_eq!(requests[0].messages[0].role, crate::llm::Role::User);
    }
}
