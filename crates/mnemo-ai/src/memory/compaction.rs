//! Token-budget compaction of the rolling transcript.

use serde_json::Value;

use super::transcript::{Exchange, RollingTranscript, entries_json};
use crate::error::{AiError, Result};
use crate::llm::ModelGateway;
use crate::maintenance::MaintenanceStatus;

pub const COMPACTION_PROMPT: &str = include_str!("templates/compaction_prompt.md");

/// Compaction configuration.
#[derive(Debug, Clone)]
pub struct CompactionConfig {
    /// Estimated-token ceiling for the serialized transcript.
    pub max_tokens: usize,
    /// Newest pairs held back from compaction (default: 1).
    pub keep_recent_pairs: usize,
    /// Output cap for the compaction call (default: 300).
    pub max_output_tokens: u32,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1_000,
            keep_recent_pairs: 1,
            max_output_tokens: 300,
        }
    }
}

impl CompactionConfig {
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Build the compaction prompt for a slice of older exchanges.
pub fn build_compaction_prompt(older: &[Exchange]) -> String {
    COMPACTION_PROMPT
        .trim_end()
        .replace("{conversation}", &entries_json(older).to_string())
}

/// Parse a compaction reply into exchanges.
///
/// Accepts a JSON list of role-tagged entries (or a single object, read as a
/// one-element list), optionally wrapped in a markdown code fence. Entries may
/// be whole pairs (`{"user": .., "assistant": ..}`) or alternate
/// `{"user": ..}` then `{"assistant": ..}`. Anything else is rejected.
pub fn parse_compacted(text: &str) -> Result<Vec<Exchange>> {
    let body = strip_code_fence(text);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| AiError::Protocol(format!("Compaction output is not JSON: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => {
            return Err(AiError::Protocol(
                "Compaction output must be a list of entries".to_string(),
            ));
        }
    };

    let mut exchanges = Vec::new();
    let mut pending_user: Option<String> = None;

    for item in &items {
        let user = role_text(item, "user")?;
        let assistant = role_text(item, "assistant")?;

        match (user, assistant, pending_user.take()) {
            (Some(user), Some(assistant), None) => exchanges.push(Exchange::new(user, assistant)),
            (Some(user), None, None) => pending_user = Some(user),
            (None, Some(assistant), Some(user)) => exchanges.push(Exchange::new(user, assistant)),
            _ => {
                return Err(AiError::Protocol(
                    "Compaction entries must alternate user and assistant".to_string(),
                ));
            }
        }
    }

    if pending_user.is_some() {
        return Err(AiError::Protocol(
            "Compaction output ends with an unanswered user entry".to_string(),
        ));
    }
    if exchanges.is_empty() {
        return Err(AiError::Protocol("Compaction output is empty".to_string()));
    }
    Ok(exchanges)
}

fn role_text(item: &Value, role: &str) -> Result<Option<String>> {
    let object = item
        .as_object()
        .ok_or_else(|| AiError::Protocol("Compaction entry is not an object".to_string()))?;
    match object.get(role) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(AiError::Protocol(format!(
            "Compaction entry '{role}' is not a string"
        ))),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Rewrites the older part of a transcript when it outgrows its token budget.
#[derive(Debug, Clone, Default)]
pub struct ContextCompactor {
    config: CompactionConfig,
}

impl ContextCompactor {
    pub fn new(config: CompactionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    pub fn needs_compaction(&self, transcript: &RollingTranscript) -> bool {
        transcript.estimated_tokens() > self.config.max_tokens
    }

    /// Compact `transcript` in place.
    ///
    /// On any gateway or parse failure the transcript is left untouched.
    pub async fn compact(
        &self,
        transcript: &mut RollingTranscript,
        gateway: &ModelGateway,
    ) -> MaintenanceStatus {
        if !self.needs_compaction(transcript) {
            return MaintenanceStatus::skipped("within token budget");
        }
        let tokens_before = transcript.estimated_tokens();

        let (older, _recent) = transcript.split_recent(self.config.keep_recent_pairs);
        if older.is_empty() {
            return MaintenanceStatus::skipped("nothing older than the held-back pairs");
        }

        let prompt = build_compaction_prompt(&older);
        let reply = match gateway.compact(&prompt, self.config.max_output_tokens).await {
            Ok(reply) => reply,
            Err(error) => return MaintenanceStatus::degraded(error),
        };

        let compacted = match parse_compacted(&reply) {
            Ok(exchanges) => exchanges,
            Err(error) => return MaintenanceStatus::degraded(error),
        };

        transcript.replace_older(self.config.keep_recent_pairs, compacted);
        tracing::info!(
            tokens_before,
            tokens_after = transcript.estimated_tokens(),
            pairs = transcript.len(),
            "Transcript compacted"
        );
        MaintenanceStatus::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockStep};
    use std::sync::Arc;

    fn long_transcript() -> RollingTranscript {
        let mut transcript = RollingTranscript::new(10);
        for i in 0..4 {
            transcript.push(Exchange::new(
                format!("question {i} {}", "detail ".repeat(20)),
                format!("answer {i} {}", "context ".repeat(20)),
            ));
        }
        transcript
    }

    fn gateway(steps: Vec<MockStep>) -> (MockLlmClient, ModelGateway) {
        let client = MockLlmClient::from_steps("mock-summary", steps);
        (client.clone(), ModelGateway::new(Arc::new(client)))
    }

    fn compactor() -> ContextCompactor {
        ContextCompactor::new(CompactionConfig::default().with_max_tokens(50))
    }

    #[test]
    fn test_parse_accepts_alternating_and_paired_entries() {
        let alternating =
            parse_compacted(r#"[{"user":"hi"},{"assistant":"hello"},{"user":"a"},{"assistant":"b"}]"#)
                .unwrap();
        assert_eq!(
            alternating,
            vec![Exchange::new("hi", "hello"), Exchange::new("a", "b")]
        );

        let paired = parse_compacted(r#"[{"user":"hi","assistant":"hello"}]"#).unwrap();
        assert_eq!(paired, vec![Exchange::new("hi", "hello")]);
    }

    #[test]
    fn test_parse_wraps_single_object_and_strips_fence() {
        let parsed = parse_compacted("```json\n{\"user\":\"hi\",\"assistant\":\"yo\"}\n```").unwrap();
        assert_eq!(parsed, vec![Exchange::new("hi", "yo")]);
    }

    #[test]
    fn test_parse_rejects_malformed_output() {
        for bad in [
            "not json at all",
            "[]",
            r#""just a string""#,
            r#"[{"user":"hi"}]"#,
            r#"[{"assistant":"first"}]"#,
            r#"[{"user":"a"},{"user":"b"}]"#,
            r#"[{"user":1,"assistant":"x"}]"#,
            r#"[{"note":"hi"}]"#,
        ] {
            assert!(parse_compacted(bad).is_err(), "accepted: {bad}");
        }
    }

    #[test]
    fn test_prompt_embeds_older_entries() {
        let prompt = build_compaction_prompt(&[Exchange::new("hi", "hello")]);
        assert!(prompt.starts_with("Summarize the following conversation"));
        assert!(prompt.contains(r#"[{"user":"hi"},{"assistant":"hello"}]"#));
        assert!(prompt.ends_with("'assistant' pairs):"));
    }

    #[tokio::test]
    async fn test_under_budget_skips_the_model() {
        let (client, gateway) = gateway(vec![]);
        let mut transcript = RollingTranscript::new(3);
        transcript.push(Exchange::new("hi", "hello"));

        let status = ContextCompactor::default().compact(&mut transcript, &gateway).await;
        assert!(matches!(status, MaintenanceStatus::Skipped(_)));
        assert_eq!(client.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_compaction_keeps_latest_pair() {
        let (client, gateway) = gateway(vec![MockStep::text(
            r#"[{"user":"earlier questions"},{"assistant":"earlier answers"}]"#,
        )]);
        let mut transcript = long_transcript();
        let latest = transcript.exchanges().last().cloned().unwrap();

        let status = compactor().compact(&mut transcript, &gateway).await;
        assert!(status.is_applied());
        assert_eq!(
            transcript.exchanges(),
            vec![Exchange::new("earlier questions", "earlier answers"), latest]
        );

        let request = &client.requests().await[0];
        assert_eq!(request.max_tokens, Some(300));
        assert!(!request.messages[0].content.contains("answer 3"));
    }

    #[tokio::test]
    async fn test_malformed_output_leaves_transcript_unchanged() {
        let (_client, gateway) = gateway(vec![MockStep::text("Sure! Here is a summary.")]);
        let mut transcript = long_transcript();
        let before = transcript.to_json();

        let status = compactor().compact(&mut transcript, &gateway).await;
        assert!(status.is_degraded());
        assert_eq!(transcript.to_json(), before);
    }

    #[tokio::test]
    async fn test_gateway_error_leaves_transcript_unchanged() {
        let (_client, gateway) = gateway(vec![MockStep::error("summary model offline")]);
        let mut transcript = long_transcript();
        let before = transcript.to_json();

        assert!(compactor().compact(&mut transcript, &gateway).await.is_degraded());
        assert_eq!(transcript.to_json(), before);
    }
}
