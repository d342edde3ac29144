use std::sync::Arc;

use super::compaction::{CompactionConfig, ContextCompactor};
use super::transcript::{Exchange, RollingTranscript};
use crate::error::Result;
use crate::llm::ModelGateway;
use crate::maintenance::MaintenanceStatus;
use crate::store::{ChatMessage, ConversationStore, ConversationSummary};

/// Memory limits for one session.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub max_history_pairs: usize,
    /// Summarize once more than this many pairs are unsummarized.
    pub summary_threshold_pairs: usize,
    /// Token ceiling for the rolling transcript.
    pub max_tokens: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_history_pairs: 5,
            summary_threshold_pairs: 5,
            max_tokens: 1_000,
        }
    }
}

/// What the maintenance steps did after an exchange was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub summary: MaintenanceStatus,
    pub compaction: MaintenanceStatus,
}

/// Build the summarization prompt for a block of pairs.
pub fn build_summary_prompt(previous: Option<&str>, messages: &[ChatMessage]) -> String {
    let mut prompt = String::from("Summarize the following conversation:\n\n");
    if let Some(previous) = previous {
        prompt.push_str(&format!("Previous summary:\n{previous}\n\n"));
    }
    for message in messages {
        prompt.push_str(&format!(
            "User: {}\nAssistant: {}\n\n",
            message.question, message.answer
        ));
    }
    prompt.push_str("Provide a concise summary while keeping important details.");
    prompt
}

/// Owns one session's rolling transcript and decides when to summarize and
/// when to compact.
pub struct MemoryManager {
    session_id: String,
    transcript: RollingTranscript,
    pairs_since_summary: usize,
    config: MemoryConfig,
    compactor: ContextCompactor,
    store: Arc<dyn ConversationStore>,
    gateway: Arc<ModelGateway>,
}

impl MemoryManager {
    pub fn new(
        session_id: impl Into<String>,
        config: MemoryConfig,
        store: Arc<dyn ConversationStore>,
        gateway: Arc<ModelGateway>,
    ) -> Self {
        let compactor =
            ContextCompactor::new(CompactionConfig::default().with_max_tokens(config.max_tokens));
        Self {
            session_id: session_id.into(),
            transcript: RollingTranscript::new(config.max_history_pairs),
            pairs_since_summary: 0,
            config,
            compactor,
            store,
            gateway,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> &RollingTranscript {
        &self.transcript
    }

    pub fn transcript_json(&self) -> String {
        self.transcript.to_json()
    }

    pub fn pairs_since_summary(&self) -> usize {
        self.pairs_since_summary
    }

    /// Latest stored summary text for this session.
    pub async fn latest_summary(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .latest_summary(&self.session_id)
            .await?
            .map(|summary| summary.text))
    }

    /// Persist a finished exchange, then run summarization (when
    /// `check_summary`) and compaction.
    ///
    /// Only the message write can fail; maintenance outcomes land in the
    /// report.
    pub async fn record_exchange(
        &mut self,
        question: &str,
        answer: &str,
        user_id: Option<i64>,
        check_summary: bool,
    ) -> Result<CommitReport> {
        let message = ChatMessage::new(&self.session_id, user_id, question, answer);
        self.store.append_message(&message).await?;

        self.transcript.push(Exchange::new(question, answer));
        self.pairs_since_summary += 1;

        let summary = if check_summary {
            self.maybe_summarize(user_id).await
        } else {
            MaintenanceStatus::skipped("fallback turn")
        };
        summary.log("summary");

        let compaction = self
            .compactor
            .compact(&mut self.transcript, &self.gateway)
            .await;
        compaction.log("compaction");

        Ok(CommitReport {
            summary,
            compaction,
        })
    }

    async fn maybe_summarize(&mut self, user_id: Option<i64>) -> MaintenanceStatus {
        let threshold = self.config.summary_threshold_pairs;
        if self.pairs_since_summary <= threshold {
            return MaintenanceStatus::skipped("below summary threshold");
        }

        match self.summarize(user_id, threshold).await {
            Ok(status) => status,
            Err(error) => MaintenanceStatus::degraded(error),
        }
    }

    async fn summarize(&mut self, user_id: Option<i64>, threshold: usize) -> Result<MaintenanceStatus> {
        let messages = self
            .store
            .recent_messages(&self.session_id, self.pairs_since_summary)
            .await?;
        if messages.len() <= threshold {
            return Ok(MaintenanceStatus::skipped("not enough stored pairs"));
        }

        let previous = self.latest_summary().await?;
        let prompt = build_summary_prompt(previous.as_deref(), &messages);
        let text = self.gateway.summarize(&prompt).await?;

        self.store
            .append_summary(&ConversationSummary::new(&self.session_id, user_id, text))
            .await?;
        tracing::info!(
            session_id = %self.session_id,
            pairs = messages.len(),
            "Conversation summarized"
        );
        self.pairs_since_summary = 0;
        Ok(MaintenanceStatus::Applied)
    }
}
