//! Turn-level conversation loop.

use std::sync::Arc;

use serde_json::Value;

use super::config::ChatConfig;
use super::prompt::{FUNCTION_LIMIT_DIRECTIVE, PromptContext, build_system_prompt, outcome_section};
use super::session::{SessionContext, SessionPool, SharedSession};
use super::state::{
    ChatState, FALLBACK_APOLOGY, NO_RESPONSE_WARNING, ToolCallRecord, TurnPath, TurnReport,
};
use crate::error::{AiError, Result};
use crate::llm::{GatewayReply, ModelGateway};
use crate::memory::MemoryManager;
use crate::profile::ProfileManager;
use crate::retrieval::{RetrievalService, RetrievalStore};
use crate::store::ConversationStore;
use crate::tools::{ToolKind, ToolOutcome, ToolRouter};

/// Outcome of the previous tool call, folded into the next prompt.
struct PendingOutcome {
    tool_name: String,
    arguments: Value,
    outcome: ToolOutcome,
}

/// Drives one user message to a final answer.
///
/// The loop calls the chat model, executes at most `max_function_calls` tool
/// requests, and once a tool succeeds or the budget is spent accepts only a
/// text answer (falling back to a tool-free completion). Errors never escape
/// a turn: they come back as an `Error: ...` answer.
pub struct ConversationOrchestrator {
    store: Arc<dyn ConversationStore>,
    gateway: Arc<ModelGateway>,
    profile: Arc<ProfileManager>,
    retrieval: Arc<RetrievalService>,
    router: ToolRouter,
    config: ChatConfig,
    sessions: SessionPool,
    default_session: String,
}

impl ConversationOrchestrator {
    /// Validate `config`, load the profile and open a default session.
    pub async fn new(
        store: Arc<dyn ConversationStore>,
        gateway: ModelGateway,
        retrieval_store: Arc<dyn RetrievalStore>,
        config: ChatConfig,
    ) -> Result<Self> {
        config.validate()?;

        let gateway = Arc::new(gateway.with_temperature(config.temperature));
        let profile = Arc::new(ProfileManager::load(store.clone()).await?);
        let retrieval = Arc::new(RetrievalService::new(
            retrieval_store,
            gateway.clone(),
            config.retrieval_k,
        ));
        let router = ToolRouter::new(profile.clone(), retrieval.clone());

        let orchestrator = Self {
            store,
            gateway,
            profile,
            retrieval,
            router,
            config,
            sessions: SessionPool::new(),
            default_session: String::new(),
        };
        Ok(orchestrator.with_default_session())
    }

    fn with_default_session(mut self) -> Self {
        self.default_session = self.new_session();
        self
    }

    /// Open a fresh session with an empty transcript. Returns its id.
    pub fn new_session(&self) -> String {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.session(&session_id);
        tracing::info!(session_id = %session_id, "Session opened");
        session_id
    }

    pub fn default_session_id(&self) -> &str {
        &self.default_session
    }

    pub fn profile(&self) -> &Arc<ProfileManager> {
        &self.profile
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Answer `message` in the default session.
    pub async fn chat(&self, message: &str) -> String {
        self.chat_detailed(message).await.answer
    }

    pub async fn chat_detailed(&self, message: &str) -> TurnReport {
        let session_id = self.default_session.clone();
        self.chat_in_session(&session_id, message).await
    }

    /// Answer `message` in `session_id`, creating the session on first use.
    /// Turns within a session are serialized.
    pub async fn chat_in_session(&self, session_id: &str, message: &str) -> TurnReport {
        let session = self.session(session_id);
        let mut context = session.lock().await;
        let mut tool_calls = Vec::new();

        let report = match self.run_turn(&mut context, message, &mut tool_calls).await {
            Ok(report) => report,
            Err(error) => {
                tracing::error!(session_id, %error, "Turn failed");
                TurnReport::new(session_id, TurnPath::Error, format!("Error: {error}"))
                    .with_tool_calls(tool_calls)
            }
        };

        tracing::info!(
            session_id,
            path = ?report.path,
            tool_calls = report.tool_calls.len(),
            "Turn completed"
        );
        report
    }

    /// Release a session's in-process state. Its stored messages and
    /// summaries remain; reopening the id starts from an empty transcript.
    pub fn close_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id);
        if removed {
            tracing::info!(session_id, "Session closed");
        }
        removed
    }

    /// Transcript JSON of a session, if it exists.
    pub async fn transcript_json(&self, session_id: &str) -> Option<String> {
        let session = self.sessions.get(session_id)?;
        let context = session.lock().await;
        Some(context.memory.transcript_json())
    }

    fn session(&self, session_id: &str) -> SharedSession {
        self.sessions.get_or_insert_with(session_id, || {
            SessionContext::new(MemoryManager::new(
                session_id,
                self.config.memory_config(),
                self.store.clone(),
                self.gateway.clone(),
            ))
        })
    }

    async fn run_turn(
        &self,
        context: &mut SessionContext,
        message: &str,
        tool_calls: &mut Vec<ToolCallRecord>,
    ) -> Result<TurnReport> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AiError::Validation("Message must not be empty".to_string()));
        }

        let summary = context.memory.latest_summary().await?.unwrap_or_default();
        let catalog = ToolKind::catalog();
        let mut state = ChatState::Thinking;
        let mut call_count = 0usize;
        let mut pending: Option<PendingOutcome> = None;
        let mut section = String::new();

        loop {
            if let Some(previous) = pending.take() {
                if previous.outcome.is_success() {
                    state = ChatState::Finished;
                    if previous.tool_name == ToolKind::ProfileUpdate.name() {
                        self.profile.refresh().await?;
                    }
                }
                section =
                    outcome_section(&previous.tool_name, &previous.arguments, &previous.outcome);
            }

            let budget_spent = call_count >= self.config.max_function_calls;
            if budget_spent {
                section = FUNCTION_LIMIT_DIRECTIVE.to_string();
            }

            let profile_json = self.profile.current_json();
            let transcript_json = context.memory.transcript_json();
            let system_prompt = build_system_prompt(&PromptContext {
                profile_json: &profile_json,
                summary: &summary,
                transcript_json: &transcript_json,
                outcome_section: &section,
            });

            let tools = (!budget_spent).then_some(catalog.as_slice());
            let reply = self.gateway.complete(&system_prompt, message, tools).await?;

            let (tool_name, arguments, outcome) = match reply {
                GatewayReply::Content(answer) => {
                    return self
                        .finish(context, message, answer, TurnPath::Direct, tool_calls)
                        .await;
                }
                GatewayReply::Empty => {
                    tracing::warn!(session_id = %context.session_id, "Model returned neither content nor a tool call");
                    return Ok(
                        TurnReport::new(&context.session_id, TurnPath::Warning, NO_RESPONSE_WARNING)
                            .with_tool_calls(tool_calls.clone()),
                    );
                }
                GatewayReply::Tool(_) | GatewayReply::UnknownTool { .. }
                    if budget_spent || state == ChatState::Finished =>
                {
                    tracing::info!(session_id = %context.session_id, call_count, "Triggering fallback completion");
                    let answer = match self.gateway.complete(&system_prompt, message, None).await? {
                        GatewayReply::Content(answer) => answer,
                        _ => FALLBACK_APOLOGY.to_string(),
                    };
                    return self
                        .finish(context, message, answer, TurnPath::Fallback, tool_calls)
                        .await;
                }
                GatewayReply::Tool(invocation) => {
                    call_count += 1;
                    tracing::info!(tool = invocation.kind.name(), call_count, "Model requested tool");
                    let outcome = self.router.dispatch(&invocation).await;
                    (invocation.kind.name().to_string(), invocation.arguments, outcome)
                }
                GatewayReply::UnknownTool { name, arguments } => {
                    call_count += 1;
                    tracing::warn!(tool = %name, call_count, "Model requested an unknown tool");
                    (name, arguments, ToolOutcome::unknown_function())
                }
            };

            tool_calls.push(ToolCallRecord {
                name: tool_name.clone(),
                status: outcome.status,
            });
            pending = Some(PendingOutcome {
                tool_name,
                arguments,
                outcome,
            });
        }
    }

    /// Persist and index a terminal answer.
    async fn finish(
        &self,
        context: &mut SessionContext,
        question: &str,
        answer: String,
        path: TurnPath,
        tool_calls: &[ToolCallRecord],
    ) -> Result<TurnReport> {
        // Fallback answers are persisted without the summary check.
        let check_summary = path == TurnPath::Direct;
        let commit = context
            .memory
            .record_exchange(question, &answer, self.profile.user_id(), check_summary)
            .await?;

        let indexing = self.retrieval.index_turn(question, &answer).await;
        indexing.log("indexing");

        let mut report = TurnReport::new(&context.session_id, path, answer)
            .with_tool_calls(tool_calls.to_vec());
        report.summary = commit.summary;
        report.compaction = commit.compaction;
        report.indexing = indexing;
        Ok(report)
    }
}
