//! Turn state and reporting

use crate::maintenance::MaintenanceStatus;
use crate::tools::OutcomeStatus;

/// Answer used when the fallback call returns no content.
pub const FALLBACK_APOLOGY: &str = "I apologize, but I couldn't generate a proper response.";

/// Answer for a reply with neither content nor a tool call.
pub const NO_RESPONSE_WARNING: &str =
    "Warning: No valid assistant response from the chatbot. Please try again.";

/// Conversation loop state within one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Thinking,
    /// A tool succeeded; the next reply must be the answer.
    Finished,
}

/// How a turn produced its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPath {
    /// The model answered with content.
    Direct,
    /// The budget was spent or a tool already succeeded, so a tool-free
    /// completion produced the answer.
    Fallback,
    /// The model returned nothing usable.
    Warning,
    /// A collaborator failed; the answer is an `Error: ...` string.
    Error,
}

/// One dispatched tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRecord {
    pub name: String,
    pub status: OutcomeStatus,
}

/// Everything observable about one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub session_id: String,
    pub answer: String,
    pub path: TurnPath,
    pub tool_calls: Vec<ToolCallRecord>,
    pub summary: MaintenanceStatus,
    pub compaction: MaintenanceStatus,
    pub indexing: MaintenanceStatus,
}

impl TurnReport {
    pub(crate) fn new(session_id: impl Into<String>, path: TurnPath, answer: impl Into<String>) -> Self {
        let not_run = || MaintenanceStatus::skipped("not reached");
        Self {
            session_id: session_id.into(),
            answer: answer.into(),
            path,
            tool_calls: Vec::new(),
            summary: not_run(),
            compaction: not_run(),
            indexing: not_run(),
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRecord>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|call| call.name.as_str()).collect()
    }
}
