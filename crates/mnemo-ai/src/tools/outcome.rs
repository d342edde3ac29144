use std::fmt;

/// Coarse result of a tool dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "Function call successful.",
            Self::Failed => "Function call failed.",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform `(status, detail)` pair every tool returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub status: OutcomeStatus,
    pub detail: String,
}

impl ToolOutcome {
    pub fn succeeded(detail: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Succeeded,
            detail: detail.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            detail: detail.into(),
        }
    }

    /// Outcome for a tool name outside the catalog.
    pub fn unknown_function() -> Self {
        Self::failed("Unknown function")
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}
