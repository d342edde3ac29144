//! The two tools the assistant can call, and their dispatch.

mod kind;
mod outcome;
mod router;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use kind::{ToolInvocation, ToolKind};
pub use outcome::{OutcomeStatus, ToolOutcome};
pub use router::ToolRouter;

/// Tool definition for the LLM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value, // JSON Schema object
}
