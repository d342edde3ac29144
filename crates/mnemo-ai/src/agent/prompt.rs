//! System prompt assembly for the conversation loop.

use serde_json::Value;

use crate::profile::ProfileField;
use crate::tools::{ToolKind, ToolOutcome};

/// Directive that replaces any outcome narrative once the tool budget is spent.
pub const FUNCTION_LIMIT_DIRECTIVE: &str = "# Function Call Limit Reached.\nPlease conclude the conversation with the user based on the available information.";

/// Inputs for one system prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptContext<'a> {
    pub profile_json: &'a str,
    pub summary: &'a str,
    pub transcript_json: &'a str,
    pub outcome_section: &'a str,
}

pub fn build_system_prompt(context: &PromptContext<'_>) -> String {
    let keys = ProfileField::ALL
        .iter()
        .map(|field| format!("- {}: {}", field.as_str(), field.type_hint()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "## You are a professional assistant of the following user.

{profile}

## Here is a summary of the previous conversation history:

{summary}

## Here is the previous conversation between you and the user:

{transcript}

## You have access to two functions: {search} and {update}.

- If you need more information about the user or details from previous conversations to answer the user's question, use the {search} function.
This function performs a vector search on the chat history of the user and the chatbot. The best way to do this is to search with a very clear query.
- Monitor the conversation, and if the user provides any of the following details that differ from the initial information, call {update} to update the user's database record.

### Keys for Updating the User's Information:

{keys}

## IMPORTANT: You are the only agent talking to the user, so you are responsible for both the conversation and function calling.
- If you call a function, the result will appear below.
- If the result confirms that the function was successful, or the maximum limit of function calls is reached, don't call it again.
- You can also check the chat history to see if you already called the function.

{outcome}",
        profile = context.profile_json,
        summary = context.summary,
        transcript = context.transcript_json,
        search = ToolKind::RetrievalSearch.name(),
        update = ToolKind::ProfileUpdate.name(),
        keys = keys,
        outcome = context.outcome_section,
    )
}

/// Narrative for the outcome of the previous tool call.
pub fn outcome_section(tool_name: &str, arguments: &Value, outcome: &ToolOutcome) -> String {
    let arguments = render_arguments(arguments);
    if outcome.is_success() {
        format!(
            "## Function Call Executed

- The assistant just called the function `{tool_name}` in response to the user's most recent message.
- Arguments provided:
{arguments}
- Outcome: ✅ {status}

Please proceed with the conversation using the new context.

{detail}",
            status = outcome.status,
            detail = outcome.detail,
        )
    } else {
        format!(
            "## Function Call Attempted

- The assistant attempted to call `{tool_name}` with the following arguments:
{arguments}
- Outcome: ❌ {status} - {detail}

Please assist the user based on this result.",
            status = outcome.status,
            detail = outcome.detail,
        )
    }
}

/// One `  - key: value` line per top-level argument.
fn render_arguments(arguments: &Value) -> String {
    match arguments {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("  - {key}: {}", plain(value)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => format!("  - {}", plain(other)),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
