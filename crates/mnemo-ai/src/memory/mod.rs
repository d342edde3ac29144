//! Conversation memory: rolling transcript, durable summaries and
//! token-budget compaction.

mod compaction;
mod manager;
mod transcript;

pub use compaction::{
    COMPACTION_PROMPT, CompactionConfig, ContextCompactor, build_compaction_prompt, parse_compacted,
};
pub use manager::{CommitReport, MemoryConfig, MemoryManager, build_summary_prompt};
pub use transcript::{Exchange, RollingTranscript, entries_json, estimate_tokens};
