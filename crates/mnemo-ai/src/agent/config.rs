//! Conversation configuration

use crate::error::{AiError, Result};
use crate::memory::MemoryConfig;

/// Limits and sampling settings for the conversation loop.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Rolling transcript bound, in pairs.
    pub max_history_pairs: usize,
    /// Unsummarized pairs tolerated before a summary is written.
    pub summary_threshold_pairs: usize,
    /// Estimated-token ceiling for the transcript.
    pub max_tokens: usize,
    /// Tool calls allowed per turn.
    pub max_function_calls: usize,
    /// Retrieval hits per search.
    pub retrieval_k: usize,
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history_pairs: 2,
            summary_threshold_pairs: 2,
            max_tokens: 2_000,
            max_function_calls: 3,
            retrieval_k: 3,
            temperature: 0.0,
        }
    }
}

impl ChatConfig {
    /// Set the transcript bound; the summary threshold follows it.
    pub fn with_max_history_pairs(mut self, pairs: usize) -> Self {
        self.max_history_pairs = pairs;
        self.summary_threshold_pairs = pairs;
        self
    }

    pub fn with_summary_threshold(mut self, pairs: usize) -> Self {
        self.summary_threshold_pairs = pairs;
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_max_function_calls(mut self, calls: usize) -> Self {
        self.max_function_calls = calls;
        self
    }

    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_history_pairs < 1 {
            return Err(AiError::Validation(
                "max_history_pairs must be at least 1".to_string(),
            ));
        }
        if self.max_function_calls < 1 {
            return Err(AiError::Validation(
                "max_function_calls must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AiError::Validation(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    pub fn memory_config(&self) -> MemoryConfig {
        MemoryConfig {
            max_history_pairs: self.max_history_pairs,
            summary_threshold_pairs: self.summary_threshold_pairs,
            max_tokens: self.max_tokens,
        }
    }
}
