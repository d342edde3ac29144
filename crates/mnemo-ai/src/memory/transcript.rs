//! Rolling transcript - bounded window of recent exchanges
//!
//! The transcript stores whole user/assistant pairs, so its serialized form
//! always alternates `{"user": ..}` and `{"assistant": ..}` entries and its
//! entry count is always even.
//!
//! # Example
//!
//! ```
//! use mnemo_ai::memory::{Exchange, RollingTranscript};
//!
//! let mut transcript = RollingTranscript::new(2);
//! transcript.push(Exchange::new("Hi", "Hello!"));
//! transcript.push(Exchange::new("How are you?", "Fine."));
//! transcript.push(Exchange::new("Bye", "See you."));
//!
//! assert_eq!(transcript.len(), 2);
//! assert_eq!(transcript.entry_count(), 4);
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

impl Exchange {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// Serialize exchanges as alternating role-tagged entries.
pub fn entries_json(exchanges: &[Exchange]) -> Value {
    Value::Array(
        exchanges
            .iter()
            .flat_map(|exchange| {
                [
                    json!({ "user": exchange.user }),
                    json!({ "assistant": exchange.assistant }),
                ]
            })
            .collect(),
    )
}

/// Rough token estimate (1 token ≈ 4 chars).
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4 + 1
}

/// Bounded, in-memory window of recent exchanges for one session.
#[derive(Debug, Clone)]
pub struct RollingTranscript {
    pairs: VecDeque<Exchange>,
    max_pairs: usize,
}

impl RollingTranscript {
    /// Create a transcript holding at most `max_pairs` exchanges (minimum 1).
    pub fn new(max_pairs: usize) -> Self {
        let max_pairs = max_pairs.max(1);
        Self {
            pairs: VecDeque::with_capacity(max_pairs),
            max_pairs,
        }
    }

    /// Append an exchange, dropping the oldest pairs on overflow.
    pub fn push(&mut self, exchange: Exchange) {
        self.pairs.push_back(exchange);
        self.enforce_bound();
    }

    /// Number of exchanges.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of serialized role-tagged entries (always `2 * len()`).
    pub fn entry_count(&self) -> usize {
        self.pairs.len() * 2
    }

    pub fn max_pairs(&self) -> usize {
        self.max_pairs
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.pairs.iter().cloned().collect()
    }

    /// JSON rendering used in prompts and for the token estimate.
    pub fn to_json(&self) -> String {
        entries_json(&self.exchanges()).to_string()
    }

    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.to_json())
    }

    /// Split into `(older, recent)` where `recent` holds the newest `keep`
    /// exchanges.
    pub fn split_recent(&self, keep: usize) -> (Vec<Exchange>, Vec<Exchange>) {
        let cut = self.pairs.len().saturating_sub(keep);
        let (older, recent): (Vec<_>, Vec<_>) = self
            .pairs
            .iter()
            .cloned()
            .enumerate()
            .partition(|(index, _)| *index < cut);
        (
            older.into_iter().map(|(_, e)| e).collect(),
            recent.into_iter().map(|(_, e)| e).collect(),
        )
    }

    /// Replace everything but the newest `keep` exchanges with `older`.
    pub fn replace_older(&mut self, keep: usize, older: Vec<Exchange>) {
        let (_, recent) = self.split_recent(keep);
        self.pairs = older.into_iter().chain(recent).collect();
        self.enforce_bound();
    }

    fn enforce_bound(&mut self) {
        while self.pairs.len() > self.max_pairs {
            self.pairs.pop_front();
        }
    }
}
