//! Result tags for best-effort background work.

use std::fmt;

/// What happened to a best-effort maintenance step (summarization,
/// compaction, retrieval indexing).
///
/// None of these steps can fail a turn; the status is logged and surfaced on
/// the turn report instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceStatus {
    Applied,
    Skipped(String),
    Degraded(String),
}

impl MaintenanceStatus {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    pub fn degraded(error: impl fmt::Display) -> Self {
        Self::Degraded(error.to_string())
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    /// Log the status under `step` at a level matching its severity.
    pub fn log(&self, step: &'static str) {
        match self {
            Self::Applied => tracing::debug!(step, "Maintenance applied"),
            Self::Skipped(reason) => tracing::debug!(step, reason = %reason, "Maintenance skipped"),
            Self::Degraded(error) => tracing::warn!(step, error = %error, "Maintenance degraded"),
        }
    }
}

impl fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Degraded(error) => write!(f, "degraded ({error})"),
        }
    }
}
