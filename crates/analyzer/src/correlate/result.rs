use std::collections::BTreeMap;
use serde::Serialize;

use crate::parser::model::AuxLogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStatus {
    Matched,
    Unmatched,
}

/// Strategy that produced a match, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    TaskId,
    Identifier,
    TimeWindow,
    Keyword,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::TaskId => "task_id",
            MatchStrategy::Identifier => "identifier",
            MatchStrategy::TimeWindow => "time_window",
            MatchStrategy::Keyword => "keyword",
        }
    }
}

/// Verdict attached to an auxiliary entry.
///
/// `task_key` and `strategy` are present exactly when `status` is `Matched`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrelationResult {
    pub status: CorrelationStatus,
    #[serde(rename = "taskKey", skip_serializing_if = "Option::is_none")]
    pub task_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<MatchStrategy>,
}

impl CorrelationResult {
    pub fn matched(task_key: impl Into<String>, strategy: MatchStrategy) -> Self {
        Self {
            status: CorrelationStatus::Matched,
            task_key: Some(task_key.into()),
            strategy: Some(strategy),
        }
    }

    pub fn unmatched() -> Self {
        Self {
            status: CorrelationStatus::Unmatched,
            task_key: None,
            strategy: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.status == CorrelationStatus::Matched
    }
}

/// Verdict counts over a batch of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorrelationSummary {
    pub matched: BTreeMap<MatchStrategy, usize>,
    pub unmatched: usize,
    /// Entries without any verdict (empty task set)
    pub uncorrelated: usize,
}

impl CorrelationSummary {
    pub fn from_entries(entries: &[AuxLogEntry]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            match &entry.correlation {
                Some(CorrelationResult { strategy: Some(strategy), .. }) => {
                    *summary.matched.entry(*strategy).or_default() += 1;
                }
                Some(_) => summary.unmatched += 1,
                None => summary.uncorrelated += 1,
            }
        }
        summary
    }

    pub fn total_matched(&self) -> usize {
        self.matched.values().sum()
    }
}
