use std::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;

use super::model::ParserRole;
use crate::correlate::{CorrelationSummary, MatchStrategy};

/// A wrapper that forces the wrapped data onto its own cache line(s).
///
/// Hosts may fan parsing out across worker threads sharing one
/// `ParsingMetrics`; keeping each counter group on its own 64-byte line
/// stops those threads from invalidating each other's caches.
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct CacheAligned<T>(pub T);

/// Line counters per parser role
#[derive(Debug, Default)]
pub struct LineMetrics {
    pub project_seen: AtomicU64,
    pub project_recognized: AtomicU64,
    pub aux_seen: AtomicU64,
    pub aux_parsed: AtomicU64,
}

/// File resolution outcomes
#[derive(Debug, Default)]
pub struct FileMetrics {
    pub project: AtomicU64,
    pub aux: AtomicU64,
    pub unhandled: AtomicU64,
}

/// Correlation verdicts by strategy
#[derive(Debug, Default)]
pub struct CorrelationMetrics {
    pub task_id: AtomicU64,
    pub identifier: AtomicU64,
    pub time_window: AtomicU64,
    pub keyword: AtomicU64,
    pub unmatched: AtomicU64,
    pub uncorrelated: AtomicU64,
}

/// Counters for one analyzer run.
///
/// All operations use `Ordering::Relaxed`; `snapshot()` is not transactional
/// across fields, which is fine for reporting.
#[derive(Debug, Default)]
pub struct ParsingMetrics {
    pub lines: CacheAligned<LineMetrics>,
    pub files: CacheAligned<FileMetrics>,
    pub correlation: CacheAligned<CorrelationMetrics>,
}

impl ParsingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one parsed file: lines seen and lines that produced output
    #[inline]
    pub fn record_file(&self, role: ParserRole, seen: usize, recognized: usize) {
        let lines = &self.lines.0;
        match role {
            ParserRole::Project => {
                self.files.0.project.fetch_add(1, Ordering::Relaxed);
                lines.project_seen.fetch_add(seen as u64, Ordering::Relaxed);
                lines.project_recognized.fetch_add(recognized as u64, Ordering::Relaxed);
            }
            ParserRole::Aux => {
                self.files.0.aux.fetch_add(1, Ordering::Relaxed);
                lines.aux_seen.fetch_add(seen as u64, Ordering::Relaxed);
                lines.aux_parsed.fetch_add(recognized as u64, Ordering::Relaxed);
            }
        }
    }

    #[inline]
    pub fn record_unhandled(&self) {
        self.files.0.unhandled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_correlation(&self, summary: &CorrelationSummary) {
        let c = &self.correlation.0;
        for (strategy, count) in &summary.matched {
            let counter = match strategy {
                MatchStrategy::TaskId => &c.task_id,
                MatchStrategy::Identifier => &c.identifier,
                MatchStrategy::TimeWindow => &c.time_window,
                MatchStrategy::Keyword => &c.keyword,
            };
            counter.fetch_add(*count as u64, Ordering::Relaxed);
        }
        c.unmatched.fetch_add(summary.unmatched as u64, Ordering::Relaxed);
        c.uncorrelated.fetch_add(summary.uncorrelated as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let lines = &self.lines.0;
        let files = &self.files.0;
        let c = &self.correlation.0;

        let aux_seen = lines.aux_seen.load(Ordering::Relaxed);
        let aux_parsed = lines.aux_parsed.load(Ordering::Relaxed);
        let project_seen = lines.project_seen.load(Ordering::Relaxed);
        let project_recognized = lines.project_recognized.load(Ordering::Relaxed);

        MetricsSnapshot {
            project_files: files.project.load(Ordering::Relaxed),
            aux_files: files.aux.load(Ordering::Relaxed),
            unhandled_files: files.unhandled.load(Ordering::Relaxed),
            project_lines_seen: project_seen,
            project_lines_recognized: project_recognized,
            aux_lines_seen: aux_seen,
            aux_lines_parsed: aux_parsed,
            skipped_lines: (aux_seen - aux_parsed.min(aux_seen))
                + (project_seen - project_recognized.min(project_seen)),
            matched_task_id: c.task_id.load(Ordering::Relaxed),
            matched_identifier: c.identifier.load(Ordering::Relaxed),
            matched_time_window: c.time_window.load(Ordering::Relaxed),
            matched_keyword: c.keyword.load(Ordering::Relaxed),
            unmatched: c.unmatched.load(Ordering::Relaxed),
            uncorrelated: c.uncorrelated.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub project_files: u64,
    pub aux_files: u64,
    pub unhandled_files: u64,
    pub project_lines_seen: u64,
    pub project_lines_recognized: u64,
    pub aux_lines_seen: u64,
    pub aux_lines_parsed: u64,
    /// Blank, continuation and malformed lines across both roles
    pub skipped_lines: u64,
    pub matched_task_id: u64,
    pub matched_identifier: u64,
    pub matched_time_window: u64,
    pub matched_keyword: u64,
    pub unmatched: u64,
    /// Entries left without a verdict because no task was known
    pub uncorrelated: u64,
}
