use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::config::CorrelationConfig;
use super::result::{CorrelationResult, CorrelationSummary, MatchStrategy};
use crate::parser::model::{AuxLogEntry, TaskInfo};

/// Assigns correlation verdicts to auxiliary entries.
#[derive(Debug, Clone)]
pub struct Correlator<C: Clock = SystemClock> {
    config: CorrelationConfig,
    clock: C,
}

impl Correlator<SystemClock> {
    pub fn new(config: CorrelationConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Correlator<C> {
    pub fn with_clock(config: CorrelationConfig, clock: C) -> Self {
        Self { config, clock }
    }

    /// Annotated copies of `entries`, same order and length.
    pub fn correlate(&self, entries: &[AuxLogEntry], tasks: &[TaskInfo]) -> Vec<AuxLogEntry> {
        let mut annotated = entries.to_vec();
        self.annotate(&mut annotated, tasks);
        annotated
    }

    /// Set the `correlation` field of every entry.
    ///
    /// With no tasks every verdict is cleared: there was nothing to
    /// correlate against.
    pub fn annotate(&self, entries: &mut [AuxLogEntry], tasks: &[TaskInfo]) -> CorrelationSummary {
        if tasks.is_empty() {
            for entry in entries.iter_mut() {
                entry.correlation = None;
            }
        } else {
            // one "now" per batch so open tasks have a single extent
            let now = self.clock.now_ms();
            for entry in entries.iter_mut() {
                entry.correlation = Some(self.judge(entry, tasks, now));
            }
        }

        let summary = CorrelationSummary::from_entries(entries);
        debug!(
            entries = entries.len(),
            tasks = tasks.len(),
            matched = summary.total_matched(),
            unmatched = summary.unmatched,
            "Correlated entries"
        );
        summary
    }

    /// Verdict for a single entry against a non-empty task set.
    pub fn verdict(&self, entry: &AuxLogEntry, tasks: &[TaskInfo]) -> CorrelationResult {
        self.judge(entry, tasks, self.clock.now_ms())
    }

    fn judge(&self, entry: &AuxLogEntry, tasks: &[TaskInfo], now: i64) -> CorrelationResult {
        let config = &self.config;

        if let Some(task_id) = entry.task_id {
            if !config.enable_task_id_match {
                return CorrelationResult::unmatched();
            }
            // ids restart in every primary log, so several tasks may share one
            return self
                .closest(tasks.iter().filter(|t| t.task_id == task_id), entry, now)
                .map(|t| CorrelationResult::matched(&t.key, MatchStrategy::TaskId))
                .unwrap_or_else(CorrelationResult::unmatched);
        }

        if let Some(identifier) = entry.identifier.as_deref() {
            if !config.enable_identifier_match {
                return CorrelationResult::unmatched();
            }
            return self
                .closest(tasks.iter().filter(|t| t.identifier.as_deref() == Some(identifier)), entry, now)
                .map(|t| CorrelationResult::matched(&t.key, MatchStrategy::Identifier))
                .unwrap_or_else(CorrelationResult::unmatched);
        }

        if config.enable_time_window_match {
            if let Some(task) = self.window_match(entry, tasks, now) {
                return CorrelationResult::matched(&task.key, MatchStrategy::TimeWindow);
            }
        }

        if config.enable_keyword_match {
            if let Some(task) = keyword_match(entry, tasks) {
                return CorrelationResult::matched(&task.key, MatchStrategy::Keyword);
            }
        }

        CorrelationResult::unmatched()
    }

    /// Earliest-starting task whose widened span contains the entry.
    fn window_match<'t>(&self, entry: &AuxLogEntry, tasks: &'t [TaskInfo], now: i64) -> Option<&'t TaskInfo> {
        let ts = entry.timestamp_ms?;

        tasks
            .iter()
            .filter(|task| self.in_window(task, ts, now))
            .filter_map(|task| Some((task.start_time_ms?, task)))
            // min_by_key keeps the first of equal starts
            .min_by_key(|(start, _)| *start)
            .map(|(_, task)| task)
    }

    /// Pick among tasks that share an explicit id: the one whose widened
    /// span holds the entry, else the one starting nearest to it, else the
    /// first in task order.
    fn closest<'t>(
        &self,
        mut candidates: impl Iterator<Item = &'t TaskInfo>,
        entry: &AuxLogEntry,
        now: i64,
    ) -> Option<&'t TaskInfo> {
        let Some(ts) = entry.timestamp_ms else {
            return candidates.next();
        };
        candidates.min_by_key(|task| {
            let distance = task.start_time_ms.map_or(u64::MAX, |start| start.abs_diff(ts));
            (!self.in_window(task, ts, now), distance)
        })
    }

    /// `ts` within `[start - w, end + w]`, open tasks ending at `now`.
    fn in_window(&self, task: &TaskInfo, ts: i64, now: i64) -> bool {
        let Some(start) = task.start_time_ms else {
            return false;
        };
        let slack = i64::try_from(self.config.time_window_ms).unwrap_or(i64::MAX);
        let end = task.end_time_ms.unwrap_or(now);
        start.saturating_sub(slack) <= ts && ts <= end.saturating_add(slack)
    }
}

/// First task whose entry name appears in the entry's message or entry field.
fn keyword_match<'t>(entry: &AuxLogEntry, tasks: &'t [TaskInfo]) -> Option<&'t TaskInfo> {
    let message = entry.message.to_lowercase();
    let entry_name = entry.entry.as_deref().map(str::to_lowercase);

    tasks.iter().find(|task| {
        if task.entry.is_empty() {
            return false;
        }
        let needle = task.entry.to_lowercase();
        message.contains(&needle) || entry_name.as_deref().is_some_and(|e| e.contains(&needle))
    })
}

/// Correlate with the system clock.
pub fn correlate(entries: &[AuxLogEntry], tasks: &[TaskInfo], config: &CorrelationConfig) -> Vec<AuxLogEntry> {
    Correlator::new(config.clone()).correlate(entries, tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::clock::FixedClock;
    use crate::correlate::result::CorrelationStatus;
    use crate::parser::model::TaskStatus;
    use rstest::rstest;

    const T0: i64 = 1_749_901_049_601;

    fn task(task_id: u64, entry: &str, start: i64, end: Option<i64>) -> TaskInfo {
        TaskInfo {
            task_id,
            key: format!("maa.log#{}@{}", task_id, task_id * 10),
            entry: entry.to_string(),
            status: if end.is_some() { TaskStatus::Succeeded } else { TaskStatus::Running },
            start_time: String::new(),
            end_time: None,
            start_time_ms: Some(start),
            end_time_ms: end,
            nodes: Vec::new(),
            process_id: None,
            thread_id: None,
            identifier: Some(format!("uuid-{}", task_id)),
            hash: None,
            file_name: "maa.log".to_string(),
        }
    }

    fn entry(message: &str, ts: Option<i64>) -> AuxLogEntry {
        AuxLogEntry {
            key: "agent.log:1".to_string(),
            source: "agent".to_string(),
            timestamp: String::new(),
            timestamp_ms: ts,
            level: "info".to_string(),
            message: message.to_string(),
            identifier: None,
            task_id: None,
            entry: None,
            caller: None,
            details: None,
            file_name: "agent.log".to_string(),
            line_number: 1,
            correlation: None,
        }
    }

    fn tasks() -> Vec<TaskInfo> {
        vec![
            task(1, "StartUp", T0, Some(T0 + 10_000)),
            task(2, "DailyReward", T0 + 60_000, Some(T0 + 70_000)),
        ]
    }

    fn correlator() -> Correlator<FixedClock> {
        Correlator::with_clock(CorrelationConfig::default(), FixedClock(T0 + 1_000_000))
    }

    fn key_of(result: &CorrelationResult) -> Option<&str> {
        result.task_key.as_deref()
    }

    #[test]
    fn test_empty_task_set_attaches_nothing() {
        let mut stale = entry("x", Some(T0));
        stale.correlation = Some(CorrelationResult::unmatched());
        let out = correlator().correlate(&[entry("a", Some(T0)), stale], &[]);

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|e| e.correlation.is_none()));
    }

    #[test]
    fn test_task_id_match() {
        let mut e = entry("anything", None);
        e.task_id = Some(2);
        let result = correlator().verdict(&e, &tasks());

        assert_eq!(result.status, CorrelationStatus::Matched);
        assert_eq!(key_of(&result), Some("maa.log#2@20"));
        assert_eq!(result.strategy, Some(MatchStrategy::TaskId));
    }

    #[test]
    fn test_unknown_task_id_ignores_window() {
        let mut e = entry("StartUp", Some(T0 + 1));
        e.task_id = Some(99);
        assert_eq!(correlator().verdict(&e, &tasks()), CorrelationResult::unmatched());
    }

    #[test]
    fn test_disabled_task_id_does_not_fall_back() {
        let config = CorrelationConfig {
            enable_task_id_match: false,
            ..Default::default()
        };
        let c = Correlator::with_clock(config, FixedClock(0));
        let mut e = entry("StartUp", Some(T0 + 1));
        e.task_id = Some(1);
        assert_eq!(c.verdict(&e, &tasks()), CorrelationResult::unmatched());
    }

    #[test]
    fn test_identifier_match_is_exclusive() {
        let mut e = entry("StartUp", Some(T0 + 1));
        e.identifier = Some("uuid-2".into());
        let result = correlator().verdict(&e, &tasks());
        assert_eq!(key_of(&result), Some("maa.log#2@20"));
        assert_eq!(result.strategy, Some(MatchStrategy::Identifier));

        e.identifier = Some("uuid-404".into());
        assert!(!correlator().verdict(&e, &tasks()).is_matched());

        let config = CorrelationConfig {
            enable_identifier_match: false,
            ..Default::default()
        };
        e.identifier = Some("uuid-1".into());
        let c = Correlator::with_clock(config, FixedClock(0));
        assert!(!c.verdict(&e, &tasks()).is_matched());
    }

    #[rstest]
    #[case::unknown_task_id_with_known_identifier(Some(99), Some("uuid-1"), true, true)]
    #[case::disabled_task_id_with_known_identifier(Some(1), Some("uuid-1"), false, true)]
    #[case::disabled_task_id_alone(Some(1), None, false, true)]
    #[case::unknown_identifier_inside_window(None, Some("uuid-404"), true, true)]
    #[case::disabled_identifier_inside_window(None, Some("uuid-1"), true, false)]
    fn test_explicit_fields_never_fall_back(
        #[case] task_id: Option<u64>,
        #[case] identifier: Option<&str>,
        #[case] enable_task_id_match: bool,
        #[case] enable_identifier_match: bool,
    ) {
        let config = CorrelationConfig {
            enable_task_id_match,
            enable_identifier_match,
            ..Default::default()
        };
        let c = Correlator::with_clock(config, FixedClock(T0 + 1_000_000));

        // inside task 1's window and naming it, so every heuristic would match
        let mut e = entry("StartUp", Some(T0 + 1));
        e.task_id = task_id;
        e.identifier = identifier.map(str::to_string);

        assert_eq!(c.verdict(&e, &tasks()), CorrelationResult::unmatched());
    }

    #[test]
    fn test_repeated_task_id_prefers_task_around_entry() {
        let day = 86_400_000;
        let across_files = vec![
            TaskInfo { key: "maa.bak.log#1@1".into(), ..task(1, "StartUp", T0 - day, Some(T0 - day + 10_000)) },
            TaskInfo { key: "maa.log#1@1".into(), ..task(1, "StartUp", T0, Some(T0 + 300_000)) },
        ];

        let mut inside = entry("x", Some(T0 + 120_000));
        inside.task_id = Some(1);
        assert_eq!(key_of(&correlator().verdict(&inside, &across_files)), Some("maa.log#1@1"));

        // outside both spans: nearest start wins
        let mut near_old = entry("x", Some(T0 - day + 3_600_000));
        near_old.task_id = Some(1);
        assert_eq!(key_of(&correlator().verdict(&near_old, &across_files)), Some("maa.bak.log#1@1"));

        // no epoch: first in task order
        let mut undated = entry("x", None);
        undated.task_id = Some(1);
        assert_eq!(key_of(&correlator().verdict(&undated, &across_files)), Some("maa.bak.log#1@1"));
    }

    #[test]
    fn test_time_window_inside_single_task() {
        let result = correlator().verdict(&entry("tick", Some(T0 + 5_000)), &tasks());
        assert_eq!(key_of(&result), Some("maa.log#1@10"));
        assert_eq!(result.strategy, Some(MatchStrategy::TimeWindow));
    }

    #[test]
    fn test_time_window_slack_edges() {
        let c = correlator();
        assert!(c.verdict(&entry("tick", Some(T0 - 5_000)), &tasks()).is_matched());
        assert!(c.verdict(&entry("tick", Some(T0 + 15_000)), &tasks()).is_matched());
        assert!(!c.verdict(&entry("tick", Some(T0 - 5_001)), &tasks()).is_matched());
        assert!(!c.verdict(&entry("tick", Some(T0 + 30_000)), &tasks()).is_matched());
    }

    #[test]
    fn test_overlapping_windows_pick_earliest_start() {
        let overlapping = vec![
            task(2, "Later", T0 + 2_000, Some(T0 + 8_000)),
            task(1, "Earlier", T0, Some(T0 + 8_000)),
        ];
        let result = correlator().verdict(&entry("tick", Some(T0 + 3_000)), &overlapping);
        assert_eq!(key_of(&result), Some("maa.log#1@10"));
    }

    #[test]
    fn test_open_task_extends_to_now() {
        let open = vec![task(7, "Farm", T0, None)];
        let c = Correlator::with_clock(CorrelationConfig::default(), FixedClock(T0 + 100_000));
        assert!(c.verdict(&entry("tick", Some(T0 + 104_000)), &open).is_matched());
        assert!(!c.verdict(&entry("tick", Some(T0 + 106_000)), &open).is_matched());
    }

    #[test]
    fn test_keyword_match_after_window_miss() {
        let result = correlator().verdict(&entry("claiming dailyreward now", Some(T0 + 500_000)), &tasks());
        assert_eq!(key_of(&result), Some("maa.log#2@20"));
        assert_eq!(result.strategy, Some(MatchStrategy::Keyword));
    }

    #[test]
    fn test_keyword_match_on_entry_field() {
        let mut e = entry("clicked", None);
        e.entry = Some("STARTUP".into());
        let result = correlator().verdict(&e, &tasks());
        assert_eq!(key_of(&result), Some("maa.log#1@10"));
    }

    #[test]
    fn test_keyword_ignores_empty_task_entry() {
        let unnamed = vec![task(1, "", T0, Some(T0 + 1))];
        assert!(!correlator().verdict(&entry("anything", None), &unnamed).is_matched());
    }

    #[test]
    fn test_heuristics_disabled_leave_unmatched() {
        let config = CorrelationConfig {
            enable_time_window_match: false,
            enable_keyword_match: false,
            ..Default::default()
        };
        let c = Correlator::with_clock(config, FixedClock(0));
        assert!(!c.verdict(&entry("StartUp", Some(T0 + 1)), &tasks()).is_matched());
    }

    #[test]
    fn test_correlate_preserves_order_and_is_idempotent() {
        let mut with_id = entry("b", None);
        with_id.task_id = Some(1);
        let entries = vec![entry("a", Some(T0 + 65_000)), with_id, entry("c", None)];

        let c = correlator();
        let first = c.correlate(&entries, &tasks());
        let second = c.correlate(&entries, &tasks());

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].message, "a");
        assert_eq!(key_of(first[0].correlation.as_ref().unwrap()), Some("maa.log#2@20"));
        assert_eq!(first[2].correlation, Some(CorrelationResult::unmatched()));
    }

    #[test]
    fn test_annotate_summary() {
        let mut with_id = entry("b", None);
        with_id.task_id = Some(1);
        let mut entries = vec![entry("a", Some(T0 + 1)), with_id, entry("c", None)];

        let summary = correlator().annotate(&mut entries, &tasks());
        assert_eq!(summary.matched.get(&MatchStrategy::TimeWindow), Some(&1));
        assert_eq!(summary.matched.get(&MatchStrategy::TaskId), Some(&1));
        assert_eq!(summary.unmatched, 1);
    }

    #[test]
    fn test_free_function_uses_config() {
        let config = CorrelationConfig::default();
        let out = correlate(&[entry("x", Some(T0 + 1))], &tasks(), &config);
        assert!(out[0].correlation.as_ref().unwrap().is_matched());
    }
}
