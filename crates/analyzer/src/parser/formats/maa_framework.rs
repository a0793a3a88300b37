//! MaaFramework main log (`maa.log`).
//!
//! ```text
//! [2025-06-14 11:37:29.601][INF][Px14200][Tx9536][Tasker.cpp][L112][MaaNS::Tasker::run] !!!OnEventNotify!!! [handle=0x1] [msg=Tasker.Task.Starting] [details={"task_id":1,...}]
//! ```
//!
//! Every header-bearing line is recognised; only `OnEventNotify` lines
//! become events. Both project parsers share this dialect.

use std::borrow::Cow;
use serde_json::Value;
use tracing::{debug, trace};

use crate::parser::entry::{canonical_level, DEFAULT_LEVEL};
use crate::parser::fields::{bracketed_fields, header_groups};
use crate::parser::task::TaskAssembler;
use crate::parser::timestamp::{looks_like_timestamp, BaseDateTracker};
use crate::parser::traits::*;
use crate::parser::model::MainLogEvent;
use crate::parser::{DETECTION_SAMPLE_SIZE, MAX_LINE_SIZE};

pub const MAIN_LOG_PATTERNS: &[&str] = &["maa.log", "maa.bak.log", "maa.*.log"];

const EVENT_MARKER: &str = "!!!OnEventNotify!!!";

/// Header fields of one main-log line, borrowed from the line.
#[derive(Debug, Clone, PartialEq)]
pub struct MainLogLine<'a> {
    pub timestamp: &'a str,
    pub level: Option<&'a str>,
    pub process_id: Option<&'a str>,
    pub thread_id: Option<&'a str>,
    pub source_file: Option<&'a str>,
    pub source_line: Option<u32>,
    pub function: Option<&'a str>,
    pub message: &'a str,
}

pub fn parse_line(line: &str) -> Result<MainLogLine<'_>, ParseError> {
    if line.len() > MAX_LINE_SIZE {
        return Err(ParseError::LineTooLarge(line.len(), MAX_LINE_SIZE));
    }

    let (groups, message) = header_groups(line.trim_end());
    let (timestamp, rest) = groups
        .split_first()
        .ok_or(ParseError::InvalidFormat("no header groups".into()))?;

    if !looks_like_timestamp(timestamp) {
        return Err(ParseError::InvalidFormat("header does not start with a timestamp".into()));
    }

    let mut parsed = MainLogLine {
        timestamp: *timestamp,
        level: None,
        process_id: None,
        thread_id: None,
        source_file: None,
        source_line: None,
        function: None,
        message,
    };

    let mut rest = rest;
    if let Some((level, tail)) = rest.split_first() {
        if level.len() == 3 && level.bytes().all(|b| b.is_ascii_uppercase()) {
            parsed.level = Some(*level);
            rest = tail;
        }
    }

    let mut unnamed = Vec::new();
    for group in rest {
        if let Some(pid) = group.strip_prefix("Px") {
            parsed.process_id = Some(pid);
        } else if let Some(tid) = group.strip_prefix("Tx") {
            parsed.thread_id = Some(tid);
        } else if let Some(line_no) = source_line(group) {
            parsed.source_line = Some(line_no);
            parsed.source_file = unnamed.pop();
        } else if parsed.source_line.is_some() && parsed.function.is_none() {
            parsed.function = Some(*group);
        } else {
            unnamed.push(*group);
        }
    }

    Ok(parsed)
}

fn source_line(group: &str) -> Option<u32> {
    let digits = group.strip_prefix('L')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn level_name(code: Option<&str>) -> Cow<'static, str> {
    code.map(canonical_level).unwrap_or(Cow::Borrowed(DEFAULT_LEVEL))
}

/// Event name and payload of an `OnEventNotify` message.
pub fn parse_event(message: &str) -> Option<(&str, Value)> {
    let idx = message.find(EVENT_MARKER)?;
    let tail = &message[idx + EVENT_MARKER.len()..];

    let mut name = None;
    let mut details = Value::Null;
    for (key, value) in bracketed_fields(tail) {
        match key {
            "msg" => name = Some(value),
            "details" => {
                details = serde_json::from_str(value).unwrap_or_else(|e| {
                    trace!(error = %e, "Event details are not JSON");
                    Value::Null
                })
            }
            _ => {}
        }
    }

    name.filter(|n| !n.is_empty()).map(|n| (n, details))
}

/// True when any sampled line carries the main-log header with a process id.
pub fn sniff(content: &str) -> bool {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DETECTION_SAMPLE_SIZE)
        .any(|l| matches!(parse_line(l), Ok(parsed) if parsed.process_id.is_some()))
}

pub fn parse_main_log(lines: &[&str], config: &ParseConfig) -> MainLogResult {
    let mut tracker = BaseDateTracker::new(config.base_date.clone());
    let mut assembler = TaskAssembler::new(config.file_name.clone());
    let mut events = Vec::new();
    let mut recognized = 0;

    for (idx, raw) in lines.iter().enumerate() {
        let line_number = idx + 1;
        let line = match parse_line(raw) {
            Ok(line) => line,
            Err(e) => {
                trace!(file = %config.file_name, line = line_number, error = %e, "Skipping main log line");
                continue;
            }
        };
        recognized += 1;

        let timestamp = tracker.normalize(line.timestamp);
        let Some((name, details)) = parse_event(line.message) else {
            continue;
        };

        let event = MainLogEvent {
            timestamp: timestamp.canonical,
            timestamp_ms: timestamp.epoch_ms,
            level: level_name(line.level).into_owned(),
            process_id: line.process_id.map(str::to_string),
            thread_id: line.thread_id.map(str::to_string),
            source_file: line.source_file.map(str::to_string),
            function: line.function.map(str::to_string),
            message: name.to_string(),
            details,
            file_name: config.file_name.clone(),
            line_number,
        };
        assembler.push(&event);
        events.push(event);
    }

    let assembled = assembler.finish();
    debug!(
        file = %config.file_name,
        lines = lines.len(),
        recognized,
        events = events.len(),
        tasks = assembled.tasks.len(),
        "Parsed main log"
    );

    MainLogResult {
        events,
        tasks: assembled.tasks,
        controllers: assembled.controllers,
        base_date: tracker.current().map(str::to_string),
        identifier_map: assembled.identifier_map,
        lines_recognized: recognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::model::TaskStatus;
    use serde_json::json;

    const START: &str = r#"[2025-06-14 11:37:29.601][INF][Px14200][Tx9536][Tasker.cpp][L112][MaaNS::Tasker::run] !!!OnEventNotify!!! [handle=0x1] [msg=Tasker.Task.Starting] [details={"task_id":1,"entry":"StartUp","uuid":"5f1c","hash":"abc"}]"#;

    #[test]
    fn test_parse_header() {
        let line = parse_line(START).unwrap();
        assert_eq!(line.timestamp, "2025-06-14 11:37:29.601");
        assert_eq!(line.level, Some("INF"));
        assert_eq!(line.process_id, Some("14200"));
        assert_eq!(line.thread_id, Some("9536"));
        assert_eq!(line.source_file, Some("Tasker.cpp"));
        assert_eq!(line.source_line, Some(112));
        assert_eq!(line.function, Some("MaaNS::Tasker::run"));
        assert!(line.message.starts_with(EVENT_MARKER));
    }

    #[test]
    fn test_parse_short_header() {
        let line = parse_line("[11:37:30.000][WRN][Px1][Tx2] plain text").unwrap();
        assert_eq!(line.timestamp, "11:37:30.000");
        assert_eq!(level_name(line.level), "warn");
        assert_eq!(line.source_file, None);
        assert_eq!(line.message, "plain text");
    }

    #[test]
    fn test_reject_non_header_lines() {
        assert!(parse_line("").is_err());
        assert!(parse_line("plain text").is_err());
        assert!(parse_line("[INF][Px1] no timestamp").is_err());
    }

    #[test]
    fn test_parse_event() {
        let line = parse_line(START).unwrap();
        let (name, details) = parse_event(line.message).unwrap();
        assert_eq!(name, "Tasker.Task.Starting");
        assert_eq!(details["entry"], json!("StartUp"));
        assert!(parse_event("no marker [msg=x]").is_none());
    }

    #[test]
    fn test_parse_main_log_threads_base_date() {
        let lines = vec![
            "[11:00:00.000][INF][Px1][Tx1] before any date",
            START,
            "garbage line",
            r#"[11:37:35.100][INF][Px14200][Tx9536][Tasker.cpp][L130][MaaNS::Tasker::run] !!!OnEventNotify!!! [msg=Tasker.Task.Succeeded] [details={"task_id":1,"entry":"StartUp"}]"#,
        ];
        let result = parse_main_log(&lines, &ParseConfig::new("maa.log"));

        assert_eq!(result.lines_recognized, 3);
        assert_eq!(result.base_date.as_deref(), Some("2025-06-14"));
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[1].timestamp, "2025-06-14 11:37:35.100");
        assert_eq!(result.events[1].line_number, 4);

        assert_eq!(result.tasks.len(), 1);
        let task = &result.tasks[0];
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(task.end_time.as_deref(), Some("2025-06-14 11:37:35.100"));
        assert_eq!(task.process_id.as_deref(), Some("14200"));
        assert_eq!(result.identifier_map.get(&1).map(String::as_str), Some("5f1c"));
    }

    #[test]
    fn test_parse_main_log_empty_file() {
        let result = parse_main_log(&["nothing", "to see"], &ParseConfig::new("maa.log"));
        assert_eq!(result, MainLogResult::default());
    }

    #[test]
    fn test_sniff() {
        assert!(sniff(&format!("\n{}\n", START)));
        assert!(!sniff("2025-06-14 11:37:29.601 | INFO | a:b:1 - hi"));
    }
}
