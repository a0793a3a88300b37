//! Loguru project: MaaFramework main log plus a Python agent logging
//! through loguru's default format.
//!
//! ```text
//! 2025-06-14 11:37:29.612 | INFO     | agent.custom.reco:analyze:57 - [enter] FindStartButton {"task_id": 1}
//! 2025-06-14 11:37:29.640 | SUCCESS  | agent.custom.reco:analyze:88 - [leave] FindStartButton
//! ```

use std::borrow::Cow;
use serde_json::Value;
use tracing::{debug, trace};

use super::maa_framework::{self, MAIN_LOG_PATTERNS};
use crate::parser::ansi::strip_ansi_codes;
use crate::parser::entry::{build_entry, canonical_level, EntryFields};
use crate::parser::fields::{json_str, json_u64, trailing_json};
use crate::parser::timestamp::{looks_like_timestamp, BaseDateTracker};
use crate::parser::traits::*;
use crate::parser::{DETECTION_SAMPLE_SIZE, MAX_LINE_SIZE};

pub const AUX_PATTERNS: &[&str] = &["agent*.log", "*.loguru.log"];

const DEFAULT_SOURCE: &str = "agent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMarker {
    Enter,
    Leave,
}

impl TraceMarker {
    fn as_str(&self) -> &'static str {
        match self {
            TraceMarker::Enter => "enter",
            TraceMarker::Leave => "leave",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoguruLine {
    pub timestamp: String,
    pub level: String,
    pub module: Option<String>,
    pub caller: Option<String>,
    pub message: String,
    pub trace: Option<TraceMarker>,
    pub trace_name: Option<String>,
    pub payload: Option<Value>,
}

pub fn parse_line(line: &str) -> Result<LoguruLine, ParseError> {
    if line.len() > MAX_LINE_SIZE {
        return Err(ParseError::LineTooLarge(line.len(), MAX_LINE_SIZE));
    }

    let clean: Cow<'_, str> = strip_ansi_codes(line);
    let mut parts = clean.splitn(3, '|');
    let stamp = parts.next().unwrap_or_default().trim();
    let level = parts.next().ok_or(ParseError::MissingField("level"))?.trim();
    let rest = parts.next().ok_or(ParseError::MissingField("message"))?.trim_start();

    if !looks_like_timestamp(stamp) {
        return Err(ParseError::MissingField("timestamp"));
    }
    if level.is_empty() || !level.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(ParseError::InvalidFormat(format!("bad level: {}", level)));
    }

    let (caller, text) = match rest.split_once(" - ") {
        Some((caller, text)) if is_caller(caller.trim()) => (Some(caller.trim()), text),
        _ => (None, rest),
    };

    let (text, payload) = match trailing_json(text) {
        Some((prefix, value)) => (prefix, Some(value)),
        None => (text.trim_end(), None),
    };

    let (trace, trace_name) = trace_marker(text);

    Ok(LoguruLine {
        timestamp: stamp.to_string(),
        level: canonical_level(level).into_owned(),
        module: caller
            .and_then(|c| c.split(':').next())
            .map(str::to_string),
        caller: caller.map(str::to_string),
        message: text.to_string(),
        trace,
        trace_name,
        payload,
    })
}

/// `module:function:line`
fn is_caller(s: &str) -> bool {
    let mut parts = s.rsplitn(3, ':');
    let line = parts.next().unwrap_or_default();
    parts.next().is_some()
        && parts.next().is_some()
        && !line.is_empty()
        && line.bytes().all(|b| b.is_ascii_digit())
}

fn trace_marker(text: &str) -> (Option<TraceMarker>, Option<String>) {
    let (marker, name) = if let Some(name) = text.strip_prefix("[enter]") {
        (TraceMarker::Enter, name)
    } else if let Some(name) = text.strip_prefix("[leave]") {
        (TraceMarker::Leave, name)
    } else {
        return (None, None);
    };

    let name = name.trim();
    (Some(marker), (!name.is_empty()).then(|| name.to_string()))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoguruAuxParser;

impl LogFileMatcher for LoguruAuxParser {
    fn kind(&self) -> ParserKind {
        ParserKind::LoguruAux
    }

    fn file_patterns(&self) -> &'static [&'static str] {
        AUX_PATTERNS
    }

    fn sniff(&self, content: &str) -> bool {
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .take(DETECTION_SAMPLE_SIZE)
            .any(|l| matches!(parse_line(l), Ok(p) if p.caller.is_some()))
    }
}

impl AuxLogParser for LoguruAuxParser {
    fn parse(&self, lines: &[&str], config: &ParseConfig) -> AuxParseResult {
        let mut tracker = BaseDateTracker::new(config.base_date.clone());
        let mut entries = Vec::new();

        for (idx, raw) in lines.iter().enumerate() {
            let line_number = idx + 1;
            let line = match parse_line(raw) {
                Ok(line) => line,
                Err(e) => {
                    trace!(file = %config.file_name, line = line_number, error = %e, "Skipping loguru line");
                    continue;
                }
            };

            let payload = line.payload.as_ref();
            let task_id = payload.and_then(|p| json_u64(p, "task_id"));
            let identifier = payload
                .and_then(|p| json_str(p, "identifier").or_else(|| json_str(p, "uuid")))
                .map(str::to_string);
            let entry = line
                .trace_name
                .clone()
                .or_else(|| payload.and_then(|p| json_str(p, "entry")).map(str::to_string));

            let fields = EntryFields {
                source: line.module.clone().unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
                timestamp: tracker.normalize(&line.timestamp),
                level: Some(line.level),
                message: line.message,
                identifier,
                task_id,
                entry,
                caller: line.caller,
                details: details_with_trace(line.payload, line.trace),
            };
            entries.push(build_entry(fields, config, line_number));
        }

        debug!(file = %config.file_name, lines = lines.len(), entries = entries.len(), "Parsed loguru log");
        AuxParseResult { entries }
    }
}

fn details_with_trace(payload: Option<Value>, trace: Option<TraceMarker>) -> Option<Value> {
    let Some(trace) = trace else {
        return payload;
    };
    let marker = Value::String(trace.as_str().to_string());
    match payload {
        Some(Value::Object(mut object)) => {
            object.insert("trace".to_string(), marker);
            Some(Value::Object(object))
        }
        Some(other) => Some(serde_json::json!({ "trace": marker, "payload": other })),
        None => Some(serde_json::json!({ "trace": marker })),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoguruProjectParser {
    aux: LoguruAuxParser,
}

impl LogFileMatcher for LoguruProjectParser {
    fn kind(&self) -> ParserKind {
        ParserKind::LoguruProject
    }

    fn file_patterns(&self) -> &'static [&'static str] {
        MAIN_LOG_PATTERNS
    }

    fn sniff(&self, content: &str) -> bool {
        maa_framework::sniff(content)
    }
}

impl ProjectLogParser for LoguruProjectParser {
    fn parse_main_log(&self, lines: &[&str], config: &ParseConfig) -> MainLogResult {
        maa_framework::parse_main_log(lines, config)
    }

    fn parse_aux_log(&self, lines: &[&str], config: &ParseConfig) -> AuxParseResult {
        self.aux.parse(lines, config)
    }

    fn aux_log_parser_info(&self) -> AuxLogParserInfo {
        AuxLogParserInfo {
            kind: self.aux.kind(),
            name: "loguru agent",
            description: "Python agent log in loguru's default format with enter/leave trace pairs",
            file_patterns: AUX_PATTERNS,
        }
    }
}
