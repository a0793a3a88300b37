//! MaaEnd project: MaaFramework main log plus the Go agent service log.
//!
//! The agent service writes a stamp followed by logfmt pairs, with the
//! structured payload either under `details=` or as a bare JSON object:
//!
//! ```text
//! 2025-06-14 11:37:29.650 level=info task_id=1 entry=StartUp caller=agent/click.go:42 msg="clicked start" details={"x":120,"y":48}
//! [11:37:29.700] level=warn msg="retrying" {"attempt":2}
//! time="2025-06-14 11:37:29.800" level=debug msg=tick
//! ```

use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::maa_framework::{self, MAIN_LOG_PATTERNS};
use crate::parser::entry::{build_entry, EntryFields};
use crate::parser::fields::{json_str, json_u64, logfmt_tokens, merge_extras, payload_value, LogfmtToken};
use crate::parser::timestamp::{date_of, looks_like_timestamp, BaseDateTracker};
use crate::parser::traits::*;
use crate::parser::{DETECTION_SAMPLE_SIZE, MAX_LINE_SIZE};

pub const AUX_PATTERNS: &[&str] = &["go-service*.log", "maaend-agent*.log", "maaend*.aux.log"];

const DEFAULT_SOURCE: &str = "go-service";

/// Fields of one agent-service line before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaaEndLine {
    pub timestamp: String,
    pub level: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
    pub task_id: Option<u64>,
    pub identifier: Option<String>,
    pub entry: Option<String>,
    pub caller: Option<String>,
    pub details: Option<Value>,
}

pub fn parse_line(line: &str) -> Result<MaaEndLine, ParseError> {
    if line.len() > MAX_LINE_SIZE {
        return Err(ParseError::LineTooLarge(line.len(), MAX_LINE_SIZE));
    }

    let (stamp, rest) = split_stamp(line.trim());
    let mut parsed = MaaEndLine {
        timestamp: stamp.unwrap_or_default().to_string(),
        ..Default::default()
    };

    let mut payload = None;
    let mut extras = Map::new();
    let mut pairs = 0;

    for token in logfmt_tokens(rest) {
        let (key, value) = match token {
            LogfmtToken::Json(raw) => {
                payload = payload.or(Some(payload_value(&raw)));
                continue;
            }
            LogfmtToken::Pair(key, value) => (key, value),
        };
        pairs += 1;

        match key.as_str() {
            "level" | "lvl" | "severity" => parsed.level = Some(value),
            "msg" | "message" => parsed.message = Some(value),
            "task_id" | "taskid" | "task" => parsed.task_id = value.trim().parse().ok(),
            "identifier" | "uuid" | "task_uuid" => parsed.identifier = Some(value),
            "entry" | "task_entry" | "node" => parsed.entry = Some(value),
            "caller" => parsed.caller = Some(value),
            "source" | "component" | "logger" => parsed.source = Some(value),
            "time" | "ts" | "timestamp" if parsed.timestamp.is_empty() => parsed.timestamp = value,
            "details" | "payload" | "data" => payload = Some(payload_value(&value)),
            _ => {
                extras.insert(key, Value::String(value));
            }
        }
    }

    if parsed.timestamp.is_empty() || !looks_like_timestamp(&parsed.timestamp) {
        return Err(ParseError::MissingField("timestamp"));
    }
    if pairs == 0 || (parsed.level.is_none() && parsed.message.is_none()) {
        return Err(ParseError::InvalidFormat("no level or msg pair".into()));
    }

    // hints missing from the pairs may still sit in the payload
    if let Some(details) = &payload {
        if parsed.task_id.is_none() {
            parsed.task_id = json_u64(details, "task_id");
        }
        if parsed.identifier.is_none() {
            parsed.identifier = json_str(details, "identifier")
                .or_else(|| json_str(details, "uuid"))
                .map(str::to_string);
        }
        if parsed.entry.is_none() {
            parsed.entry = json_str(details, "entry").map(str::to_string);
        }
    }
    parsed.details = merge_extras(payload, extras);

    Ok(parsed)
}

/// Leading stamp: `[time]`, `YYYY-MM-DD HH:MM:SS.fff` or a time-only token.
fn split_stamp(text: &str) -> (Option<&str>, &str) {
    if let Some(inner) = text.strip_prefix('[') {
        if let Some(end) = inner.find(']') {
            if looks_like_timestamp(&inner[..end]) {
                return (Some(&inner[..end]), inner[end + 1..].trim_start());
            }
        }
        return (None, text);
    }

    let mut parts = text.splitn(3, char::is_whitespace);
    let first = parts.next().unwrap_or_default();
    let second = parts.next().unwrap_or_default();

    let two = first.len() + 1 + second.len();
    if let Some(stamp) = text.get(..two).filter(|s| !second.is_empty() && date_of(s).is_some()) {
        return (Some(stamp), text[two..].trim_start());
    }
    if looks_like_timestamp(first) {
        return (Some(first), text[first.len()..].trim_start());
    }

    (None, text)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MaaEndAuxParser;

impl LogFileMatcher for MaaEndAuxParser {
    fn kind(&self) -> ParserKind {
        ParserKind::MaaEndAux
    }

    fn file_patterns(&self) -> &'static [&'static str] {
        AUX_PATTERNS
    }

    fn sniff(&self, content: &str) -> bool {
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .take(DETECTION_SAMPLE_SIZE)
            .any(|l| matches!(parse_line(l), Ok(p) if p.level.is_some() && p.message.is_some()))
    }
}

impl AuxLogParser for MaaEndAuxParser {
    fn parse(&self, lines: &[&str], config: &ParseConfig) -> AuxParseResult {
        let mut tracker = BaseDateTracker::new(config.base_date.clone());
        let mut entries = Vec::new();

        for (idx, raw) in lines.iter().enumerate() {
            let line_number = idx + 1;
            let line = match parse_line(raw) {
                Ok(line) => line,
                Err(e) => {
                    trace!(file = %config.file_name, line = line_number, error = %e, "Skipping agent log line");
                    continue;
                }
            };

            let fields = EntryFields {
                source: line.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
                timestamp: tracker.normalize(&line.timestamp),
                level: line.level,
                message: line.message.unwrap_or_default(),
                identifier: line.identifier,
                task_id: line.task_id,
                entry: line.entry,
                caller: line.caller,
                details: line.details,
            };
            entries.push(build_entry(fields, config, line_number));
        }

        debug!(file = %config.file_name, lines = lines.len(), entries = entries.len(), "Parsed MaaEnd agent log");
        AuxParseResult { entries }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MaaEndProjectParser {
    aux: MaaEndAuxParser,
}

impl LogFileMatcher for MaaEndProjectParser {
    fn kind(&self) -> ParserKind {
        ParserKind::MaaEndProject
    }

    fn file_patterns(&self) -> &'static [&'static str] {
        MAIN_LOG_PATTERNS
    }

    fn sniff(&self, content: &str) -> bool {
        maa_framework::sniff(content)
    }
}

impl ProjectLogParser for MaaEndProjectParser {
    fn parse_main_log(&self, lines: &[&str], config: &ParseConfig) -> MainLogResult {
        maa_framework::parse_main_log(lines, config)
    }

    fn parse_aux_log(&self, lines: &[&str], config: &ParseConfig) -> AuxParseResult {
        self.aux.parse(lines, config)
    }

    fn aux_log_parser_info(&self) -> AuxLogParserInfo {
        AuxLogParserInfo {
            kind: self.aux.kind(),
            name: "MaaEnd agent service",
            description: "Go agent service log: stamp followed by logfmt pairs with JSON payloads",
            file_patterns: AUX_PATTERNS,
        }
    }
}
