use std::collections::BTreeMap;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::correlate::CorrelationResult;

/// Every parser implementation shipped with the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParserKind {
    /// Go agent service of the MaaEnd project (logfmt + JSON payloads)
    #[serde(rename = "maaend_aux")]
    MaaEndAux,
    /// MaaEnd project: MaaFramework main log + MaaEnd auxiliary log
    #[serde(rename = "maaend_project", alias = "maaend")]
    MaaEndProject,
    /// Python agent logging through loguru
    #[serde(rename = "loguru_aux")]
    LoguruAux,
    /// Loguru project: MaaFramework main log + loguru auxiliary log
    #[serde(rename = "loguru_project", alias = "loguru")]
    LoguruProject,
}

/// Role a parser plays for the file it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserRole {
    Project,
    Aux,
}

impl ParserKind {
    pub const ALL: [ParserKind; 4] = [
        ParserKind::MaaEndAux,
        ParserKind::MaaEndProject,
        ParserKind::LoguruAux,
        ParserKind::LoguruProject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParserKind::MaaEndAux => "maaend_aux",
            ParserKind::MaaEndProject => "maaend_project",
            ParserKind::LoguruAux => "loguru_aux",
            ParserKind::LoguruProject => "loguru_project",
        }
    }

    pub fn role(&self) -> ParserRole {
        match self {
            ParserKind::MaaEndAux | ParserKind::LoguruAux => ParserRole::Aux,
            ParserKind::MaaEndProject | ParserKind::LoguruProject => ParserRole::Project,
        }
    }
}

impl FromStr for ParserKind {
    type Err = String;

    /// Accepts the canonical name and the bare project names (`maaend`, `loguru`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maaend_aux" => Ok(ParserKind::MaaEndAux),
            "maaend_project" | "maaend" => Ok(ParserKind::MaaEndProject),
            "loguru_aux" => Ok(ParserKind::LoguruAux),
            "loguru_project" | "loguru" => Ok(ParserKind::LoguruProject),
            other => Err(format!("unknown parser kind: {}", other)),
        }
    }
}

/// Per-line parse failure. Never escapes a parse call: the line is skipped.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Line too large: {0} bytes (max: {1} bytes)")]
    LineTooLarge(usize, usize),
}

/// Per-file context handed to every parse call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseConfig {
    /// `YYYY-MM-DD` used to complete time-only stamps until the file
    /// provides its own date
    pub base_date: Option<String>,
    pub file_name: String,
}

impl ParseConfig {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            base_date: None,
            file_name: file_name.into(),
        }
    }

    pub fn with_base_date(mut self, base_date: Option<String>) -> Self {
        self.base_date = base_date;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Succeeded,
    Failed,
}

/// One pipeline node executed inside a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInfo {
    pub node_id: Option<u64>,
    pub name: String,
    pub status: TaskStatus,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub recognitions: u32,
    pub actions: u32,
}

/// One execution unit of the MaaFramework tasker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskInfo {
    /// Unique within one parse session only
    pub task_id: u64,
    pub key: String,
    pub entry: String,
    pub status: TaskStatus,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub start_time_ms: Option<i64>,
    pub end_time_ms: Option<i64>,
    pub nodes: Vec<NodeInfo>,
    #[serde(rename = "processId")]
    pub process_id: Option<String>,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    Adb,
    Win32,
    Custom,
    Unknown,
}

/// A controller instance seen in the main log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerInfo {
    pub ctrl_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub kind: ControllerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "processId")]
    pub process_id: Option<String>,
    pub first_seen: String,
    pub action_count: u32,
}

/// One `OnEventNotify` line of the MaaFramework main log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MainLogEvent {
    pub timestamp: String,
    #[serde(rename = "timestampMs")]
    pub timestamp_ms: Option<i64>,
    pub level: String,
    #[serde(rename = "processId")]
    pub process_id: Option<String>,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    #[serde(rename = "sourceFile", skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Event name, e.g. `Tasker.Task.Starting`
    pub message: String,
    pub details: Value,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "lineNumber")]
    pub line_number: usize,
}

/// One auxiliary log line after normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuxLogEntry {
    pub key: String,
    pub source: String,
    pub timestamp: String,
    #[serde(rename = "timestampMs")]
    pub timestamp_ms: Option<i64>,
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "lineNumber")]
    pub line_number: usize,
    /// Set only by the correlation engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<CorrelationResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuxParseResult {
    pub entries: Vec<AuxLogEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MainLogResult {
    pub events: Vec<MainLogEvent>,
    pub tasks: Vec<TaskInfo>,
    pub controllers: Vec<ControllerInfo>,
    pub base_date: Option<String>,
    /// task_id → task uuid
    pub identifier_map: BTreeMap<u64, String>,
    /// Lines that matched the main-log header syntax (events or not)
    pub lines_recognized: usize,
}

/// Descriptive metadata about the auxiliary parser a project delegates to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuxLogParserInfo {
    pub kind: ParserKind,
    pub name: &'static str,
    pub description: &'static str,
    pub file_patterns: &'static [&'static str],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_kind_round_trip_names() {
        for kind in ParserKind::ALL {
            assert_eq!(kind.as_str().parse::<ParserKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_parser_kind_project_aliases() {
        assert_eq!("MaaEnd".parse::<ParserKind>(), Ok(ParserKind::MaaEndProject));
        assert_eq!("loguru".parse::<ParserKind>(), Ok(ParserKind::LoguruProject));
        assert!("syslog".parse::<ParserKind>().is_err());
    }

    #[test]
    fn test_parser_roles() {
        assert_eq!(ParserKind::MaaEndAux.role(), ParserRole::Aux);
        assert_eq!(ParserKind::LoguruProject.role(), ParserRole::Project);
    }

    #[test]
    fn test_aux_entry_serializes_wire_names() {
        let entry = AuxLogEntry {
            key: "agent.log:1".into(),
            source: "agent".into(),
            timestamp: "2025-06-14 11:37:29.601".into(),
            timestamp_ms: Some(1),
            level: "info".into(),
            message: "hello".into(),
            identifier: None,
            task_id: Some(3),
            entry: None,
            caller: None,
            details: None,
            file_name: "agent.log".into(),
            line_number: 1,
            correlation: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["timestampMs"], 1);
        assert_eq!(json["task_id"], 3);
        assert_eq!(json["fileName"], "agent.log");
        assert!(json.get("identifier").is_none());
        assert!(json.get("correlation").is_none());
    }
}
