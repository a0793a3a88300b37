//! Shared constructor for auxiliary entries.
//!
//! Every auxiliary dialect builds its entries here so defaults (severity,
//! key, empty-field handling) cannot drift between parsers.

use std::borrow::Cow;
use serde_json::Value;

use super::model::{AuxLogEntry, ParseConfig};
use super::timestamp::NormalizedTimestamp;

pub const DEFAULT_LEVEL: &str = "info";

/// Fields a dialect parser extracted from one line.
#[derive(Debug, Clone, Default)]
pub struct EntryFields {
    pub source: String,
    pub timestamp: NormalizedTimestamp,
    pub level: Option<String>,
    pub message: String,
    pub identifier: Option<String>,
    pub task_id: Option<u64>,
    pub entry: Option<String>,
    pub caller: Option<String>,
    pub details: Option<Value>,
}

/// Map a dialect's severity name onto the shared vocabulary
/// `trace | debug | info | warn | error | fatal`. Unknown names are
/// lower-cased and kept.
pub fn canonical_level(level: &str) -> Cow<'static, str> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "TRC" => Cow::Borrowed("trace"),
        "DEBUG" | "DBG" => Cow::Borrowed("debug"),
        "INFO" | "INF" | "SUCCESS" => Cow::Borrowed("info"),
        "WARNING" | "WARN" | "WRN" => Cow::Borrowed("warn"),
        "ERROR" | "ERR" => Cow::Borrowed("error"),
        "CRITICAL" | "FATAL" | "FTL" | "PANIC" | "DPANIC" => Cow::Borrowed("fatal"),
        other => Cow::Owned(other.to_ascii_lowercase()),
    }
}

pub fn build_entry(fields: EntryFields, config: &ParseConfig, line_number: usize) -> AuxLogEntry {
    let level = fields
        .level
        .as_deref()
        .map(canonical_level)
        .filter(|l| !l.is_empty())
        .map(Cow::into_owned)
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

    AuxLogEntry {
        key: format!("{}:{}", config.file_name, line_number),
        source: fields.source,
        timestamp: fields.timestamp.canonical,
        timestamp_ms: fields.timestamp.epoch_ms,
        level,
        message: fields.message,
        identifier: non_empty(fields.identifier),
        task_id: fields.task_id,
        entry: non_empty(fields.entry),
        caller: non_empty(fields.caller),
        details: fields.details.filter(|d| !d.is_null()),
        file_name: config.file_name.clone(),
        line_number,
        correlation: None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
