/// Log parsing and normalization module
///
/// Turns the raw lines of one file into canonical records: main-log events
/// and tasks for project parsers, auxiliary entries for auxiliary parsers.
///
/// # Architecture
///
/// - `traits.rs`: Matcher and parser contracts for both roles
/// - `model.rs`: Canonical records (tasks, nodes, controllers, entries)
/// - `timestamp.rs`: Stamp normalization and base-date threading
/// - `entry.rs`: The one constructor every auxiliary entry goes through
/// - `fields.rs`: Header, bracket, logfmt and JSON scanners
/// - `task.rs`: Folds main-log events into tasks
/// - `formats/`: Dialect implementations
/// - `metrics.rs`: Parsing and correlation counters
///
/// # Failure policy
///
/// Parsers never fail as a whole. Malformed lines are skipped, bad stamps
/// are passed through, and a file with nothing recognisable yields an empty
/// result.

pub mod traits;
pub mod model;
pub mod timestamp;
pub mod entry;
pub mod fields;
pub mod task;
pub mod formats;
pub mod metrics;
mod ansi;

// Re-export commonly used types
pub use traits::{AuxLogParser, LogFileMatcher, ProjectLogParser};
pub use model::{
    AuxLogEntry, AuxParseResult, MainLogResult, ParseConfig, ParseError, ParserKind, ParserRole,
    TaskInfo, TaskStatus,
};
pub use formats::{AuxParser, ProjectParser};
pub use timestamp::{normalize, NormalizedTimestamp};
pub use ansi::strip_ansi_codes;

// Constants
pub const MAX_LINE_SIZE: usize = 1_048_576; // 1MB
pub const DETECTION_SAMPLE_SIZE: usize = 5; // Lines to sample for sniffing
