//! Correlation engine: links auxiliary entries to primary-log tasks.
//!
//! Each entry gets exactly one verdict from a fixed precedence of
//! strategies: task_id, identifier, time window, keyword. An entry that
//! carries an explicit `task_id` or `identifier` is judged on that field
//! alone.

pub mod clock;
pub mod config;
pub mod engine;
pub mod result;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CorrelationConfig;
pub use engine::{correlate, Correlator};
pub use result::{CorrelationResult, CorrelationStatus, CorrelationSummary, MatchStrategy};
