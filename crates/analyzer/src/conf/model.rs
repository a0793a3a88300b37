//! Model: AnalyzerConfig and related structs.

use serde::{Deserialize, Serialize};

use crate::correlate::CorrelationConfig;
use crate::parser::model::ParserKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub correlation: CorrelationConfig,
    pub parsers: ParsersConfig,
    pub metrics: MetricsConfig,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}

/// Which parsers the registry carries and how they rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsersConfig {
    /// Project that wins the primary log when several could parse it
    pub preferred_project: Option<ParserKind>,
    pub disabled: Vec<ParserKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
