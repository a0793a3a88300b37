use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Slack on both sides of a task's span, in milliseconds
    #[serde(alias = "timeWindowMs")]
    pub time_window_ms: u64,
    #[serde(alias = "enableIdentifierMatch")]
    pub enable_identifier_match: bool,
    #[serde(alias = "enableTaskIdMatch")]
    pub enable_task_id_match: bool,
    #[serde(alias = "enableTimeWindowMatch")]
    pub enable_time_window_match: bool,
    #[serde(alias = "enableKeywordMatch")]
    pub enable_keyword_match: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            time_window_ms: 5000,
            enable_identifier_match: true,
            enable_task_id_match: true,
            enable_time_window_match: true,
            enable_keyword_match: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CorrelationConfig::default();
        assert_eq!(config.time_window_ms, 5000);
        assert!(config.enable_identifier_match);
        assert!(config.enable_task_id_match);
        assert!(config.enable_time_window_match);
        assert!(config.enable_keyword_match);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: CorrelationConfig = toml::from_str("timeWindowMs = 1000\nenable_keyword_match = false").unwrap();
        assert_eq!(config.time_window_ms, 1000);
        assert!(!config.enable_keyword_match);
        assert!(config.enable_task_id_match);
    }
}
