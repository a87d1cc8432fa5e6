use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Milliseconds between ticks. Zero ticks once per `advance` call.
    pub period_ms: u64,
    pub history_capacity: usize,
    /// Tick limit for `settle` before a circuit is reported unstable, and for how many ticks
    /// one `advance` may run to catch up.
    pub settle_limit: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            period_ms: 0,
            history_capacity: 100,
            settle_limit: 1000,
        }
    }
}

impl SimulatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = SimulatorConfig::from_json_str(r#"{ "period_ms": 250 }"#).unwrap();
        assert_eq!(config.period(), Duration::from_millis(250));
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.settle_limit, 1000);
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        let err = SimulatorConfig::from_json_str("{ period_ms: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SimulatorConfig::load("/nonexistent/circuit-sandbox.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
