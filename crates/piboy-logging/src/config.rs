use serde::{Deserialize, Serialize};

/// Contents of `<root>/config/logging.json`. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// An `EnvFilter` directive, e.g. `info` or `piboy_ui=debug,warn`.
    pub level: String,
    pub keep_days: u64,
    /// Upper bound for everything under `<root>/logs`.
    pub max_total_mb: u64,
}

impl LoggingConfig {
    pub fn max_total_bytes(&self) -> u64 {
        self.max_total_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            keep_days: 14,
            max_total_mb: 64,
        }
    }
}
