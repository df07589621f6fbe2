//! Engine configuration
//!
//! Optional TOML file controlling timeouts and bounds. Anything missing
//! or unreadable falls back to defaults; configuration problems never
//! stop the engine from coming up.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_monitor_history_limit() -> usize {
    50
}

fn default_scheduler_tick_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("reqforge/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Bounded length of each workspace's monitor run history
    #[serde(default = "default_monitor_history_limit")]
    pub monitor_history_limit: usize,

    /// Fixed tick of the monitor scheduler, independent of any monitor's
    /// own schedule
    #[serde(default = "default_scheduler_tick_secs")]
    pub scheduler_tick_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            monitor_history_limit: default_monitor_history_limit(),
            scheduler_tick_secs: default_scheduler_tick_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file, falling back to defaults on any error
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid engine config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
