//! Mock server configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::routes::{ResponseSpec, RouteConfig};
use crate::errors::{ReqforgeError, Result};

fn default_port() -> u16 {
    7878
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Response for unmatched requests; 404 when absent
    #[serde(default)]
    pub default_response: Option<ResponseSpec>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            routes: Vec::new(),
            default_response: None,
        }
    }
}

impl MockServerConfig {
    /// Load a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ReqforgeError::Config(format!("invalid mock config: {}", e)))
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses() {
        let config: MockServerConfig = serde_json::from_str(
            r#"{
                "routes": [
                    {"method": "GET", "path": "/ping", "responses": [{"body": "pong"}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.port, 7878);
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].responses[0].body.as_deref(), Some("pong"));
    }

    #[test]
    fn test_address_formatting() {
        let config = MockServerConfig {
            port: 9001,
            ..Default::default()
        };
        assert_eq!(config.address(), "127.0.0.1:9001");
    }
}
