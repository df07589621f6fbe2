//! Mock server route definitions and matching
//!
//! Requests are matched by method, path pattern (`:param` segments) and
//! optional query-parameter rules. A route carries one or more candidate
//! responses picked by its selection strategy.

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// HTTP method for route matching
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MockMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    #[default]
    #[serde(rename = "*")]
    Any,
}

impl MockMethod {
    pub fn matches(&self, method: &str) -> bool {
        match self {
            MockMethod::Any => true,
            MockMethod::Get => method.eq_ignore_ascii_case("GET"),
            MockMethod::Post => method.eq_ignore_ascii_case("POST"),
            MockMethod::Put => method.eq_ignore_ascii_case("PUT"),
            MockMethod::Delete => method.eq_ignore_ascii_case("DELETE"),
            MockMethod::Patch => method.eq_ignore_ascii_case("PATCH"),
            MockMethod::Head => method.eq_ignore_ascii_case("HEAD"),
            MockMethod::Options => method.eq_ignore_ascii_case("OPTIONS"),
        }
    }
}

fn default_status() -> u16 {
    200
}

/// One candidate response for a route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSpec {
    #[serde(default = "default_status")]
    pub status: u16,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Raw body text
    #[serde(default)]
    pub body: Option<String>,

    /// JSON body, serialized with a matching content type
    #[serde(default)]
    pub json: Option<serde_json::Value>,

    /// Delay before responding (milliseconds)
    #[serde(default)]
    pub delay_ms: u64,

    /// Query-param value this response answers to, for the
    /// `by-query-param` strategy
    #[serde(default)]
    pub when: Option<String>,
}

impl Default for ResponseSpec {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: None,
            json: None,
            delay_ms: 0,
            when: None,
        }
    }
}

impl ResponseSpec {
    pub fn text(body: &str) -> Self {
        Self {
            body: Some(body.to_string()),
            headers: [("Content-Type".to_string(), "text/plain".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        }
    }

    pub fn json_body(value: serde_json::Value) -> Self {
        Self {
            json: Some(value),
            headers: [("Content-Type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        if let Some(ref json) = self.json {
            serde_json::to_string_pretty(json)
                .unwrap_or_else(|_| "{}".to_string())
                .into_bytes()
        } else if let Some(ref body) = self.body {
            body.clone().into_bytes()
        } else {
            Vec::new()
        }
    }
}

/// How a route with multiple responses picks one
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    #[default]
    First,
    Random,
    Sequential,
    ByQueryParam,
}

/// Route configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(default)]
    pub method: MockMethod,

    /// Path pattern with `:param` placeholders, e.g. `/users/:id`
    pub path: String,

    /// Query-parameter rules; every listed pair must be present on the
    /// request for the route to match
    #[serde(default)]
    pub query: HashMap<String, String>,

    #[serde(default)]
    pub responses: Vec<ResponseSpec>,

    #[serde(default)]
    pub strategy: SelectionStrategy,

    /// Query param consulted by the `by-query-param` strategy
    #[serde(default)]
    pub select_by: Option<String>,
}

impl RouteConfig {
    pub fn get(path: &str, body: &str) -> Self {
        Self {
            method: MockMethod::Get,
            path: path.to_string(),
            query: HashMap::new(),
            responses: vec![ResponseSpec::text(body)],
            strategy: SelectionStrategy::First,
            select_by: None,
        }
    }
}

/// A compiled route for efficient matching
#[derive(Debug, Clone)]
pub struct Route {
    pub config: RouteConfig,
    path_regex: Regex,
    param_names: Vec<String>,
    sequence: Arc<AtomicUsize>,
}

impl Route {
    pub fn new(config: RouteConfig) -> Result<Self, String> {
        let (path_regex, param_names) = compile_path_pattern(&config.path)?;
        if config.responses.is_empty() {
            return Err(format!("route '{}' has no responses", config.path));
        }
        Ok(Self {
            config,
            path_regex,
            param_names,
            sequence: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Match against a request; on success returns the captured path
    /// params.
    pub fn matches(
        &self,
        method: &str,
        path: &str,
        query: &HashMap<String, String>,
    ) -> Option<HashMap<String, String>> {
        if !self.config.method.matches(method) {
            return None;
        }

        for (key, expected) in &self.config.query {
            if query.get(key) != Some(expected) {
                return None;
            }
        }

        self.path_regex.captures(path).map(|caps| {
            let mut params = HashMap::new();
            for (i, name) in self.param_names.iter().enumerate() {
                if let Some(m) = caps.get(i + 1) {
                    params.insert(name.clone(), m.as_str().to_string());
                }
            }
            params
        })
    }

    /// Pick one of the candidate responses per the route's strategy
    pub fn select_response(&self, query: &HashMap<String, String>) -> &ResponseSpec {
        let responses = &self.config.responses;
        match self.config.strategy {
            SelectionStrategy::First => &responses[0],
            SelectionStrategy::Random => {
                let idx = rand::rng().random_range(0..responses.len());
                &responses[idx]
            }
            SelectionStrategy::Sequential => {
                let idx = self.sequence.fetch_add(1, Ordering::Relaxed) % responses.len();
                &responses[idx]
            }
            SelectionStrategy::ByQueryParam => {
                let value = self
                    .config
                    .select_by
                    .as_ref()
                    .and_then(|param| query.get(param));
                value
                    .and_then(|v| {
                        responses
                            .iter()
                            .find(|r| r.when.as_deref() == Some(v.as_str()))
                    })
                    .unwrap_or(&responses[0])
            }
        }
    }
}

/// Compile a `:param` path pattern into a regex
fn compile_path_pattern(pattern: &str) -> Result<(Regex, Vec<String>), String> {
    let mut regex_str = String::from("^");
    let mut param_names = Vec::new();

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' => {
                let mut param_name = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        param_name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if param_name.is_empty() {
                    return Err("empty parameter name in path pattern".to_string());
                }
                param_names.push(param_name);
                regex_str.push_str("([^/]+)");
            }
            '.' | '+' | '?' | '*' | '(' | ')' | '[' | ']' | '{' | '}' | '\\' | '^' | '$'
            | '|' => {
                regex_str.push('\\');
                regex_str.push(c);
            }
            _ => regex_str.push(c),
        }
    }
    regex_str.push('$');

    Regex::new(&regex_str)
        .map(|r| (r, param_names))
        .map_err(|e| format!("invalid path pattern: {}", e))
}
