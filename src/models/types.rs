//! Request templates, variable scopes, execution results and monitors
//!
//! Templates are created and edited by the UI and owned by the collection
//! store; everything here is plain data with serde round-tripping.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    "GET".to_string()
}

/// A single key/value entry in a variable scope or a request's ordered
/// params/headers/form fields. Disabled entries are invisible to
/// resolution and to the request builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Variable {
    pub key: String,

    #[serde(default)]
    pub value: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Variable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Create a disabled entry
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: false,
        }
    }
}

/// A named, ordered list of variables. At most one environment is active
/// at a time; the active one is selected externally and passed by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// Mutable script-visible state for one execution or one run.
///
/// Pre-request scripts read and write these two maps through the `pm`
/// object; their union is folded into variable resolution as the
/// highest-precedence scope. The caller owns the container and threads it
/// through, so concurrent runs never share script state.
#[derive(Debug, Clone, Default)]
pub struct ScriptScope {
    pub environment: HashMap<String, String>,
    pub globals: HashMap<String, String>,
}

impl ScriptScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of both maps; the `environment` map wins on conflicting keys,
    /// continuing the ascending global-then-environment precedence of the
    /// outer resolution chain.
    pub fn merged(&self) -> HashMap<String, String> {
        let mut map = self.globals.clone();
        map.extend(self.environment.iter().map(|(k, v)| (k.clone(), v.clone())));
        map
    }
}

/// Request body type tag
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BodyType {
    #[default]
    None,
    Json,
    Xml,
    Text,
    Html,
    FormData,
    FormUrlencoded,
}

impl BodyType {
    /// Default content type derived from the body type. Only applied when
    /// the user has not set a Content-Type header of their own.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            BodyType::None | BodyType::FormData => None,
            BodyType::Json => Some("application/json"),
            BodyType::Xml => Some("application/xml"),
            BodyType::Text => Some("text/plain"),
            BodyType::Html => Some("text/html"),
            BodyType::FormUrlencoded => Some("application/x-www-form-urlencoded"),
        }
    }
}

/// Whether a request uses its own auth config or inherits from the
/// enclosing folder/collection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthInheritance {
    #[default]
    Inherit,
    Own,
}

/// Where an API key is attached
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    #[default]
    Header,
    Query,
}

/// Authentication configuration, one variant per supported scheme.
///
/// `digest` and `aws_sigv4` retain their credentials for display but are
/// never applied to outgoing requests: both require a challenge
/// round-trip or a request-signing pass that is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    NoAuth,
    ApiKey {
        #[serde(default)]
        key_name: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        add_to: ApiKeyLocation,
    },
    Bearer {
        #[serde(default)]
        token: String,
    },
    Basic {
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
    },
    Oauth2 {
        #[serde(default)]
        access_token: String,
    },
    Digest {
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
    },
    AwsSigV4 {
        #[serde(default)]
        access_key: String,
        #[serde(default)]
        secret_key: String,
        #[serde(default)]
        region: String,
        #[serde(default)]
        service: String,
    },
    JwtBearer {
        #[serde(default)]
        token: String,
    },
}

/// The persisted, user-edited request definition before any variable
/// substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTemplate {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default = "default_method")]
    pub method: String,

    pub url: String,

    /// Query parameters, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Variable>,

    /// Headers, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Variable>,

    /// Raw body text (or form fields for form body types)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,

    /// Form fields for `form-data` / `form-urlencoded` bodies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form: Vec<Variable>,

    #[serde(default)]
    pub body_type: BodyType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    #[serde(default)]
    pub auth_inheritance: AuthInheritance,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_request_script: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_script: Option<String>,
}

impl RequestTemplate {
    /// Create a bare GET template (used heavily by tests)
    pub fn get(id: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            method: "GET".to_string(),
            url: url.to_string(),
            params: Vec::new(),
            headers: Vec::new(),
            body: String::new(),
            form: Vec::new(),
            body_type: BodyType::None,
            auth: None,
            auth_inheritance: AuthInheritance::default(),
            pre_request_script: None,
            test_script: None,
        }
    }
}

/// A folder groups requests inside a collection and may carry its own
/// auth config, which outranks the collection's for inheriting requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    #[serde(default)]
    pub requests: Vec<RequestTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Root-level requests, executed before any folder's
    #[serde(default)]
    pub requests: Vec<RequestTemplate>,

    #[serde(default)]
    pub folders: Vec<Folder>,
}

impl Collection {
    /// Folder lookup by id
    pub fn folder(&self, folder_id: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == folder_id)
    }
}

/// Normalized response from one executed request.
///
/// `data` holds the parsed JSON body when the response declared a JSON
/// content type, otherwise the raw text as a JSON string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    pub status: u16,

    #[serde(default)]
    pub status_text: String,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default)]
    pub data: JsonValue,

    /// Whether `data` was parsed from a declared-JSON body
    #[serde(default)]
    pub is_json: bool,

    /// Round-trip time in milliseconds
    #[serde(default)]
    pub time_ms: u64,

    /// Body size in bytes
    #[serde(default)]
    pub size_bytes: u64,
}

impl ResponseData {
    /// Raw body text
    pub fn text(&self) -> String {
        match &self.data {
            JsonValue::String(s) if !self.is_json => s.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, key: &str) -> Option<&String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }
}

/// Outcome of one `pm.test(...)` registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestOutcome {
    pub name: String,
    pub passed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestOutcome {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            error: Some(error.into()),
        }
    }
}

/// Result of a single request execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub response: ResponseData,

    #[serde(default)]
    pub test_outcomes: Vec<TestOutcome>,
}

/// One execution wrapped with request identity and timing, as produced
/// by collection and monitor runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunItemResult {
    pub request_id: String,
    pub request_name: String,
    pub method: String,
    pub url: String,

    /// Zero-based iteration this item belongs to
    pub iteration: usize,

    /// HTTP status, absent when the request never reached the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    pub duration_ms: u64,

    #[serde(default)]
    pub outcomes: Vec<TestOutcome>,

    /// Executor error for synthetic failed items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunItemResult {
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.outcomes.iter().all(|o| o.passed)
    }
}

/// Aggregate result of a collection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub collection_id: String,
    pub collection_name: String,
    pub items: Vec<RunItemResult>,

    /// Total passing test outcomes across all items
    pub tests_passed: usize,

    /// Total failing test outcomes across all items
    pub tests_failed: usize,

    pub duration_ms: u64,

    /// True when the run was stopped early by the user
    pub stopped: bool,
}

/// Monitor run frequency
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MonitorSchedule {
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "1d")]
    Daily,
}

impl MonitorSchedule {
    pub const fn interval_ms(&self) -> i64 {
        match self {
            MonitorSchedule::FiveMinutes => 5 * 60 * 1000,
            MonitorSchedule::FifteenMinutes => 15 * 60 * 1000,
            MonitorSchedule::Hourly => 60 * 60 * 1000,
            MonitorSchedule::SixHours => 6 * 60 * 60 * 1000,
            MonitorSchedule::Daily => 24 * 60 * 60 * 1000,
        }
    }
}

/// Pass/fail gates evaluated after every monitor run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorThresholds {
    /// Fail the run when the slowest request exceeds this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_time_ms: Option<u64>,

    /// Fail the run when any status code falls below this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_status_code: Option<u16>,

    /// Fail the run when any test assertion failed
    #[serde(default)]
    pub alert_on_test_failure: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub url: String,

    /// Extra headers for the alert POST, as a raw JSON object string.
    /// Invalid JSON is silently ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// A scheduled, unattended run over a collection or one of its folders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    pub id: String,
    pub name: String,
    pub collection_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,

    pub schedule: MonitorSchedule,

    #[serde(default)]
    pub thresholds: MonitorThresholds,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Unix epoch milliseconds
    #[serde(default)]
    pub created_at: i64,

    /// Unix epoch milliseconds of the last completed run, absent until
    /// the monitor has run once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<i64>,
}

/// Per-request summary inside a monitor run record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorItemSummary {
    pub request_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    pub duration_ms: u64,
    pub passed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One completed monitor run. History is bounded and newest-first, and
/// survives the monitor being edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorRunRecord {
    pub monitor_id: String,
    pub monitor_name: String,

    /// Unix epoch milliseconds
    pub started_at: i64,
    pub finished_at: i64,

    pub passed: bool,

    pub total_requests: usize,
    pub failed_requests: usize,
    pub tests_passed: usize,
    pub tests_failed: usize,

    /// Slowest request in the run
    pub max_response_time_ms: u64,

    /// Lowest status code seen; 0 when no request produced a response
    pub min_status_code: u16,

    pub items: Vec<MonitorItemSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_scope_merge_precedence() {
        let mut scope = ScriptScope::new();
        scope.globals.insert("token".into(), "from-globals".into());
        scope.globals.insert("only".into(), "g".into());
        scope.environment.insert("token".into(), "from-env".into());

        let merged = scope.merged();
        assert_eq!(merged.get("token"), Some(&"from-env".to_string()));
        assert_eq!(merged.get("only"), Some(&"g".to_string()));
    }

    #[test]
    fn test_auth_config_tagged_serde() {
        let auth: AuthConfig = serde_json::from_str(
            r#"{"type": "api-key", "key_name": "X-Token", "value": "abc", "add_to": "query"}"#,
        )
        .unwrap();
        assert_eq!(
            auth,
            AuthConfig::ApiKey {
                key_name: "X-Token".into(),
                value: "abc".into(),
                add_to: ApiKeyLocation::Query,
            }
        );

        let round = serde_json::to_string(&AuthConfig::Bearer { token: "t".into() }).unwrap();
        assert!(round.contains(r#""type":"bearer""#));
    }

    #[test]
    fn test_body_type_content_types() {
        assert_eq!(BodyType::Json.content_type(), Some("application/json"));
        assert_eq!(BodyType::None.content_type(), None);
        // multipart boundary comes from the client, never a static default
        assert_eq!(BodyType::FormData.content_type(), None);
    }

    #[test]
    fn test_schedule_intervals() {
        assert_eq!(MonitorSchedule::FiveMinutes.interval_ms(), 300_000);
        assert_eq!(MonitorSchedule::Daily.interval_ms(), 86_400_000);
        let s: MonitorSchedule = serde_json::from_str(r#""15m""#).unwrap();
        assert_eq!(s, MonitorSchedule::FifteenMinutes);
    }

    #[test]
    fn test_template_defaults() {
        let t: RequestTemplate =
            serde_json::from_str(r#"{"id": "r1", "url": "https://api.test"}"#).unwrap();
        assert_eq!(t.method, "GET");
        assert_eq!(t.body_type, BodyType::None);
        assert_eq!(t.auth_inheritance, AuthInheritance::Inherit);
    }
}
