//! Request execution
//!
//! Turns one request template plus variable scopes into one network call
//! and a set of test outcomes. Steps are strictly ordered: pre-request
//! script, resolution, auth, body/header building, URL building, the
//! single send, response normalization, test script.

use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;
use url::Url;

use crate::auth::{apply_auth, effective_auth, AppliedAuth};
use crate::client::{HttpClient, RawResponse, RequestBody};
use crate::config::EngineConfig;
use crate::errors::{ReqforgeError, Result};
use crate::models::{
    AuthConfig, BodyType, Environment, ExecutionResult, RequestTemplate, ResponseData,
    ScriptScope, Variable,
};
use crate::scripting::ScriptEngine;
use crate::vars::{build_variable_map, resolve_request};

/// Everything surrounding a single execution: variable sources and the
/// auth configs a request may inherit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionContext<'a> {
    pub environments: &'a [Environment],
    pub active_environment: Option<&'a str>,
    pub globals: &'a [Variable],
    pub collection_auth: Option<&'a AuthConfig>,
    pub folder_auth: Option<&'a AuthConfig>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        environments: &'a [Environment],
        active_environment: Option<&'a str>,
        globals: &'a [Variable],
    ) -> Self {
        Self {
            environments,
            active_environment,
            globals,
            collection_auth: None,
            folder_auth: None,
        }
    }
}

/// Single-request executor, shared by single sends, collection runs and
/// monitor runs
pub struct Executor {
    client: HttpClient,
    engine: ScriptEngine,
}

impl Executor {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config.request_timeout(), &config.user_agent)?,
            engine: ScriptEngine::new()?,
        })
    }

    /// Execute one request.
    ///
    /// `scope` is the caller-owned script state; pre-request scripts
    /// mutate it before resolution and test scripts may mutate it after.
    /// `iteration_vars` (data-file row) win over script variables on
    /// conflicting keys. A pre-request script failure or an unparsable
    /// URL aborts before any network I/O; a transport failure is an
    /// error, a non-2xx response is not.
    pub async fn execute(
        &self,
        request: &RequestTemplate,
        ctx: &ExecutionContext<'_>,
        scope: &mut ScriptScope,
        iteration_vars: Option<&HashMap<String, String>>,
    ) -> Result<ExecutionResult> {
        if let Some(script) = non_blank(request.pre_request_script.as_deref()) {
            self.engine.run_pre_request(script, scope)?;
        }

        let mut script_vars = scope.merged();
        if let Some(row) = iteration_vars {
            script_vars.extend(row.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let var_map = build_variable_map(
            ctx.active_environment,
            ctx.environments,
            ctx.globals,
            &script_vars,
        );
        let resolved = resolve_request(request, &var_map);

        let applied = effective_auth(
            resolved.auth.as_ref(),
            resolved.auth_inheritance,
            ctx.folder_auth,
            ctx.collection_auth,
        )
        .map(apply_auth)
        .unwrap_or_default();

        let (headers, body) = build_headers_and_body(&resolved, &applied);
        let url = build_url(&resolved, &applied)?;

        debug!(method = %resolved.method, url = %url, "executing request");

        let started = Instant::now();
        let raw = self
            .client
            .send(&resolved.method, url.as_str(), &headers, body)
            .await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let response = normalize_response(raw, elapsed_ms);

        let test_outcomes = match non_blank(request.test_script.as_deref()) {
            Some(script) => self.engine.run_test(script, scope, &response),
            None => Vec::new(),
        };

        Ok(ExecutionResult {
            response,
            test_outcomes,
        })
    }
}

fn non_blank(script: Option<&str>) -> Option<&str> {
    script.filter(|s| !s.trim().is_empty())
}

fn contains_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

/// Build the outgoing header list and body.
///
/// User headers are merged first, then auth headers, then the body's
/// derived content type; a header set earlier always beats one derived
/// later for the same key.
fn build_headers_and_body(
    request: &RequestTemplate,
    auth: &AppliedAuth,
) -> (Vec<(String, String)>, RequestBody) {
    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .filter(|h| h.enabled && !h.key.is_empty())
        .map(|h| (h.key.clone(), h.value.clone()))
        .collect();

    for (name, value) in &auth.headers {
        if !contains_header(&headers, name) {
            headers.push((name.clone(), value.clone()));
        }
    }

    let enabled_form = || {
        request
            .form
            .iter()
            .filter(|f| f.enabled && !f.key.is_empty())
            .map(|f| (f.key.clone(), f.value.clone()))
            .collect::<Vec<_>>()
    };

    let body = match request.body_type {
        BodyType::None => RequestBody::Empty,
        BodyType::FormUrlencoded => {
            let encoded = serde_urlencoded::to_string(enabled_form()).unwrap_or_default();
            RequestBody::Raw(encoded)
        }
        BodyType::FormData => RequestBody::Multipart(enabled_form()),
        BodyType::Json | BodyType::Xml | BodyType::Text | BodyType::Html => {
            RequestBody::Raw(request.body.clone())
        }
    };

    if let Some(content_type) = request.body_type.content_type() {
        if !contains_header(&headers, "Content-Type") {
            headers.push(("Content-Type".to_string(), content_type.to_string()));
        }
    }

    (headers, body)
}

/// Build the final URL: enabled template query params first, then any
/// params produced by auth. An unparsable base URL aborts before any
/// network attempt.
fn build_url(request: &RequestTemplate, auth: &AppliedAuth) -> Result<Url> {
    let base = request.url.trim();
    let mut url =
        Url::parse(base).map_err(|_| ReqforgeError::InvalidUrl(request.url.clone()))?;

    {
        let mut pairs = url.query_pairs_mut();
        for param in request.params.iter().filter(|p| p.enabled && !p.key.is_empty()) {
            pairs.append_pair(&param.key, &param.value);
        }
        for (key, value) in &auth.params {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

/// Normalize a transport response: the body is parsed as JSON only when
/// the response declares a JSON content type, else kept as raw text.
fn normalize_response(raw: RawResponse, elapsed_ms: u64) -> ResponseData {
    let declares_json = raw
        .headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .map(|(_, v)| v.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);

    let size_bytes = raw.text.len() as u64;
    let (data, is_json) = if declares_json {
        match serde_json::from_str(&raw.text) {
            Ok(value) => (value, true),
            Err(_) => (serde_json::Value::String(raw.text), false),
        }
    } else {
        (serde_json::Value::String(raw.text), false)
    };

    ResponseData {
        status: raw.status,
        status_text: raw.status_text,
        headers: raw.headers,
        data,
        is_json,
        time_ms: elapsed_ms,
        size_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiKeyLocation, AuthInheritance};

    fn raw(status: u16, content_type: Option<&str>, text: &str) -> RawResponse {
        let mut headers = HashMap::new();
        if let Some(ct) = content_type {
            headers.insert("content-type".to_string(), ct.to_string());
        }
        RawResponse {
            status,
            status_text: "OK".to_string(),
            headers,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_normalize_json_response() {
        let response = normalize_response(raw(200, Some("application/json"), r#"{"a":1}"#), 10);
        assert!(response.is_json);
        assert_eq!(response.data["a"], 1);
        assert_eq!(response.size_bytes, 7);
    }

    #[test]
    fn test_normalize_text_response() {
        let response = normalize_response(raw(200, Some("text/plain"), r#"{"a":1}"#), 10);
        // valid JSON text without a JSON content type stays raw
        assert!(!response.is_json);
        assert_eq!(response.data, serde_json::Value::String(r#"{"a":1}"#.to_string()));
        assert_eq!(response.text(), r#"{"a":1}"#);
    }

    #[test]
    fn test_normalize_invalid_declared_json_falls_back_to_text() {
        let response = normalize_response(raw(200, Some("application/json"), "not json"), 10);
        assert!(!response.is_json);
        assert_eq!(response.text(), "not json");
    }

    #[test]
    fn test_user_header_beats_auth_and_derived() {
        let mut request = RequestTemplate::get("r1", "https://api.test");
        request.body_type = BodyType::Json;
        request.body = "{}".to_string();
        request.headers = vec![
            Variable::new("Content-Type", "application/vnd.custom+json"),
            Variable::new("Authorization", "Bearer user-set"),
        ];

        let auth = AppliedAuth {
            headers: vec![("Authorization".to_string(), "Bearer derived".to_string())],
            params: Vec::new(),
        };

        let (headers, _) = build_headers_and_body(&request, &auth);
        let authz: Vec<_> = headers.iter().filter(|(k, _)| k == "Authorization").collect();
        assert_eq!(authz.len(), 1);
        assert_eq!(authz[0].1, "Bearer user-set");

        let ct: Vec<_> = headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(ct.len(), 1);
        assert_eq!(ct[0].1, "application/vnd.custom+json");
    }

    #[test]
    fn test_derived_content_type_applied_when_absent() {
        let mut request = RequestTemplate::get("r1", "https://api.test");
        request.body_type = BodyType::Xml;
        request.body = "<a/>".to_string();

        let (headers, body) = build_headers_and_body(&request, &AppliedAuth::default());
        assert!(headers
            .iter()
            .any(|(k, v)| k == "Content-Type" && v == "application/xml"));
        assert!(matches!(body, RequestBody::Raw(b) if b == "<a/>"));
    }

    #[test]
    fn test_form_urlencoded_body() {
        let mut request = RequestTemplate::get("r1", "https://api.test");
        request.body_type = BodyType::FormUrlencoded;
        request.form = vec![
            Variable::new("name", "a b"),
            Variable::disabled("skip", "x"),
            Variable::new("id", "1"),
        ];

        let (headers, body) = build_headers_and_body(&request, &AppliedAuth::default());
        assert!(headers
            .iter()
            .any(|(k, v)| k == "Content-Type" && v == "application/x-www-form-urlencoded"));
        match body {
            RequestBody::Raw(encoded) => assert_eq!(encoded, "name=a+b&id=1"),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_disabled_headers_excluded() {
        let mut request = RequestTemplate::get("r1", "https://api.test");
        request.headers = vec![Variable::disabled("X-Off", "1"), Variable::new("X-On", "2")];

        let (headers, _) = build_headers_and_body(&request, &AppliedAuth::default());
        assert_eq!(headers, vec![("X-On".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_build_url_appends_params_then_auth_params() {
        let mut request = RequestTemplate::get("r1", "https://api.test/users");
        request.params = vec![Variable::new("page", "2"), Variable::disabled("skip", "x")];
        let auth = AppliedAuth {
            headers: Vec::new(),
            params: vec![("api_key".to_string(), "k".to_string())],
        };

        let url = build_url(&request, &auth).unwrap();
        assert_eq!(url.as_str(), "https://api.test/users?page=2&api_key=k");
    }

    #[test]
    fn test_invalid_url_aborts() {
        let request = RequestTemplate::get("r1", "{{host}}/users");
        let err = build_url(&request, &AppliedAuth::default()).unwrap_err();
        assert!(matches!(err, ReqforgeError::InvalidUrl(_)));
    }

    #[test]
    fn test_effective_auth_wiring() {
        // effective_auth itself is covered in the auth module; this pins
        // the inheritance default on templates
        let request = RequestTemplate::get("r1", "https://api.test");
        assert_eq!(request.auth_inheritance, AuthInheritance::Inherit);
        assert!(request.auth.is_none());

        let collection = AuthConfig::ApiKey {
            key_name: "k".into(),
            value: "v".into(),
            add_to: ApiKeyLocation::Query,
        };
        let auth = effective_auth(
            request.auth.as_ref(),
            request.auth_inheritance,
            None,
            Some(&collection),
        );
        assert_eq!(auth, Some(&collection));
    }
}
