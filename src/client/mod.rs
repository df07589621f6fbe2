//! Network collaborator
//!
//! A single `send` primitive over one shared reqwest client. The rest of
//! the engine never touches reqwest directly, so a deployment that routes
//! traffic through a CORS relay only swaps this layer.

use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::errors::{ReqforgeError, Result};

/// Outgoing body, already fully built by the executor
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Raw(String),
    /// Multipart form fields (text parts only)
    Multipart(Vec<(String, String)>),
}

/// Transport-level response, before normalization
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    pub text: String,
}

/// Shared HTTP client
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Issue exactly one request. A transport failure is an error;
    /// a received non-2xx response is not.
    pub async fn send(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: RequestBody,
    ) -> Result<RawResponse> {
        let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| ReqforgeError::Argument(format!("invalid HTTP method: {}", method)))?;

        debug!(%method, url, "sending request");

        let mut builder = self.client.request(method, url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Raw(text) => builder.body(text),
            RequestBody::Multipart(fields) => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                builder.multipart(form)
            }
        };

        let response = builder.send().await?;

        let status = response.status();
        let mut header_map = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                header_map.insert(name.to_string(), text.to_string());
            }
        }

        let text = response.text().await?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: header_map,
            text,
        })
    }
}
