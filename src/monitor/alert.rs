//! Webhook alerting
//!
//! Fired asynchronously when a monitor run fails. Alert delivery is
//! fire-and-forget: any failure is logged and swallowed, it must never
//! fail the monitor run itself.

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::models::{Monitor, MonitorRunRecord};

/// Post the failure envelope to the monitor's webhook, if configured.
/// Returns immediately; delivery happens on a spawned task.
pub fn fire_webhook_alert(monitor: &Monitor, record: &MonitorRunRecord) {
    if !monitor.webhook.enabled || monitor.webhook.url.trim().is_empty() {
        return;
    }

    let url = monitor.webhook.url.clone();
    let custom_headers = parse_custom_headers(monitor.webhook.headers.as_deref());
    let envelope = serde_json::json!({
        "event": "monitor_failed",
        "monitor": {
            "id": monitor.id,
            "name": monitor.name,
        },
        "run": record,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let mut request = client
            .post(&url)
            .header("Content-Type", "application/json");
        for (name, value) in custom_headers {
            request = request.header(name, value);
        }

        match request.body(envelope.to_string()).send().await {
            Ok(response) => {
                debug!(url, status = response.status().as_u16(), "alert delivered");
            }
            Err(e) => {
                warn!(url, error = %e, "alert delivery failed");
            }
        }
    });
}

/// Parse the user-supplied custom header blob. Invalid JSON (or a
/// non-object) is silently ignored, falling back to just the default
/// Content-Type.
fn parse_custom_headers(raw: Option<&str>) -> Vec<(String, String)> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(fields)) => fields
            .into_iter()
            .filter_map(|(name, value)| match value {
                JsonValue::String(s) => Some((name, s)),
                other => Some((name, other.to_string())),
            })
            .collect(),
        _ => Vec::new(),
    }
}
