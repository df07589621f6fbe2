//! Mock HTTP server
//!
//! A small raw-HTTP server for serving canned responses during
//! development. Besides the configured data-plane routes it exposes a
//! control surface:
//! - `POST /__mock/load` replaces the route config
//! - `POST /__mock/stop` shuts the process down
//! - `GET  /__mock/status` reports route count and uptime

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, RwLock};
use tracing::{debug, info, warn};

use super::config::MockServerConfig;
use super::routes::{ResponseSpec, Route, RouteConfig};
use crate::errors::{ReqforgeError, Result};

struct MockState {
    routes: Vec<Route>,
    default_response: Option<ResponseSpec>,
}

pub struct MockServer {
    state: Arc<RwLock<MockState>>,
    shutdown: Arc<Notify>,
    started_at: Instant,
}

impl MockServer {
    pub fn new(config: MockServerConfig) -> Result<Self> {
        let routes = compile_routes(&config.routes)?;
        Ok(Self {
            state: Arc::new(RwLock::new(MockState {
                routes,
                default_response: config.default_response,
            })),
            shutdown: Arc::new(Notify::new()),
            started_at: Instant::now(),
        })
    }

    /// Bind and serve until `POST /__mock/stop` arrives
    pub async fn serve(&self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener (lets tests bind port 0 and
    /// read the local address first)
    pub async fn serve_on(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "mock server listening");

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("mock server stopping");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let state = Arc::clone(&self.state);
                            let shutdown = Arc::clone(&self.shutdown);
                            let uptime = self.started_at;
                            tokio::spawn(async move {
                                if let Err(e) =
                                    handle_connection(stream, state, shutdown, uptime).await
                                {
                                    debug!(%peer, error = %e, "connection error");
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "accept error"),
                    }
                }
            }
        }
        Ok(())
    }
}

fn compile_routes(configs: &[RouteConfig]) -> Result<Vec<Route>> {
    configs
        .iter()
        .map(|rc| Route::new(rc.clone()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ReqforgeError::Config(format!("invalid route: {}", e)))
}

/// Largest request the server will buffer
const MAX_REQUEST_SIZE: usize = 1024 * 1024;

async fn handle_connection(
    mut stream: TcpStream,
    state: Arc<RwLock<MockState>>,
    shutdown: Arc<Notify>,
    started_at: Instant,
) -> Result<()> {
    let buf = read_full_request(&mut stream).await?;
    if buf.is_empty() {
        return Ok(());
    }

    let request_str = String::from_utf8_lossy(&buf);
    let Some(request) = parse_request(&request_str) else {
        write_response(&mut stream, &ResponseSpec::error(400, "Bad Request")).await?;
        return Ok(());
    };

    debug!(method = %request.method, path = %request.path, "mock request");

    // control plane
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/__mock/load") => {
            let response = match serde_json::from_str::<MockServerConfig>(&request.body) {
                Ok(config) => match compile_routes(&config.routes) {
                    Ok(routes) => {
                        let count = routes.len();
                        let mut guard = state.write().await;
                        guard.routes = routes;
                        guard.default_response = config.default_response;
                        ResponseSpec::json_body(serde_json::json!({
                            "status": "ok",
                            "routes": count,
                        }))
                    }
                    Err(e) => ResponseSpec::error(400, &e.to_string()),
                },
                Err(e) => ResponseSpec::error(400, &format!("invalid config: {}", e)),
            };
            write_response(&mut stream, &response).await?;
            return Ok(());
        }
        ("POST", "/__mock/stop") => {
            let response = ResponseSpec::json_body(serde_json::json!({"status": "stopping"}));
            write_response(&mut stream, &response).await?;
            shutdown.notify_waiters();
            return Ok(());
        }
        ("GET", "/__mock/status") => {
            let guard = state.read().await;
            let response = ResponseSpec::json_body(serde_json::json!({
                "status": "running",
                "routes": guard.routes.len(),
                "uptime_secs": started_at.elapsed().as_secs(),
            }));
            drop(guard);
            write_response(&mut stream, &response).await?;
            return Ok(());
        }
        _ => {}
    }

    // data plane
    let response = {
        let guard = state.read().await;
        let matched = guard
            .routes
            .iter()
            .find(|route| {
                route
                    .matches(&request.method, &request.path, &request.query)
                    .is_some()
            })
            .map(|route| route.select_response(&request.query).clone());

        matched.unwrap_or_else(|| {
            guard
                .default_response
                .clone()
                .unwrap_or_else(|| ResponseSpec::error(404, "Not Found"))
        })
    };

    if response.delay_ms > 0 {
        tokio::time::sleep(tokio::time::Duration::from_millis(response.delay_ms)).await;
    }

    write_response(&mut stream, &response).await
}

/// Read until the header block and any declared Content-Length worth of
/// body have arrived; a request body may land in a later TCP segment
/// than its headers.
async fn read_full_request(stream: &mut TcpStream) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(header_end) = find_subslice(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..header_end]);
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.trim().eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);

            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }

        if buf.len() > MAX_REQUEST_SIZE {
            break;
        }
    }

    Ok(buf)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

struct ParsedRequest {
    method: String,
    path: String,
    query: HashMap<String, String>,
    body: String,
}

fn parse_request(data: &str) -> Option<ParsedRequest> {
    let mut lines = data.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let full_path = parts.next()?;

    let (path, query_str) = full_path.split_once('?').unwrap_or((full_path, ""));
    let query = parse_query_string(query_str);

    let body = data
        .split_once("\r\n\r\n")
        .or_else(|| data.split_once("\n\n"))
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();

    Some(ParsedRequest {
        method,
        path: path.to_string(),
        query,
        body,
    })
}

fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        if let Some((key, value)) = pair.split_once('=') {
            map.insert(
                urlencoding::decode(key).unwrap_or_else(|_| key.into()).to_string(),
                urlencoding::decode(value)
                    .unwrap_or_else(|_| value.into())
                    .to_string(),
            );
        }
    }
    map
}

async fn write_response(stream: &mut TcpStream, spec: &ResponseSpec) -> Result<()> {
    let body = spec.body_bytes();

    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        spec.status,
        status_text(spec.status)
    );
    for (name, value) in &spec.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    head.push_str("Connection: close\r\n\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await?;
    Ok(())
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_with_query_and_body() {
        let raw = "POST /api/users?page=1&kind=a%20b HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\r\n{\"ok\":true}";
        let parsed = parse_request(raw).unwrap();
        assert_eq!(parsed.method, "POST");
        assert_eq!(parsed.path, "/api/users");
        assert_eq!(parsed.query["page"], "1");
        assert_eq!(parsed.query["kind"], "a b");
        assert_eq!(parsed.body, "{\"ok\":true}");
    }

    #[test]
    fn test_parse_request_rejects_garbage() {
        assert!(parse_request("").is_none());
        assert!(parse_request("GET").is_none());
    }

    #[test]
    fn test_status_text_lookup() {
        assert_eq!(status_text(200), "OK");
        assert_eq!(status_text(418), "Unknown");
    }
}
