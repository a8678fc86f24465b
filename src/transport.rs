use std::error::Error as _;
use std::time::Instant;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{HttpResponse, Method, RequestSpec};

/// Why a request produced no HTTP response at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let text = error_chain(&err);
        if err.is_timeout() {
            Self::Timeout(text)
        } else if err.is_connect() {
            Self::Connect(text)
        } else if err.is_builder() {
            Self::InvalidRequest(text)
        } else if err.is_body() || err.is_decode() {
            Self::Body(text)
        } else {
            Self::Other(text)
        }
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Something that can carry a [`RequestSpec`] to the service under test.
pub trait Transport {
    fn send(&self, request: &RequestSpec) -> Result<HttpResponse, TransportError>;

    /// Where requests go, for banners and reports.
    fn base_url(&self) -> &str;
}

/// Blocking reqwest client with the harness's default headers baked in.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &Config, token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("Bearer token contains characters not allowed in a header")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &RequestSpec) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let started = Instant::now();
        let response = builder.send().map_err(|err| {
            let err = TransportError::from(err);
            warn!(method = %request.method, %url, error = %err, "request failed");
            err
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .map_err(|err| TransportError::Body(error_chain(&err)))?;

        debug!(
            method = %request.method,
            %url,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = body.len(),
            "response received"
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    /// Serve one canned response and hand back the raw request head.
    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if n == 0 || buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    fn config_for(base_url: String) -> Config {
        Config {
            base_url,
            user_agent: "leoprobe-test/1.0".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_send_returns_status_headers_body() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nAccess-Control-Allow-Origin: *\r\nContent-Length: 6\r\nConnection: close\r\n\r\n[\"D1\"]",
        );
        let transport = HttpTransport::new(&config_for(base_url), Some("secret")).unwrap();

        let resp = transport
            .send(&RequestSpec::get("/clubs").query("district", "D1"))
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "[\"D1\"]");
        assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(resp.header("content-type"), Some("application/json"));

        let head = server.join().unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /clubs?district=d1 http/1.1"));
        assert!(head.contains("user-agent: leoprobe-test/1.0"));
        assert!(head.contains("accept: application/json"));
        assert!(head.contains("authorization: bearer secret"));
    }

    #[test]
    fn test_request_header_overrides_default() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let transport = HttpTransport::new(&config_for(base_url), None).unwrap();

        let resp = transport
            .send(
                &RequestSpec::post("/auth/google")
                    .json(json!({}))
                    .header("Authorization", "Bearer mock"),
            )
            .unwrap();
        assert_eq!(resp.status, 401);
        assert_eq!(resp.body, "");

        let head = server.join().unwrap().to_ascii_lowercase();
        assert!(head.starts_with("post /auth/google"));
        assert!(head.contains("authorization: bearer mock"));
        assert!(head.contains("content-type: application/json"));
    }

    #[test]
    fn test_connection_refused_is_connect_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let transport = HttpTransport::new(&config_for(format!("http://{addr}")), None).unwrap();

        let err = transport.send(&RequestSpec::get("/")).unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "{err:?}");
    }

    #[test]
    fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(600));
            drop(stream);
        });
        let transport = HttpTransport::new(&config_for(format!("http://{addr}")), None).unwrap();

        let err = transport
            .send(&RequestSpec::get("/").timeout(Duration::from_millis(150)))
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)), "{err:?}");
        server.join().unwrap();
    }

    #[test]
    fn test_rejects_token_with_newline() {
        assert!(HttpTransport::new(&Config::default(), Some("bad\ntoken")).is_err());
    }
}
