//! HTTP and WebSocket clients for the CRCON API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod logs;
mod players;
mod stream;

pub use stream::LogStream;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use crate::objects::ApiResponse;

/// Errors produced by the SDK clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// The server answered with `failed: true` or without a result.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The API token cannot be sent as a header value.
    #[error("invalid auth header: {0}")]
    InvalidHeader(String),

    /// WebSocket handshake or framing failure.
    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// The log stream was closed by the server.
    #[error("log stream closed: {0}")]
    StreamClosed(String),

    /// The server did not answer the WebSocket handshake in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl ClientError {
    /// Whether the error is about the payload rather than the connection.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

/// Request timeout used unless [`CrconClient::with_timeout`] says otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed client for one CRCON instance.
///
/// Every request carries `Authorization: Bearer <api token>`.
#[derive(Debug, Clone)]
pub struct CrconClient {
    http: Client,
    base_url: Url,
    api_token: String,
    timeout: Duration,
}

impl CrconClient {
    /// Create a new `CrconClient`.
    ///
    /// * `base_url` – root URL of the CRCON web UI (e.g. `https://rcon.example.com`).
    /// * `api_token` – API key created in the CRCON admin panel.
    pub fn new(mut base_url: Url, api_token: impl Into<String>) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http: http_client(DEFAULT_TIMEOUT),
            base_url,
            api_token: api_token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound every HTTP request and the log stream handshake by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = http_client(timeout);
        self.timeout = timeout;
        self
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }
}

fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    let envelope: ApiResponse<T> = serde_json::from_slice(&bytes)?;
    envelope.into_result().map_err(ClientError::Rejected)
}
