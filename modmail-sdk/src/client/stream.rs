//! Live log stream over WebSocket.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::{ClientError, CrconClient};
use crate::objects::{LogStreamBatch, LogStreamSubscribe};

/// An open, subscribed `/ws/logs` connection.
pub struct LogStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl std::fmt::Debug for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStream").finish_non_exhaustive()
    }
}

impl CrconClient {
    /// WebSocket URL of the log stream (`ws://` or `wss://` following the
    /// base URL scheme).
    pub fn log_stream_url(&self) -> Result<Url, ClientError> {
        let mut url = self.endpoint("ws/logs")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::Rejected(format!("cannot use {scheme} for {url}")))?;
        Ok(url)
    }

    /// Connect to `/ws/logs` and send the subscription frame.
    pub async fn open_log_stream(
        &self,
        subscribe: &LogStreamSubscribe,
    ) -> Result<LogStream, ClientError> {
        let url = self.log_stream_url()?;
        let mut request = url.as_str().into_client_request()?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_token))
            .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        let (mut socket, _) =
            tokio::time::timeout(self.timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| ClientError::Timeout(self.timeout))??;
        let frame = serde_json::to_string(subscribe)?;
        socket.send(Message::Text(frame)).await?;

        Ok(LogStream { socket })
    }
}

impl LogStream {
    /// Wait for the next batch frame.
    ///
    /// Control frames are skipped. A batch carrying only an `error` is
    /// reported as [`ClientError::Rejected`].
    pub async fn next_batch(&mut self) -> Result<LogStreamBatch, ClientError> {
        while let Some(message) = self.socket.next().await {
            match message? {
                Message::Text(text) => {
                    let batch: LogStreamBatch = serde_json::from_str(&text)?;
                    match batch.error {
                        Some(error) if batch.logs.is_empty() => {
                            return Err(ClientError::Rejected(error));
                        }
                        _ => return Ok(batch),
                    }
                }
                Message::Close(frame) => {
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    return Err(ClientError::StreamClosed(reason));
                }
                _ => continue,
            }
        }
        Err(ClientError::StreamClosed("connection ended".to_string()))
    }

    /// Send a close frame, ignoring failures.
    pub async fn close(mut self) {
        let _ = self.socket.close(None).await;
    }
}
