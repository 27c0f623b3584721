//! Event source adapter.
//!
//! Turns one of three CRCON log transports into a de-duplicated sequence
//! of [`ChatEvent`]s whose cursor only moves forward:
//!
//! - [`HistoricalPolling`]: `get_historical_logs`, numeric id cursor
//! - [`RecentPolling`]: `get_recent_logs`, millisecond timestamp cursor
//! - [`StreamFollowing`]: `/ws/logs` push stream, stream id cursor
//!
//! History that predates the first connect is never replayed.

mod dedupe;
mod historical;
mod recent;
mod stream;

pub use dedupe::DedupeWindow;
pub use historical::HistoricalPolling;
pub use recent::RecentPolling;
pub use stream::StreamFollowing;

use std::sync::Arc;

use async_trait::async_trait;
use modmail_sdk::client::{ClientError, CrconClient, LogStream};
use modmail_sdk::objects::{
    HistoricalLogEntry, LogPage, LogStreamSubscribe, RecentLogEntry, RecentLogsQuery,
    ServerStatus, StreamId,
};
use thiserror::Error;
use tracing::info;

use crate::config::{IngestConfig, TransportKind};
use crate::entities::ChatEvent;

/// Errors that can occur while reading the upstream log.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Unreachable, rejected or dropped connection. Reconnect with backoff.
    #[error("connection error: {0}")]
    Connection(ClientError),

    /// The payload could not be decoded. Drop it and keep going.
    #[error("malformed payload: {0}")]
    Malformed(ClientError),

    /// A session from another transport was handed back.
    #[error("session does not belong to the {0} transport")]
    SessionMismatch(TransportKind),
}

impl From<ClientError> for IngestError {
    fn from(err: ClientError) -> Self {
        if err.is_malformed() {
            Self::Malformed(err)
        } else {
            Self::Connection(err)
        }
    }
}

/// The CRCON calls the adapter depends on.
#[async_trait]
pub trait LogApi: Send + Sync {
    async fn handshake(&self) -> Result<ServerStatus, ClientError>;

    async fn historical_logs(&self, limit: u32)
    -> Result<LogPage<HistoricalLogEntry>, ClientError>;

    async fn recent_logs(
        &self,
        query: &RecentLogsQuery,
    ) -> Result<LogPage<RecentLogEntry>, ClientError>;

    async fn open_log_stream(
        &self,
        subscribe: &LogStreamSubscribe,
    ) -> Result<LogStream, ClientError>;
}

#[async_trait]
impl LogApi for CrconClient {
    async fn handshake(&self) -> Result<ServerStatus, ClientError> {
        self.get_status().await
    }

    async fn historical_logs(
        &self,
        limit: u32,
    ) -> Result<LogPage<HistoricalLogEntry>, ClientError> {
        self.get_historical_logs(limit).await
    }

    async fn recent_logs(
        &self,
        query: &RecentLogsQuery,
    ) -> Result<LogPage<RecentLogEntry>, ClientError> {
        self.get_recent_logs(query).await
    }

    async fn open_log_stream(
        &self,
        subscribe: &LogStreamSubscribe,
    ) -> Result<LogStream, ClientError> {
        CrconClient::open_log_stream(self, subscribe).await
    }
}

/// Adapter position in the upstream log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
pub enum Cursor {
    LogId(i64),
    TimestampMs(i64),
    Stream(StreamId),
}

/// A live connection handed out by [`EventSource::connect`].
#[derive(Debug)]
pub enum Session {
    /// Polling transports are stateless between requests.
    Polling,
    Stream(LogStream),
}

#[derive(Debug)]
enum Transport {
    Historical(HistoricalPolling),
    Recent(RecentPolling),
    Stream(StreamFollowing),
}

/// One adapter, one transport strategy picked from configuration.
pub struct EventSource {
    api: Arc<dyn LogApi>,
    transport: Transport,
    dedupe: DedupeWindow,
    seeded: bool,
}

impl EventSource {
    pub fn new(api: Arc<dyn LogApi>, config: &IngestConfig) -> Self {
        let transport = match config.transport {
            TransportKind::Historical => {
                Transport::Historical(HistoricalPolling::new(config.page_size, config.seed_size))
            }
            TransportKind::Recent => {
                Transport::Recent(RecentPolling::new(config.page_size, config.seed_size))
            }
            TransportKind::Stream => Transport::Stream(StreamFollowing::new(config.seed_size)),
        };
        Self {
            api,
            transport,
            dedupe: DedupeWindow::new(config.dedupe_capacity),
            seeded: false,
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self.transport {
            Transport::Historical(_) => TransportKind::Historical,
            Transport::Recent(_) => TransportKind::Recent,
            Transport::Stream(_) => TransportKind::Stream,
        }
    }

    /// Whether batches are pushed (no sleep between receives).
    pub fn is_push(&self) -> bool {
        matches!(self.transport, Transport::Stream(_))
    }

    pub fn cursor(&self) -> Option<Cursor> {
        match &self.transport {
            Transport::Historical(t) => t.cursor(),
            Transport::Recent(t) => t.cursor(),
            Transport::Stream(t) => t.cursor(),
        }
    }

    /// Handshake with the server, seed the cursor on first use, and hand out
    /// a session for [`poll_or_receive`](Self::poll_or_receive).
    pub async fn connect(&mut self) -> Result<Session, IngestError> {
        let api = self.api.clone();

        if !self.is_push() {
            let status = api.handshake().await.map_err(IngestError::Connection)?;
            info!(server = %status.name, transport = %self.kind(), "Connected to CRCON");
        }

        if !self.seeded {
            match &mut self.transport {
                Transport::Historical(t) => t.seed(api.as_ref(), &mut self.dedupe).await?,
                Transport::Recent(t) => t.seed(api.as_ref(), &mut self.dedupe).await?,
                Transport::Stream(t) => t.seed(api.as_ref()).await,
            }
            self.seeded = true;
        }

        match &self.transport {
            Transport::Stream(t) => Ok(Session::Stream(t.open(api.as_ref()).await?)),
            _ => Ok(Session::Polling),
        }
    }

    /// Issue one poll, or wait for one pushed batch.
    pub async fn poll_or_receive(
        &mut self,
        session: &mut Session,
    ) -> Result<Vec<ChatEvent>, IngestError> {
        let api = self.api.clone();
        let kind = self.kind();
        match (&mut self.transport, session) {
            (Transport::Historical(t), Session::Polling) => {
                t.poll(api.as_ref(), &mut self.dedupe).await
            }
            (Transport::Recent(t), Session::Polling) => t.poll(api.as_ref(), &mut self.dedupe).await,
            (Transport::Stream(t), Session::Stream(stream)) => {
                t.receive(stream, &mut self.dedupe).await
            }
            _ => Err(IngestError::SessionMismatch(kind)),
        }
    }
}
