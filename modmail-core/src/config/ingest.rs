use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which upstream log API the adapter reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Poll `get_historical_logs`, cursor is the numeric log id.
    #[default]
    Historical,
    /// Poll `get_recent_logs`, cursor is the millisecond timestamp.
    Recent,
    /// Follow the `/ws/logs` push stream, cursor is the stream entry id.
    Stream,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Historical => "historical",
            Self::Recent => "recent",
            Self::Stream => "stream",
        };
        f.write_str(name)
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "historical" => Ok(Self::Historical),
            "recent" => Ok(Self::Recent),
            "stream" => Ok(Self::Stream),
            other => Err(format!(
                "unknown transport `{other}`, expected historical, recent or stream"
            )),
        }
    }
}

/// Reconnect delay bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(120),
        }
    }
}

/// Event source adapter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub transport: TransportKind,
    /// Sleep between two polls. Ignored by the stream transport.
    pub poll_interval: Duration,
    /// Rows requested per poll.
    pub page_size: u32,
    /// Rows inspected at startup to place the cursor.
    pub seed_size: u32,
    pub dedupe_capacity: usize,
    pub backoff: BackoffConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            poll_interval: Duration::from_secs(5),
            page_size: 50,
            seed_size: 10,
            dedupe_capacity: 5_000,
            backoff: BackoffConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_names_parse_case_insensitively() {
        assert_eq!("Stream".parse::<TransportKind>(), Ok(TransportKind::Stream));
        assert_eq!(
            TransportKind::Recent.to_string().parse::<TransportKind>(),
            Ok(TransportKind::Recent)
        );
        assert!("rcon".parse::<TransportKind>().is_err());
    }
}
