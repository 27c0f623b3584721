use std::fmt;

/// Server supplied time of a chat line.
///
/// Kept opaque: CRCON reports it as a string, an epoch integer or a float
/// depending on the endpoint. It is only ever displayed.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventTime {
    Integer(i64),
    Float(f64),
    Text(String),
    #[default]
    Unknown,
}

impl From<serde_json::Value> for EventTime {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map(Self::Float).unwrap_or_default(),
            },
            serde_json::Value::String(s) if !s.is_empty() => Self::Text(s),
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Transport supplied identity of a log line, unique within one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupeKey {
    LogId(i64),
    Text(String),
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogId(id) => write!(f, "{id}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One normalized in-game chat line.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    pub player_name: String,
    pub content: String,
    pub occurred_at: EventTime,
    pub dedupe_key: DedupeKey,
}

impl ChatEvent {
    pub fn new(
        player_name: impl Into<String>,
        content: impl Into<String>,
        occurred_at: EventTime,
        dedupe_key: DedupeKey,
    ) -> Self {
        Self {
            player_name: player_name.into(),
            content: content.into(),
            occurred_at,
            dedupe_key,
        }
    }
}
