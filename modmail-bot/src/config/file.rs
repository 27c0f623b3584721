//! TOML file configuration structures.
//!
//! These structs directly map to the `modmail.toml` file format.

use modmail_core::config::{PlayerNotices, TicketPolicy, TransportKind, TriggerMode};
use serde::Deserialize;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub crcon: CrconConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub tickets: TicketsConfig,
}

/// CRCON connection section.
#[derive(Debug, Clone, Deserialize)]
pub struct CrconConfig {
    /// Base URL of the CRCON web API (e.g., "https://rcon.example.com").
    pub base_url: String,
    /// Bearer token. Falls back to `CRCON_API_TOKEN` when empty.
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub backoff: BackoffSection,
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_page_size() -> u32 {
    50
}

/// Reconnect backoff bounds in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffSection {
    #[serde(default = "default_backoff_initial_secs")]
    pub initial_secs: u64,
    #[serde(default = "default_backoff_max_secs")]
    pub max_secs: u64,
}

impl Default for BackoffSection {
    fn default() -> Self {
        Self {
            initial_secs: default_backoff_initial_secs(),
            max_secs: default_backoff_max_secs(),
        }
    }
}

fn default_backoff_initial_secs() -> u64 {
    2
}

fn default_backoff_max_secs() -> u64 {
    120
}

/// Discord section.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Falls back to `DISCORD_TOKEN` when empty.
    #[serde(default)]
    pub token: String,
    /// The forum channel that receives ticket threads.
    pub forum_channel_id: u64,
    /// Roles mentioned on new tickets and allowed to run admin commands.
    #[serde(default)]
    pub admin_role_ids: Vec<u64>,
}

/// Ticket behavior section. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TicketsConfig {
    pub trigger: String,
    pub trigger_mode: TriggerMode,
    pub default_message: String,
    /// Shown as the sender of in-game messages.
    pub sender_label: String,
    pub reply_template: String,
    pub notices: NoticesConfig,
}

impl Default for TicketsConfig {
    fn default() -> Self {
        let policy = TicketPolicy::default();
        Self {
            trigger: policy.trigger.word,
            trigger_mode: policy.trigger.mode,
            default_message: policy.trigger.default_message,
            sender_label: "Admin Desk".to_string(),
            reply_template: policy.reply_template,
            notices: NoticesConfig::default(),
        }
    }
}

/// Player-facing in-game notices.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NoticesConfig {
    pub received: String,
    pub already_open: String,
    pub claimed: String,
    pub closed: String,
}

impl Default for NoticesConfig {
    fn default() -> Self {
        let notices = PlayerNotices::default();
        Self {
            received: notices.received,
            already_open: notices.already_open,
            claimed: notices.claimed,
            closed: notices.closed,
        }
    }
}
