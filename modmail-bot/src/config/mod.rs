//! Configuration module for modmail-bot.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;

use crate::config::file::FileConfig;
use modmail_core::config::{
    BackoffConfig, IngestConfig, PlayerNotices, TicketPolicy, TransportKind, Trigger,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("environment variable `{0}` referenced by the config is not set")]
    MissingEnvVar(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// CRCON connection settings.
#[derive(Debug, Clone)]
pub struct CrconSettings {
    pub base_url: Url,
    pub api_token: String,
}

/// Discord connection settings.
#[derive(Debug, Clone)]
pub struct DiscordSettings {
    pub token: String,
    pub forum_channel_id: u64,
    pub admin_role_ids: Vec<u64>,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub crcon: CrconSettings,
    pub discord: DiscordSettings,
    pub ingest: IngestConfig,
    pub policy: TicketPolicy,
    pub sender_label: String,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    transport_override: Option<TransportKind>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, transport_override: Option<TransportKind>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            transport_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file and substitute `${VAR}` placeholders
    /// 2. Apply CLI overrides and secret fallbacks from the environment
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let content = std::fs::read_to_string(&self.config_path)?;
        parse_config(&content, self.transport_override, |name| {
            std::env::var(name).ok()
        })
    }

    /// Reload the ticket policy (used during SIGHUP).
    pub fn reload_policy(&self) -> Result<TicketPolicy, ConfigError> {
        self.load().map(|loaded| loaded.policy)
    }
}

/// Parse a config document, resolving environment lookups through `env`.
pub fn parse_config(
    content: &str,
    transport_override: Option<TransportKind>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<LoadedConfig, ConfigError> {
    let content = substitute_env(content, &env)?;
    let mut file_config: FileConfig = toml::from_str(&content)?;

    if let Some(transport) = transport_override {
        file_config.crcon.transport = transport;
    }
    if file_config.crcon.api_token.is_empty() {
        file_config.crcon.api_token = env("CRCON_API_TOKEN").unwrap_or_default();
    }
    if file_config.discord.token.is_empty() {
        file_config.discord.token = env("DISCORD_TOKEN").unwrap_or_default();
    }

    let base_url = validate(&file_config)?;
    Ok(build_loaded_config(file_config, base_url))
}

/// Replace every `${NAME}` with the value of `NAME`.
fn substitute_env(
    content: &str,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(ConfigError::ValidationError(
                "unterminated `${` placeholder".to_string(),
            ));
        };
        let name = &after[..end];
        if name.is_empty() {
            return Err(ConfigError::ValidationError(
                "empty `${}` placeholder".to_string(),
            ));
        }
        let value = env(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn validate(config: &FileConfig) -> Result<Url, ConfigError> {
    let invalid = |msg: String| -> Result<Url, ConfigError> { Err(ConfigError::ValidationError(msg)) };

    let base_url = Url::parse(&config.crcon.base_url).map_err(|e| {
        ConfigError::ValidationError(format!("crcon.base_url `{}`: {e}", config.crcon.base_url))
    })?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return invalid(format!("crcon.base_url must be http or https, got {}", base_url.scheme()));
    }
    if config.crcon.api_token.is_empty() {
        return invalid("crcon.api_token is empty and CRCON_API_TOKEN is not set".to_string());
    }
    if config.crcon.poll_interval_secs == 0 {
        return invalid("crcon.poll_interval_secs must be positive".to_string());
    }
    if config.crcon.page_size == 0 {
        return invalid("crcon.page_size must be positive".to_string());
    }
    let backoff = &config.crcon.backoff;
    if backoff.initial_secs == 0 || backoff.max_secs < backoff.initial_secs {
        return invalid(format!(
            "crcon.backoff must satisfy 0 < initial_secs <= max_secs, got {} and {}",
            backoff.initial_secs, backoff.max_secs
        ));
    }
    if config.discord.token.is_empty() {
        return invalid("discord.token is empty and DISCORD_TOKEN is not set".to_string());
    }
    if config.discord.forum_channel_id == 0 {
        return invalid("discord.forum_channel_id must be set".to_string());
    }
    if config.discord.admin_role_ids.contains(&0) {
        return invalid("discord.admin_role_ids contains 0".to_string());
    }
    if config.tickets.trigger.trim().is_empty() {
        return invalid("tickets.trigger must not be empty".to_string());
    }
    if !config.tickets.reply_template.contains("{message}") {
        return invalid("tickets.reply_template must contain {message}".to_string());
    }
    Ok(base_url)
}

fn build_loaded_config(file_config: FileConfig, base_url: Url) -> LoadedConfig {
    let FileConfig {
        crcon,
        discord,
        tickets,
    } = file_config;

    LoadedConfig {
        crcon: CrconSettings {
            base_url,
            api_token: crcon.api_token,
        },
        discord: DiscordSettings {
            token: discord.token,
            forum_channel_id: discord.forum_channel_id,
            admin_role_ids: discord.admin_role_ids,
        },
        ingest: IngestConfig {
            transport: crcon.transport,
            poll_interval: Duration::from_secs(crcon.poll_interval_secs),
            page_size: crcon.page_size,
            backoff: BackoffConfig {
                initial: Duration::from_secs(crcon.backoff.initial_secs),
                max: Duration::from_secs(crcon.backoff.max_secs),
            },
            ..IngestConfig::default()
        },
        policy: TicketPolicy {
            trigger: Trigger {
                word: tickets.trigger.trim().to_string(),
                mode: tickets.trigger_mode,
                default_message: tickets.default_message,
            },
            notices: PlayerNotices {
                received: tickets.notices.received,
                already_open: tickets.notices.already_open,
                claimed: tickets.notices.claimed,
                closed: tickets.notices.closed,
            },
            reply_template: tickets.reply_template,
        },
        sender_label: tickets.sender_label,
    }
}
