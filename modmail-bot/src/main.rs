//! CRCON admin ticket bridge
//!
//! Watches Hell Let Loose chat through CRCON and turns admin requests into
//! Discord forum tickets.

mod config;
mod discord;
mod shutdown;

use clap::Parser;
use config::ConfigLoader;
use discord::{DiscordSink, TicketHandler};
use modmail_core::config::{TransportKind, policy_channel};
use modmail_core::events::{chat_event_channel, sink_event_channel};
use modmail_core::ingest::EventSource;
use modmail_core::messenger::CrconMessenger;
use modmail_core::processors::{IngestRunner, TicketDesk};
use modmail_sdk::client::CrconClient;
use serenity::all::{ChannelId, Client, GatewayIntents, RoleId};
use shutdown::{shutdown_signal, spawn_policy_reload_handler};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// CRCON admin ticket bridge - in-game admin requests as Discord forum tickets
#[derive(Parser, Debug)]
#[command(name = "modmail-bot")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./modmail.toml")]
    config: PathBuf,

    /// Override the log transport (historical, recent or stream)
    #[arg(short, long)]
    transport: Option<TransportKind>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting modmail-bot v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.transport));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!(
        transport = %loaded_config.ingest.transport,
        "Configuration loaded from {:?}",
        args.config
    );

    let forum = ChannelId::new(loaded_config.discord.forum_channel_id);
    let admin_roles: Vec<RoleId> = loaded_config
        .discord
        .admin_role_ids
        .iter()
        .copied()
        .map(RoleId::new)
        .collect();

    // Channels between the Discord side, the ingest runner and the desk
    let (chat_tx, chat_rx) = chat_event_channel();
    let (sink_tx, sink_rx) = sink_event_channel();
    let (policy_publisher, policy_rx) = policy_channel(loaded_config.policy.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Build the Discord client
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let handler = TicketHandler::new(sink_tx, forum, admin_roles.clone());
    let mut client = Client::builder(&loaded_config.discord.token, intents)
        .event_handler(handler)
        .await?;

    let sink = DiscordSink::connect(client.http.clone(), forum, admin_roles)
        .await
        .map_err(|e| {
            tracing::error!("Failed to open the ticket forum: {}", e);
            e
        })?;

    // CRCON side
    let crcon = CrconClient::new(
        loaded_config.crcon.base_url.clone(),
        loaded_config.crcon.api_token.clone(),
    );
    let messenger = CrconMessenger::new(crcon.clone(), loaded_config.sender_label.clone());
    let source = EventSource::new(Arc::new(crcon), &loaded_config.ingest);

    let desk = TicketDesk::new(
        Arc::new(sink),
        Arc::new(messenger),
        policy_rx.borrow().clone(),
    );
    let desk_task = tokio::spawn(desk.run(shutdown_rx.clone(), chat_rx, sink_rx, policy_rx));

    let runner = IngestRunner::new(source, chat_tx, &loaded_config.ingest);
    let ingest_task = tokio::spawn(runner.run(shutdown_rx));

    // Spawn policy reload handler (listens for SIGHUP)
    let reload_notify = spawn_policy_reload_handler(config_loader, policy_publisher);

    let shard_manager = client.shard_manager.clone();
    let mut bot_task = tokio::spawn(async move {
        tracing::info!("Starting Discord bot...");
        client.start().await
    });

    let bot_result = tokio::select! {
        _ = shutdown_signal() => None,
        res = &mut bot_task => {
            tracing::error!("Discord client stopped unexpectedly");
            Some(res)
        }
    };

    // Stop everything
    let _ = shutdown_tx.send(true);
    reload_notify.notify_one();
    shard_manager.shutdown_all().await;

    let bot_result = match bot_result {
        Some(res) => res,
        None => bot_task.await,
    };
    if let Err(e) = ingest_task.await {
        tracing::error!("Ingest runner task failed: {}", e);
    }
    if let Err(e) = desk_task.await {
        tracing::error!("Ticket desk task failed: {}", e);
    }
    tracing::info!("Shutdown complete");

    bot_result?.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,serenity=warn,tungstenite=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
