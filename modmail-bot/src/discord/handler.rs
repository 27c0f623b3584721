//! Gateway event handler.
//!
//! Turns admin activity in the ticket forum into `SinkEvent`s for the desk
//! and reports the outcome back on Discord.

use modmail_core::entities::ThreadRef;
use modmail_core::events::{SinkEvent, SinkEventSender};
use serenity::all::{
    ChannelId, ComponentInteraction, Context, CreateInteractionResponse,
    CreateInteractionResponseFollowup, EventHandler, GuildChannel, Interaction, Message,
    PartialGuildChannel, Ready, RoleId,
};
use serenity::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::render::{self, ControlAction};

const CLEANUP_COMMAND: &str = "!cleanup_tickets";

/// Discord bot event handler
pub struct TicketHandler {
    sink_tx: SinkEventSender,
    forum: ChannelId,
    admin_roles: Vec<RoleId>,
}

impl TicketHandler {
    pub fn new(sink_tx: SinkEventSender, forum: ChannelId, admin_roles: Vec<RoleId>) -> Self {
        Self {
            sink_tx,
            forum,
            admin_roles,
        }
    }

    /// Hand an event to the desk and wait for its answer.
    async fn request<T>(&self, event: SinkEvent, rx: oneshot::Receiver<T>) -> Option<T> {
        if self.sink_tx.send(event).await.is_err() {
            warn!("Ticket desk is not running, dropping Discord event");
            return None;
        }
        match rx.await {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                warn!("Ticket desk stopped before answering");
                None
            }
        }
    }

    async fn relay_reply(&self, ctx: &Context, message: &Message, text: &str) {
        let actor = message
            .member
            .as_ref()
            .and_then(|member| member.nick.clone())
            .unwrap_or_else(|| message.author.display_name().to_string());

        let (ack, rx) = oneshot::channel();
        let event = SinkEvent::Reply {
            thread: ThreadRef(message.channel_id.get()),
            actor,
            text: text.to_string(),
            ack: Some(ack),
        };
        let Some(outcome) = self.request(event, rx).await else {
            return;
        };
        let Some(reaction) = render::reply_reaction(outcome) else {
            return;
        };
        if let Err(e) = message.react(&ctx.http, reaction).await {
            warn!(channel = %message.channel_id, error = %e, "Failed to react to admin reply");
        }
    }

    async fn cleanup_tickets(&self, ctx: &Context, message: &Message) {
        let roles = message
            .member
            .as_ref()
            .map(|member| member.roles.as_slice())
            .unwrap_or_default();
        let reply = if !is_authorized(roles, &self.admin_roles) {
            info!(user = %message.author.name, "Refused ticket cleanup");
            "Only ticket admins can run this command.".to_string()
        } else {
            let (ack, rx) = oneshot::channel();
            let Some(removed) = self.request(SinkEvent::Sweep { ack: Some(ack) }, rx).await else {
                return;
            };
            format!("🧹 Cleaned up {removed} deleted ticket(s)")
        };
        if let Err(e) = message.reply(&ctx.http, reply).await {
            warn!(error = %e, "Failed to answer cleanup command");
        }
    }

    async fn control_pressed(&self, ctx: &Context, component: &ComponentInteraction) {
        let Some(action) = ControlAction::parse(&component.data.custom_id) else {
            return;
        };
        if let Err(e) = component
            .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
            .await
        {
            warn!(error = %e, "Failed to acknowledge ticket control");
            return;
        }

        let actor = component
            .member
            .as_ref()
            .map(|member| member.display_name().to_string())
            .unwrap_or_else(|| component.user.display_name().to_string());
        let thread = ThreadRef(component.channel_id.get());
        let (ack, rx) = oneshot::channel();
        let event = match action {
            ControlAction::Claim => SinkEvent::Claim {
                thread,
                actor,
                ack: Some(ack),
            },
            ControlAction::Close => SinkEvent::Close {
                thread,
                actor,
                ack: Some(ack),
            },
        };

        let Some(outcome) = self.request(event, rx).await else {
            return;
        };
        let Some(notice) = render::action_notice(outcome) else {
            return;
        };
        let followup = CreateInteractionResponseFollowup::new()
            .content(notice)
            .ephemeral(true);
        if let Err(e) = component.create_followup(&ctx.http, followup).await {
            warn!(error = %e, "Failed to send control follow-up");
        }
    }
}

#[async_trait]
impl EventHandler for TicketHandler {
    /// Called when the bot is ready and connected to Discord
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected to Discord!", ready.user.name);
    }

    async fn message(&self, ctx: Context, message: Message) {
        // Only guild messages from people
        if message.author.bot || message.guild_id.is_none() {
            return;
        }

        let content = message.content.trim();
        if content == CLEANUP_COMMAND {
            self.cleanup_tickets(&ctx, &message).await;
        } else if is_relayable(content) {
            self.relay_reply(&ctx, &message, content).await;
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            self.control_pressed(&ctx, &component).await;
        }
    }

    async fn thread_delete(
        &self,
        _ctx: Context,
        thread: PartialGuildChannel,
        _full_thread_data: Option<GuildChannel>,
    ) {
        if thread.parent_id != self.forum {
            return;
        }
        debug!(thread = %thread.id, "Ticket forum thread deleted");
        let event = SinkEvent::ThreadDeleted {
            thread: ThreadRef(thread.id.get()),
        };
        if self.sink_tx.send(event).await.is_err() {
            warn!("Ticket desk is not running, dropping thread deletion");
        }
    }
}

/// Whether a thread message is an admin reply. Other bot commands are left
/// alone.
fn is_relayable(content: &str) -> bool {
    !content.is_empty() && !content.starts_with('!')
}

fn is_authorized(roles: &[RoleId], admin_roles: &[RoleId]) -> bool {
    roles.iter().any(|role| admin_roles.contains(role))
}
