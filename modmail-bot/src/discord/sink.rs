//! Forum-backed notification sink.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use modmail_core::entities::ThreadRef;
use modmail_core::sink::{
    Controls, NotificationSink, SinkError, StatusTag, ThreadDraft, ThreadPost,
};
use serenity::all::{
    Channel, ChannelId, ChannelType, CreateForumPost, EditMessage, EditThread, MessageId, RoleId,
};
use serenity::http::Http;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::render;
use super::tags::StatusTags;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Discord(#[from] serenity::Error),

    #[error("channel {0} is not a forum channel")]
    NotAForum(ChannelId),
}

/// HTTP status of a failed Discord request.
fn status_of(err: &serenity::Error) -> Option<u16> {
    match err {
        serenity::Error::Http(e) => e.status_code().map(|status| status.as_u16()),
        _ => None,
    }
}

fn sink_error(thread: ThreadRef, err: serenity::Error) -> SinkError {
    match status_of(&err) {
        Some(404) => SinkError::ThreadMissing(thread),
        _ => SinkError::Rejected(err.to_string()),
    }
}

fn channel_of(thread: ThreadRef) -> ChannelId {
    ChannelId::new(thread.0)
}

/// Ticket threads in a Discord forum channel.
pub struct DiscordSink {
    http: Arc<Http>,
    forum: ChannelId,
    admin_roles: Vec<RoleId>,
    tags: StatusTags,
    /// Last controls message per thread, stripped of its buttons when a new
    /// one is posted.
    controls: Mutex<HashMap<ChannelId, MessageId>>,
}

impl DiscordSink {
    /// Look up the forum channel and resolve its status tags.
    pub async fn connect(
        http: Arc<Http>,
        forum: ChannelId,
        admin_roles: Vec<RoleId>,
    ) -> Result<Self, SetupError> {
        let Channel::Guild(channel) = forum.to_channel(&http).await? else {
            return Err(SetupError::NotAForum(forum));
        };
        if channel.kind != ChannelType::Forum {
            return Err(SetupError::NotAForum(forum));
        }

        let tags = StatusTags::resolve(
            channel
                .available_tags
                .iter()
                .map(|tag| (tag.id, tag.name.as_str())),
        );
        info!(forum = %channel.name, "Ticket forum ready");

        Ok(Self {
            http,
            forum,
            admin_roles,
            tags,
            controls: Mutex::new(HashMap::new()),
        })
    }

    async fn strip_previous_controls(&self, channel: ChannelId, previous: MessageId) {
        let edit = EditMessage::new().components(vec![]);
        if let Err(e) = channel.edit_message(&self.http, previous, edit).await {
            debug!(%channel, error = %e, "Failed to strip old controls");
        }
    }
}

#[async_trait]
impl NotificationSink for DiscordSink {
    async fn create_ticket_thread(&self, draft: &ThreadDraft) -> Result<ThreadRef, SinkError> {
        let message = render::opening_message(draft, &self.admin_roles);
        let mut post = CreateForumPost::new(&draft.title, message);
        if let Some(tag) = self.tags.get(StatusTag::New) {
            post = post.add_applied_tag(tag);
        }

        let thread = self
            .forum
            .create_forum_post(&self.http, post)
            .await
            .map_err(|e| SinkError::Rejected(e.to_string()))?;

        // The starter message of a forum post shares the thread's id.
        self.controls
            .lock()
            .await
            .insert(thread.id, MessageId::new(thread.id.get()));

        debug!(thread = %thread.id, title = %draft.title, "Created ticket thread");
        Ok(ThreadRef(thread.id.get()))
    }

    async fn post_to_thread(&self, thread: ThreadRef, post: &ThreadPost) -> Result<(), SinkError> {
        channel_of(thread)
            .send_message(&self.http, render::post_message(post))
            .await
            .map_err(|e| sink_error(thread, e))?;
        Ok(())
    }

    async fn set_status_tag(&self, thread: ThreadRef, tag: StatusTag) -> Result<(), SinkError> {
        if self.tags.get(tag).is_none() {
            return Ok(());
        }
        let channel = channel_of(thread);
        let current = match channel
            .to_channel(&self.http)
            .await
            .map_err(|e| sink_error(thread, e))?
        {
            Channel::Guild(guild_channel) => guild_channel.applied_tags,
            _ => return Err(SinkError::ThreadMissing(thread)),
        };

        let edit = EditThread::new().applied_tags(self.tags.apply(&current, tag));
        channel
            .edit_thread(&self.http, edit)
            .await
            .map_err(|e| sink_error(thread, e))?;
        Ok(())
    }

    async fn show_controls(&self, thread: ThreadRef, controls: &Controls) -> Result<(), SinkError> {
        let channel = channel_of(thread);
        let message = channel
            .send_message(&self.http, render::controls_message(controls))
            .await
            .map_err(|e| sink_error(thread, e))?;

        let previous = self.controls.lock().await.insert(channel, message.id);
        if let Some(previous) = previous {
            self.strip_previous_controls(channel, previous).await;
        }
        Ok(())
    }

    async fn archive_and_lock(&self, thread: ThreadRef) -> Result<(), SinkError> {
        let channel = channel_of(thread);
        channel
            .edit_thread(&self.http, EditThread::new().archived(true).locked(true))
            .await
            .map_err(|e| sink_error(thread, e))?;
        self.controls.lock().await.remove(&channel);
        Ok(())
    }

    async fn thread_exists(&self, thread: ThreadRef) -> Result<bool, SinkError> {
        match channel_of(thread).to_channel(&self.http).await {
            Ok(_) => Ok(true),
            Err(e) => match status_of(&e) {
                Some(403 | 404) => Ok(false),
                _ => Err(SinkError::Rejected(e.to_string())),
            },
        }
    }
}
