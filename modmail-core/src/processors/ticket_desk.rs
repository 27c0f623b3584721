//! TicketDesk processor.
//!
//! The TicketDesk is responsible for:
//! - Receiving `ChatEvent`s, classifying them and applying the ticket
//!   transitions
//! - Receiving `SinkEvent`s (claim, close, reply, thread deleted, sweep)
//! - Driving the `NotificationSink` and `OutboundMessenger` side effects
//! - Swapping in a new `TicketPolicy` when one is published
//!
//! The desk is the registry's only owner. Events are handled one at a
//! time, so a read and the write that follows it are never interleaved with
//! another event for the same player.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::classifier::{Classification, classify};
use crate::config::{PolicyWatch, TicketPolicy};
use crate::entities::{ChatEvent, EventTime, ThreadRef, TicketState};
use crate::events::types::acknowledge;
use crate::events::{
    ActionOutcome, Ack, ChatEventReceiver, ReplyOutcome, SinkEvent, SinkEventReceiver,
};
use crate::messenger::OutboundMessenger;
use crate::sink::{
    Controls, NotificationSink, PostKind, SinkError, StatusTag, ThreadDraft, ThreadPost,
};
use crate::tickets::TicketRegistry;

pub struct TicketDesk {
    registry: TicketRegistry,
    sink: Arc<dyn NotificationSink>,
    messenger: Arc<dyn OutboundMessenger>,
    policy: Arc<TicketPolicy>,
}

impl TicketDesk {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        messenger: Arc<dyn OutboundMessenger>,
        policy: Arc<TicketPolicy>,
    ) -> Self {
        Self {
            registry: TicketRegistry::default(),
            sink,
            messenger,
            policy,
        }
    }

    pub fn registry(&self) -> &TicketRegistry {
        &self.registry
    }

    /// Run the TicketDesk until shutdown is signaled.
    pub async fn run(
        mut self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut chat_rx: ChatEventReceiver,
        mut sink_rx: SinkEventReceiver,
        mut policy_rx: PolicyWatch,
    ) {
        info!("TicketDesk started");

        loop {
            tokio::select! {
                biased;

                // Shutdown has highest priority.
                res = shutdown_rx.changed() => {
                    if res.is_err() || *shutdown_rx.borrow() {
                        info!("TicketDesk received shutdown signal");
                        break;
                    }
                }

                Ok(()) = policy_rx.changed() => {
                    self.policy = policy_rx.borrow_and_update().clone();
                    info!(trigger = %self.policy.trigger.word, "Ticket policy reloaded");
                }

                Some(event) = chat_rx.recv() => {
                    self.handle_chat(event).await;
                }

                Some(event) = sink_rx.recv() => {
                    self.handle_sink_event(event).await;
                }
            }
        }

        info!(open_tickets = self.registry.len(), "TicketDesk shutdown complete");
    }

    /// Classify one chat line and apply it.
    pub async fn handle_chat(&mut self, event: ChatEvent) {
        match classify(&event, &self.registry, &self.policy.trigger) {
            Classification::Ignored => {}
            Classification::NewRequest { player, message } => {
                self.open_ticket(&player, &message, event.occurred_at).await;
            }
            Classification::TicketContinuation {
                player,
                message,
                repeated_request,
            } => {
                self.continue_ticket(&player, message, repeated_request, event.occurred_at)
                    .await;
            }
        }
    }

    pub async fn handle_sink_event(&mut self, event: SinkEvent) {
        match event {
            SinkEvent::Claim { thread, actor, ack } => self.claim(thread, &actor, ack).await,
            SinkEvent::Close { thread, actor, ack } => self.close(thread, &actor, ack).await,
            SinkEvent::Reply {
                thread,
                actor,
                text,
                ack,
            } => self.relay_reply(thread, &actor, &text, ack).await,
            SinkEvent::ThreadDeleted { thread } => {
                if let Some(ticket) = self.registry.mark_thread_missing(thread) {
                    info!(
                        player = %ticket.player_name,
                        %thread,
                        "Ticket thread deleted, will recreate on next message"
                    );
                }
            }
            SinkEvent::Sweep { ack } => {
                let removed = self.sweep().await;
                acknowledge(ack, removed);
            }
        }
    }

    async fn open_ticket(&mut self, player: &str, message: &str, occurred_at: EventTime) {
        if self.registry.active(player).is_some() {
            warn!(player = %player, "Refusing to open a second ticket");
            return;
        }

        let now = OffsetDateTime::now_utc();
        let draft = ThreadDraft::new(player, message, occurred_at, now);
        let thread = match self.sink.create_ticket_thread(&draft).await {
            Ok(thread) => thread,
            Err(e) => {
                error!(player = %player, error = %e, "Failed to create ticket thread, request dropped");
                return;
            }
        };

        if let Err(e) = self.registry.open(player, thread, now) {
            error!(player = %player, %thread, error = %e, "Failed to register ticket");
            return;
        }
        info!(player = %player, %thread, "Opened ticket");

        let notice = self.policy.notices.received.clone();
        self.messenger.send_message(player, &notice).await;
    }

    async fn continue_ticket(
        &mut self,
        player: &str,
        message: String,
        repeated_request: Option<String>,
        occurred_at: EventTime,
    ) {
        let Some(ticket) = self.registry.active(player) else {
            return;
        };
        let thread = ticket.thread;
        let thread_missing = ticket.thread_missing;
        let repeated = repeated_request.is_some();
        let text = repeated_request.unwrap_or(message);

        if thread_missing {
            self.recreate(player, &text, occurred_at).await;
            return;
        }

        let post = ThreadPost {
            kind: if repeated {
                PostKind::RepeatedRequest
            } else {
                PostKind::PlayerMessage
            },
            player_name: player.to_string(),
            text,
            occurred_at,
        };
        match self.sink.post_to_thread(thread, &post).await {
            Ok(()) => {}
            Err(SinkError::ThreadMissing(_)) => {
                warn!(player = %player, %thread, "Ticket thread is gone, recreating");
                self.recreate(player, &post.text, post.occurred_at).await;
                return;
            }
            Err(e) => {
                warn!(player = %player, %thread, error = %e, "Failed to forward player message");
                return;
            }
        }

        self.registry
            .record_activity(player, OffsetDateTime::now_utc());

        if repeated {
            let notice = self.policy.notices.already_open.clone();
            self.messenger.send_message(player, &notice).await;
        } else {
            self.resurface(player, thread).await;
        }
    }

    /// Flag the ticket for attention again after the player wrote.
    async fn resurface(&self, player: &str, thread: ThreadRef) {
        let controls = match self.registry.active(player) {
            Some(t) if t.state == TicketState::Claimed => Controls::Claimed {
                player: player.to_string(),
                by: t.claimed_by.clone().unwrap_or_default(),
            },
            _ => Controls::Awaiting {
                player: player.to_string(),
            },
        };
        if let Err(e) = self.sink.set_status_tag(thread, StatusTag::New).await {
            warn!(player = %player, %thread, error = %e, "Failed to tag ticket");
        }
        if let Err(e) = self.sink.show_controls(thread, &controls).await {
            warn!(player = %player, %thread, error = %e, "Failed to re-post ticket controls");
        }
    }

    async fn recreate(&mut self, player: &str, message: &str, occurred_at: EventTime) {
        if let Some(stale) = self.registry.evict(player) {
            info!(player = %player, thread = %stale.thread, "Dropped ticket with missing thread");
        }
        self.open_ticket(player, message, occurred_at).await;
    }

    async fn claim(&mut self, thread: ThreadRef, actor: &str, ack: Ack<ActionOutcome>) {
        let player = match self
            .registry
            .claim(thread, actor, OffsetDateTime::now_utc())
        {
            Ok(ticket) => ticket.player_name.clone(),
            Err(e) => {
                debug!(%thread, error = %e, "Ignoring claim");
                acknowledge(ack, ActionOutcome::UnknownThread);
                return;
            }
        };
        info!(player = %player, %thread, actor = %actor, "Ticket claimed");

        let mut failures = Vec::new();
        if let Err(e) = self.sink.set_status_tag(thread, StatusTag::Replied).await {
            failures.push(e.to_string());
        }
        let controls = Controls::Claimed {
            player: player.clone(),
            by: actor.to_string(),
        };
        if let Err(e) = self.sink.show_controls(thread, &controls).await {
            failures.push(e.to_string());
        }
        let notice = self.policy.notices.claimed.clone();
        if !self.messenger.send_message(&player, &notice).await {
            failures.push("player could not be notified".to_string());
        }
        acknowledge(ack, outcome(failures));
    }

    async fn close(&mut self, thread: ThreadRef, actor: &str, ack: Ack<ActionOutcome>) {
        let ticket = match self.registry.close(thread) {
            Ok(ticket) => ticket,
            Err(e) => {
                debug!(%thread, error = %e, "Ignoring close");
                acknowledge(ack, ActionOutcome::UnknownThread);
                return;
            }
        };
        let player = ticket.player_name;
        info!(player = %player, %thread, actor = %actor, "Ticket closed");

        let mut failures = Vec::new();
        if let Err(e) = self.sink.set_status_tag(thread, StatusTag::Closed).await {
            failures.push(e.to_string());
        }
        let controls = Controls::Closed {
            player: player.clone(),
            by: actor.to_string(),
        };
        if let Err(e) = self.sink.show_controls(thread, &controls).await {
            failures.push(e.to_string());
        }
        let notice = self.policy.notices.closed.clone();
        if !self.messenger.send_message(&player, &notice).await {
            failures.push("player could not be notified".to_string());
        }
        if let Err(e) = self.sink.archive_and_lock(thread).await {
            failures.push(e.to_string());
        }
        acknowledge(ack, outcome(failures));
    }

    async fn relay_reply(
        &mut self,
        thread: ThreadRef,
        actor: &str,
        text: &str,
        ack: Ack<ReplyOutcome>,
    ) {
        let Some(ticket) = self.registry.by_thread(thread) else {
            acknowledge(ack, ReplyOutcome::UnknownThread);
            return;
        };
        let player = ticket.player_name.clone();

        let message = self.policy.format_reply(actor, text);
        if !self.messenger.send_message(&player, &message).await {
            acknowledge(ack, ReplyOutcome::NotDelivered);
            return;
        }
        debug!(player = %player, %thread, actor = %actor, "Relayed admin reply");

        self.registry
            .record_activity(&player, OffsetDateTime::now_utc());
        if let Err(e) = self.sink.set_status_tag(thread, StatusTag::Replied).await {
            warn!(player = %player, %thread, error = %e, "Failed to tag ticket");
        }
        acknowledge(ack, ReplyOutcome::Delivered);
    }

    /// Drop tickets whose thread no longer exists. Returns how many.
    async fn sweep(&mut self) -> usize {
        let mut removed = 0;
        for (player, thread) in self.registry.threads() {
            match self.sink.thread_exists(thread).await {
                Ok(true) => {}
                Ok(false) => {
                    self.registry.evict(&player);
                    removed += 1;
                    info!(player = %player, %thread, "Swept ticket with missing thread");
                }
                Err(e) => {
                    warn!(player = %player, %thread, error = %e, "Could not check ticket thread");
                }
            }
        }
        info!(removed, open_tickets = self.registry.len(), "Ticket sweep finished");
        removed
    }
}

fn outcome(failures: Vec<String>) -> ActionOutcome {
    if failures.is_empty() {
        ActionOutcome::Applied
    } else {
        ActionOutcome::Partial(failures.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TriggerMode, policy_channel};
    use crate::entities::DedupeKey;
    use crate::events::{chat_event_channel, sink_event_channel};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create { player: String, message: String },
        Post { thread: ThreadRef, kind: PostKind, text: String },
        Tag { thread: ThreadRef, tag: StatusTag },
        Controls { thread: ThreadRef, controls: Controls },
        Archive { thread: ThreadRef },
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<Call>>,
        next_thread: AtomicU64,
        refuse_create: AtomicBool,
        deleted: Mutex<HashSet<ThreadRef>>,
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn creates(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Create { .. }))
                .count()
        }

        fn check(&self, thread: ThreadRef) -> Result<(), SinkError> {
            if self.deleted.lock().unwrap().contains(&thread) {
                Err(SinkError::ThreadMissing(thread))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn create_ticket_thread(&self, draft: &ThreadDraft) -> Result<ThreadRef, SinkError> {
            if self.refuse_create.load(Ordering::SeqCst) {
                return Err(SinkError::Rejected("forum unavailable".to_string()));
            }
            self.calls.lock().unwrap().push(Call::Create {
                player: draft.player_name.clone(),
                message: draft.message.clone(),
            });
            Ok(ThreadRef(self.next_thread.fetch_add(1, Ordering::SeqCst) + 1))
        }

        async fn post_to_thread(&self, thread: ThreadRef, post: &ThreadPost) -> Result<(), SinkError> {
            self.check(thread)?;
            self.calls.lock().unwrap().push(Call::Post {
                thread,
                kind: post.kind,
                text: post.text.clone(),
            });
            Ok(())
        }

        async fn set_status_tag(&self, thread: ThreadRef, tag: StatusTag) -> Result<(), SinkError> {
            self.check(thread)?;
            self.calls.lock().unwrap().push(Call::Tag { thread, tag });
            Ok(())
        }

        async fn show_controls(&self, thread: ThreadRef, controls: &Controls) -> Result<(), SinkError> {
            self.check(thread)?;
            self.calls.lock().unwrap().push(Call::Controls {
                thread,
                controls: controls.clone(),
            });
            Ok(())
        }

        async fn archive_and_lock(&self, thread: ThreadRef) -> Result<(), SinkError> {
            self.check(thread)?;
            self.calls.lock().unwrap().push(Call::Archive { thread });
            Ok(())
        }

        async fn thread_exists(&self, thread: ThreadRef) -> Result<bool, SinkError> {
            Ok(self.check(thread).is_ok())
        }
    }

    struct RecordingMessenger {
        sent: Mutex<Vec<(String, String)>>,
        online: AtomicBool,
    }

    impl Default for RecordingMessenger {
        fn default() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                online: AtomicBool::new(true),
            }
        }
    }

    impl RecordingMessenger {
        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OutboundMessenger for RecordingMessenger {
        async fn send_message(&self, player_name: &str, text: &str) -> bool {
            if !self.online.load(Ordering::SeqCst) {
                return false;
            }
            self.sent
                .lock()
                .unwrap()
                .push((player_name.to_string(), text.to_string()));
            true
        }
    }

    fn desk() -> (TicketDesk, Arc<RecordingSink>, Arc<RecordingMessenger>) {
        let sink = Arc::new(RecordingSink::default());
        let messenger = Arc::new(RecordingMessenger::default());
        let desk = TicketDesk::new(
            sink.clone(),
            messenger.clone(),
            Arc::new(TicketPolicy::default()),
        );
        (desk, sink, messenger)
    }

    fn chat(player: &str, content: &str) -> ChatEvent {
        ChatEvent::new(player, content, EventTime::Unknown, DedupeKey::LogId(0))
    }

    #[tokio::test]
    async fn opens_ticket_and_confirms_receipt() {
        let (mut desk, sink, messenger) = desk();
        desk.handle_chat(chat("Bob", "!admin tk at B4 (76561198000000000)")).await;

        assert_eq!(
            sink.calls(),
            vec![Call::Create {
                player: "Bob".to_string(),
                message: "tk at B4".to_string()
            }]
        );
        let ticket = desk.registry().active("Bob").unwrap();
        assert_eq!(ticket.state, TicketState::New);
        assert_eq!(ticket.thread, ThreadRef(1));
        assert_eq!(
            messenger.sent(),
            vec![("Bob".to_string(), TicketPolicy::default().notices.received)]
        );
    }

    #[tokio::test]
    async fn second_request_is_folded_into_open_ticket() {
        let (mut desk, sink, messenger) = desk();
        desk.handle_chat(chat("Bob", "!admin help")).await;
        desk.handle_chat(chat("Bob", "!admin still need help")).await;

        assert_eq!(sink.creates(), 1);
        assert!(sink.calls().contains(&Call::Post {
            thread: ThreadRef(1),
            kind: PostKind::RepeatedRequest,
            text: "still need help".to_string(),
        }));
        let notices: Vec<_> = messenger.sent().into_iter().map(|(_, text)| text).collect();
        assert_eq!(
            notices,
            vec![
                TicketPolicy::default().notices.received,
                TicketPolicy::default().notices.already_open
            ]
        );
        assert_eq!(desk.registry().len(), 1);
    }

    #[tokio::test]
    async fn ignored_chat_has_no_side_effects() {
        let (mut desk, sink, messenger) = desk();
        desk.handle_chat(chat("Bob", "gg wp")).await;
        assert!(sink.calls().is_empty());
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn continuation_resurfaces_claimed_ticket() {
        let (mut desk, sink, _messenger) = desk();
        desk.handle_chat(chat("Bob", "!admin help")).await;
        desk.handle_sink_event(SinkEvent::Claim {
            thread: ThreadRef(1),
            actor: "Mod Sam".to_string(),
            ack: None,
        })
        .await;
        desk.handle_chat(chat("Bob", "he is at the HQ")).await;

        let calls = sink.calls();
        let tail = &calls[calls.len() - 3..];
        assert_eq!(
            tail,
            &[
                Call::Post {
                    thread: ThreadRef(1),
                    kind: PostKind::PlayerMessage,
                    text: "he is at the HQ".to_string()
                },
                Call::Tag {
                    thread: ThreadRef(1),
                    tag: StatusTag::New
                },
                Call::Controls {
                    thread: ThreadRef(1),
                    controls: Controls::Claimed {
                        player: "Bob".to_string(),
                        by: "Mod Sam".to_string()
                    }
                },
            ]
        );
        assert_eq!(desk.registry().active("Bob").unwrap().state, TicketState::Claimed);
    }

    #[tokio::test]
    async fn failed_thread_creation_leaves_no_ticket() {
        let (mut desk, sink, messenger) = desk();
        sink.refuse_create.store(true, Ordering::SeqCst);
        desk.handle_chat(chat("Bob", "!admin help")).await;
        assert!(desk.registry().is_empty());
        assert!(messenger.sent().is_empty());

        // The player retries once the forum is back
        sink.refuse_create.store(false, Ordering::SeqCst);
        desk.handle_chat(chat("Bob", "!admin help")).await;
        assert!(desk.registry().active("Bob").is_some());
    }

    #[tokio::test]
    async fn deleted_thread_is_recreated_on_next_message() {
        let (mut desk, sink, _messenger) = desk();
        desk.handle_chat(chat("Bob", "!admin help")).await;
        sink.deleted.lock().unwrap().insert(ThreadRef(1));
        desk.handle_sink_event(SinkEvent::ThreadDeleted {
            thread: ThreadRef(1),
        })
        .await;

        desk.handle_chat(chat("Bob", "anyone there?")).await;

        assert_eq!(
            sink.calls().last(),
            Some(&Call::Create {
                player: "Bob".to_string(),
                message: "anyone there?".to_string()
            })
        );
        let ticket = desk.registry().active("Bob").unwrap();
        assert_eq!(ticket.thread, ThreadRef(2));
        assert!(!ticket.thread_missing);
        assert!(desk.registry().by_thread(ThreadRef(1)).is_none());
    }

    #[tokio::test]
    async fn failed_post_to_missing_thread_recreates_ticket() {
        let (mut desk, sink, _messenger) = desk();
        desk.handle_chat(chat("Bob", "!admin help")).await;
        sink.deleted.lock().unwrap().insert(ThreadRef(1));

        desk.handle_chat(chat("Bob", "hello?")).await;

        assert_eq!(sink.creates(), 2);
        assert_eq!(desk.registry().active("Bob").unwrap().thread, ThreadRef(2));
    }

    #[tokio::test]
    async fn close_archives_and_frees_player() {
        let (mut desk, sink, messenger) = desk();
        desk.handle_chat(chat("Bob", "!admin help")).await;

        let (tx, rx) = oneshot::channel();
        desk.handle_sink_event(SinkEvent::Close {
            thread: ThreadRef(1),
            actor: "Mod Sam".to_string(),
            ack: Some(tx),
        })
        .await;
        assert_eq!(rx.await.unwrap(), ActionOutcome::Applied);

        let calls = sink.calls();
        assert!(calls.contains(&Call::Tag {
            thread: ThreadRef(1),
            tag: StatusTag::Closed
        }));
        assert_eq!(calls.last(), Some(&Call::Archive { thread: ThreadRef(1) }));
        assert_eq!(
            messenger.sent().last().map(|(_, text)| text.clone()),
            Some(TicketPolicy::default().notices.closed)
        );
        assert!(desk.registry().is_empty());

        // A new trigger after close opens a fresh ticket
        desk.handle_chat(chat("Bob", "!admin again")).await;
        assert_eq!(sink.creates(), 2);
    }

    #[tokio::test]
    async fn actions_on_unknown_threads_are_reported() {
        let (mut desk, _sink, _messenger) = desk();
        let (tx, rx) = oneshot::channel();
        desk.handle_sink_event(SinkEvent::Claim {
            thread: ThreadRef(77),
            actor: "Mod".to_string(),
            ack: Some(tx),
        })
        .await;
        assert_eq!(rx.await.unwrap(), ActionOutcome::UnknownThread);

        let (tx, rx) = oneshot::channel();
        desk.handle_sink_event(SinkEvent::Reply {
            thread: ThreadRef(77),
            actor: "Mod".to_string(),
            text: "hi".to_string(),
            ack: Some(tx),
        })
        .await;
        assert_eq!(rx.await.unwrap(), ReplyOutcome::UnknownThread);
    }

    #[tokio::test]
    async fn reply_is_relayed_and_tagged() {
        let (mut desk, sink, messenger) = desk();
        desk.handle_chat(chat("Bob", "!admin help")).await;

        let (tx, rx) = oneshot::channel();
        desk.handle_sink_event(SinkEvent::Reply {
            thread: ThreadRef(1),
            actor: "Sam".to_string(),
            text: "on my way".to_string(),
            ack: Some(tx),
        })
        .await;
        assert_eq!(rx.await.unwrap(), ReplyOutcome::Delivered);
        assert_eq!(
            messenger.sent().last(),
            Some(&("Bob".to_string(), "[ADMIN Sam]: on my way".to_string()))
        );
        assert_eq!(
            sink.calls().last(),
            Some(&Call::Tag {
                thread: ThreadRef(1),
                tag: StatusTag::Replied
            })
        );
    }

    #[tokio::test]
    async fn undeliverable_reply_is_not_tagged() {
        let (mut desk, sink, messenger) = desk();
        desk.handle_chat(chat("Bob", "!admin help")).await;
        messenger.online.store(false, Ordering::SeqCst);
        let before = sink.calls().len();

        let (tx, rx) = oneshot::channel();
        desk.handle_sink_event(SinkEvent::Reply {
            thread: ThreadRef(1),
            actor: "Sam".to_string(),
            text: "on my way".to_string(),
            ack: Some(tx),
        })
        .await;
        assert_eq!(rx.await.unwrap(), ReplyOutcome::NotDelivered);
        assert_eq!(sink.calls().len(), before);
    }

    #[tokio::test]
    async fn offline_player_does_not_block_ticket() {
        let (mut desk, _sink, messenger) = desk();
        messenger.online.store(false, Ordering::SeqCst);
        desk.handle_chat(chat("Bob", "!admin help")).await;
        assert!(desk.registry().active("Bob").is_some());

        let (tx, rx) = oneshot::channel();
        desk.handle_sink_event(SinkEvent::Claim {
            thread: ThreadRef(1),
            actor: "Sam".to_string(),
            ack: Some(tx),
        })
        .await;
        assert!(matches!(rx.await.unwrap(), ActionOutcome::Partial(_)));
        assert_eq!(desk.registry().active("Bob").unwrap().state, TicketState::Claimed);
    }

    #[tokio::test]
    async fn sweep_drops_tickets_without_threads() {
        let (mut desk, sink, _messenger) = desk();
        desk.handle_chat(chat("Bob", "!admin help")).await;
        desk.handle_chat(chat("Ann", "!admin help")).await;
        sink.deleted.lock().unwrap().insert(ThreadRef(2));

        let (tx, rx) = oneshot::channel();
        desk.handle_sink_event(SinkEvent::Sweep { ack: Some(tx) }).await;
        assert_eq!(rx.await.unwrap(), 1);
        assert!(desk.registry().active("Ann").is_none());
        assert!(desk.registry().active("Bob").is_some());
    }

    #[tokio::test]
    async fn run_loop_applies_reloaded_policy() {
        let sink = Arc::new(RecordingSink::default());
        let messenger = Arc::new(RecordingMessenger::default());
        let (publisher, policy_rx) = policy_channel(TicketPolicy::default());
        let desk = TicketDesk::new(sink.clone(), messenger.clone(), policy_rx.borrow().clone());

        let (chat_tx, chat_rx) = chat_event_channel();
        let (sink_tx, sink_rx) = sink_event_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(desk.run(shutdown_rx, chat_rx, sink_rx, policy_rx));

        let mut policy = TicketPolicy::default();
        policy.trigger.word = "!help".to_string();
        policy.trigger.mode = TriggerMode::Prefix;
        publisher.send(Arc::new(policy)).unwrap();

        chat_tx.send(chat("Bob", "admin please")).await.unwrap();
        chat_tx.send(chat("Ann", "!help stuck in wall")).await.unwrap();

        let (tx, rx) = oneshot::channel();
        sink_tx.send(SinkEvent::Sweep { ack: Some(tx) }).await.unwrap();
        assert_eq!(
            tokio::time::timeout(Duration::from_secs(2), rx).await.unwrap().unwrap(),
            0
        );

        assert_eq!(
            sink.calls(),
            vec![Call::Create {
                player: "Ann".to_string(),
                message: "stuck in wall".to_string()
            }]
        );

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn run_loop_outlives_its_senders_until_shutdown() {
        let (desk, _, _) = desk();
        let (publisher, policy_rx) = policy_channel(TicketPolicy::default());
        let (chat_tx, chat_rx) = chat_event_channel();
        let (sink_tx, sink_rx) = sink_event_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        drop((publisher, chat_tx, sink_tx));

        let handle = tokio::spawn(desk.run(shutdown_rx, chat_rx, sink_rx, policy_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
