//! Message builders for ticket threads.

use modmail_core::events::{ActionOutcome, ReplyOutcome};
use modmail_core::sink::{Controls, PostKind, ThreadDraft, ThreadPost};
use serenity::all::{
    ButtonStyle, CreateActionRow, CreateButton, CreateEmbed, CreateMessage, RoleId,
};

const RED: u32 = 0xe74c3c;
const BLUE: u32 = 0x3498db;
const ORANGE: u32 = 0xe67e22;
const GREEN: u32 = 0x2ecc71;

/// A control button on a ticket thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Claim,
    Close,
}

impl ControlAction {
    pub fn custom_id(self) -> &'static str {
        match self {
            Self::Claim => "ticket:claim",
            Self::Close => "ticket:close",
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        match custom_id {
            "ticket:claim" => Some(Self::Claim),
            "ticket:close" => Some(Self::Close),
            _ => None,
        }
    }

    fn button(self) -> CreateButton {
        let (label, style) = match self {
            Self::Claim => ("Claim", ButtonStyle::Primary),
            Self::Close => ("Close ticket", ButtonStyle::Danger),
        };
        CreateButton::new(self.custom_id()).label(label).style(style)
    }
}

pub fn role_mentions(roles: &[RoleId]) -> String {
    roles
        .iter()
        .map(|role| format!("<@&{role}>"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Starter message of a new ticket thread. Carries the first controls.
pub fn opening_message(draft: &ThreadDraft, admin_roles: &[RoleId]) -> CreateMessage {
    let mentions = role_mentions(admin_roles);
    let content = if mentions.is_empty() {
        "🚨 **New admin request** 🚨".to_string()
    } else {
        format!("🚨 **New admin request** 🚨\n{mentions}")
    };
    let embed = CreateEmbed::new()
        .title("🚨 Admin request")
        .colour(RED)
        .field("Player", &draft.player_name, true)
        .field("Time", draft.occurred_at.to_string(), true)
        .field("Message", &draft.message, false);

    let controls = Controls::Awaiting {
        player: draft.player_name.clone(),
    };
    CreateMessage::new()
        .content(content)
        .embed(embed)
        .components(action_rows(&controls))
}

pub fn post_message(post: &ThreadPost) -> CreateMessage {
    let title = match post.kind {
        PostKind::PlayerMessage => "💬 Player message",
        PostKind::RepeatedRequest => "🔁 Repeated admin request",
    };
    let embed = CreateEmbed::new()
        .title(title)
        .description(&post.text)
        .colour(BLUE);
    CreateMessage::new().embed(embed)
}

pub fn controls_message(controls: &Controls) -> CreateMessage {
    let (description, colour) = controls_text(controls);
    let embed = CreateEmbed::new()
        .title("🎛️ Moderator controls")
        .description(description)
        .colour(colour);
    CreateMessage::new()
        .embed(embed)
        .components(action_rows(controls))
}

fn controls_text(controls: &Controls) -> (String, u32) {
    match controls {
        Controls::Awaiting { player } => (format!("Ticket from **{player}** is waiting"), ORANGE),
        Controls::Claimed { player, by } => {
            (format!("Ticket from **{player}** is handled by **{by}**"), ORANGE)
        }
        Controls::Closed { player, by } => {
            (format!("Ticket from **{player}** was closed by **{by}**"), GREEN)
        }
    }
}

fn control_actions(controls: &Controls) -> Vec<ControlAction> {
    match controls {
        Controls::Awaiting { .. } => vec![ControlAction::Claim, ControlAction::Close],
        Controls::Claimed { .. } => vec![ControlAction::Close],
        Controls::Closed { .. } => vec![],
    }
}

fn action_rows(controls: &Controls) -> Vec<CreateActionRow> {
    let buttons: Vec<_> = control_actions(controls)
        .into_iter()
        .map(ControlAction::button)
        .collect();
    if buttons.is_empty() {
        vec![]
    } else {
        vec![CreateActionRow::Buttons(buttons)]
    }
}

/// Ephemeral follow-up for the admin who pressed a control, if any.
pub fn action_notice(outcome: ActionOutcome) -> Option<String> {
    match outcome {
        ActionOutcome::Applied => None,
        ActionOutcome::UnknownThread => Some("This ticket is no longer active.".to_string()),
        ActionOutcome::Partial(detail) => Some(format!("Done, but some steps failed: {detail}")),
    }
}

/// Reaction put on an admin's reply.
pub fn reply_reaction(outcome: ReplyOutcome) -> Option<char> {
    match outcome {
        ReplyOutcome::Delivered => Some('✅'),
        ReplyOutcome::NotDelivered => Some('❌'),
        ReplyOutcome::UnknownThread => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_ids_round_trip() {
        for action in [ControlAction::Claim, ControlAction::Close] {
            assert_eq!(ControlAction::parse(action.custom_id()), Some(action));
        }
        assert_eq!(ControlAction::parse("fleet:rsvp"), None);
    }

    #[test]
    fn test_controls_follow_ticket_state() {
        let player = "Bob".to_string();
        assert_eq!(
            control_actions(&Controls::Awaiting {
                player: player.clone()
            }),
            vec![ControlAction::Claim, ControlAction::Close]
        );
        assert_eq!(
            control_actions(&Controls::Claimed {
                player: player.clone(),
                by: "Sam".to_string()
            }),
            vec![ControlAction::Close]
        );
        let closed = Controls::Closed {
            player,
            by: "Sam".to_string(),
        };
        assert!(control_actions(&closed).is_empty());
        assert!(action_rows(&closed).is_empty());
        assert_eq!(
            controls_text(&closed).0,
            "Ticket from **Bob** was closed by **Sam**"
        );
    }

    #[test]
    fn test_role_mentions() {
        assert_eq!(role_mentions(&[]), "");
        assert_eq!(
            role_mentions(&[RoleId::new(11), RoleId::new(22)]),
            "<@&11> <@&22>"
        );
    }

    #[test]
    fn test_outcome_feedback() {
        assert_eq!(reply_reaction(ReplyOutcome::Delivered), Some('✅'));
        assert_eq!(reply_reaction(ReplyOutcome::NotDelivered), Some('❌'));
        assert_eq!(reply_reaction(ReplyOutcome::UnknownThread), None);
        assert_eq!(action_notice(ActionOutcome::Applied), None);
        assert!(
            action_notice(ActionOutcome::Partial("tag failed".to_string()))
                .unwrap()
                .contains("tag failed")
        );
    }
}
