//! Chat line classification.
//!
//! Decides, without side effects, whether a chat line opens a ticket, adds
//! to the player's open ticket, or is ordinary chat.

use crate::config::{Trigger, TriggerMode};
use crate::entities::ChatEvent;
use crate::tickets::TicketRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No open ticket and the line carries the trigger.
    NewRequest { player: String, message: String },
    /// The player already has an open ticket; every line goes to it.
    TicketContinuation {
        player: String,
        message: String,
        /// Extracted request when the line also carries the trigger.
        repeated_request: Option<String>,
    },
    Ignored,
}

/// Classify `event` against the open tickets.
///
/// An open ticket wins over the trigger word: a player with a ticket who
/// types the trigger again is continuing, not opening a second ticket.
pub fn classify(event: &ChatEvent, registry: &TicketRegistry, trigger: &Trigger) -> Classification {
    let request = extract_request(&event.content, trigger);

    if registry.active(&event.player_name).is_some() {
        return Classification::TicketContinuation {
            player: event.player_name.clone(),
            message: event.content.trim().to_string(),
            repeated_request: request,
        };
    }

    match request {
        Some(message) => Classification::NewRequest {
            player: event.player_name.clone(),
            message,
        },
        None => Classification::Ignored,
    }
}

/// The request text after the trigger, or `None` if the line does not
/// carry the trigger.
///
/// A trailing parenthesized platform id is removed. When nothing is left
/// the trigger's default message is used.
pub fn extract_request(content: &str, trigger: &Trigger) -> Option<String> {
    let end = locate_trigger(content, trigger)?;
    let rest = strip_platform_id(content[end..].trim());
    if rest.is_empty() {
        Some(trigger.default_message.clone())
    } else {
        Some(rest.to_string())
    }
}

/// Byte offset just past the trigger, if present.
fn locate_trigger(content: &str, trigger: &Trigger) -> Option<usize> {
    let word = trigger.word.as_str();
    if word.is_empty() {
        return None;
    }
    match trigger.mode {
        TriggerMode::Prefix => {
            let start = content.len() - content.trim_start().len();
            match_at(content, start, word)
        }
        TriggerMode::Substring => content
            .char_indices()
            .find_map(|(start, _)| match_at(content, start, word)),
    }
}

/// Case-insensitive match of `needle` at byte offset `start`.
fn match_at(haystack: &str, start: usize, needle: &str) -> Option<usize> {
    let mut hay = haystack[start..].char_indices();
    let mut end = start;
    for n in needle.chars() {
        let (offset, h) = hay.next()?;
        if !(h == n || h.to_lowercase().eq(n.to_lowercase())) {
            return None;
        }
        end = start + offset + h.len_utf8();
    }
    Some(end)
}

/// Drop a trailing `(<digits>)` such as the Steam id some chat relays append.
fn strip_platform_id(s: &str) -> &str {
    let trimmed = s.trim_end();
    let Some(body) = trimmed.strip_suffix(')') else {
        return trimmed;
    };
    let Some(open) = body.rfind('(') else {
        return trimmed;
    };
    let id = &body[open + 1..];
    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        body[..open].trim_end()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DedupeKey, EventTime, ThreadRef};
    use time::OffsetDateTime;

    fn event(player: &str, content: &str) -> ChatEvent {
        ChatEvent::new(player, content, EventTime::Unknown, DedupeKey::LogId(1))
    }

    #[test]
    fn request_text_after_trigger_without_platform_id() {
        let trigger = Trigger::default();
        assert_eq!(
            extract_request("hey admin pls help (76561111111111)", &trigger).as_deref(),
            Some("pls help")
        );
    }

    #[test]
    fn bare_trigger_uses_default_message() {
        let trigger = Trigger::default();
        assert_eq!(
            extract_request("!admin", &trigger).as_deref(),
            Some("Player requested admin assistance")
        );
        assert_eq!(
            extract_request("!ADMIN (76561198000000000)", &trigger).as_deref(),
            Some("Player requested admin assistance")
        );
    }

    #[test]
    fn trigger_match_keeps_original_case_of_request() {
        let trigger = Trigger::default();
        assert_eq!(
            extract_request("!Admin TeamKiller near B4", &trigger).as_deref(),
            Some("TeamKiller near B4")
        );
    }

    #[test]
    fn substring_trigger_matches_inside_words() {
        // Known false positive of the unanchored default.
        let trigger = Trigger::default();
        assert_eq!(
            extract_request("who plays badminton", &trigger).as_deref(),
            Some("ton")
        );
    }

    #[test]
    fn prefix_trigger_requires_leading_command() {
        let trigger = Trigger {
            word: "!admin".to_string(),
            mode: TriggerMode::Prefix,
            ..Trigger::default()
        };
        assert_eq!(extract_request("  !admin spawn camper", &trigger).as_deref(), Some("spawn camper"));
        assert_eq!(extract_request("who plays badminton", &trigger), None);
        assert_eq!(extract_request("call !admin", &trigger), None);
    }

    #[test]
    fn non_numeric_parentheses_are_kept() {
        let trigger = Trigger::default();
        assert_eq!(
            extract_request("admin tk at (B4)", &trigger).as_deref(),
            Some("tk at (B4)")
        );
    }

    #[test]
    fn unrelated_chat_is_ignored() {
        let registry = TicketRegistry::default();
        assert_eq!(
            classify(&event("Bob", "gg"), &registry, &Trigger::default()),
            Classification::Ignored
        );
    }

    #[test]
    fn trigger_without_ticket_is_new_request() {
        let registry = TicketRegistry::default();
        assert_eq!(
            classify(&event("Bob", "!admin help"), &registry, &Trigger::default()),
            Classification::NewRequest {
                player: "Bob".to_string(),
                message: "help".to_string()
            }
        );
    }

    #[test]
    fn open_ticket_overrides_trigger_word() {
        let mut registry = TicketRegistry::default();
        registry
            .open("Bob", ThreadRef(42), OffsetDateTime::now_utc())
            .unwrap();

        let trigger = Trigger::default();
        assert_eq!(
            classify(&event("Bob", "!admin again"), &registry, &trigger),
            Classification::TicketContinuation {
                player: "Bob".to_string(),
                message: "!admin again".to_string(),
                repeated_request: Some("again".to_string()),
            }
        );
        assert_eq!(
            classify(&event("Bob", "thanks"), &registry, &trigger),
            Classification::TicketContinuation {
                player: "Bob".to_string(),
                message: "thanks".to_string(),
                repeated_request: None,
            }
        );
    }
}
