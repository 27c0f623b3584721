use serde::{Deserialize, Serialize};

/// How the trigger word is matched against a chat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Anywhere in the line, case-insensitive. `"badminton"` matches `admin`.
    #[default]
    Substring,
    /// The trimmed line must start with the trigger, case-insensitive.
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub word: String,
    pub mode: TriggerMode,
    /// Used when nothing but the trigger (and a platform id) was typed.
    pub default_message: String,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            word: "admin".to_string(),
            mode: TriggerMode::Substring,
            default_message: "Player requested admin assistance".to_string(),
        }
    }
}

/// In-game messages sent to the player as the ticket moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerNotices {
    pub received: String,
    pub already_open: String,
    pub claimed: String,
    pub closed: String,
}

impl Default for PlayerNotices {
    fn default() -> Self {
        Self {
            received: "Your admin request has been received! Keep typing in chat to add \
                       details, no need to repeat the command."
                .to_string(),
            already_open: "You already have an open admin ticket. Your message was added to it."
                .to_string(),
            claimed: "A moderator is now handling your request.".to_string(),
            closed: "Your admin ticket has been closed by a moderator. Thank you!".to_string(),
        }
    }
}

/// Everything the ticket desk needs to decide and phrase its actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketPolicy {
    pub trigger: Trigger,
    pub notices: PlayerNotices,
    /// Admin reply relayed to the player. `{actor}` and `{message}` are
    /// substituted.
    pub reply_template: String,
}

impl Default for TicketPolicy {
    fn default() -> Self {
        Self {
            trigger: Trigger::default(),
            notices: PlayerNotices::default(),
            reply_template: "[ADMIN {actor}]: {message}".to_string(),
        }
    }
}

impl TicketPolicy {
    /// Fill `{actor}` and `{message}` in one pass. Placeholders inside the
    /// substituted values are left as written.
    pub fn format_reply(&self, actor: &str, message: &str) -> String {
        let mut out = String::with_capacity(self.reply_template.len() + message.len());
        let mut rest = self.reply_template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            if let Some(after) = tail.strip_prefix("{actor}") {
                out.push_str(actor);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{message}") {
                out.push_str(message);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_template_substitution() {
        let policy = TicketPolicy::default();
        assert_eq!(policy.format_reply("Mod Sam", "on my way"), "[ADMIN Mod Sam]: on my way");
    }

    #[test]
    fn placeholders_in_values_are_not_expanded() {
        let policy = TicketPolicy::default();
        assert_eq!(
            policy.format_reply("{message}", "use {actor} {x}"),
            "[ADMIN {message}]: use {actor} {x}"
        );

        let policy = TicketPolicy {
            reply_template: "{actor}{ {message}}".to_string(),
            ..TicketPolicy::default()
        };
        assert_eq!(policy.format_reply("Sam", "hi"), "Sam{ hi}");
    }
}
