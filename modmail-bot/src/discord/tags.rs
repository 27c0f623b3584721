//! Forum status tags.

use std::collections::HashMap;

use modmail_core::sink::StatusTag;
use serenity::all::ForumTagId;

/// Discord allows at most this many applied tags per forum thread.
const MAX_APPLIED_TAGS: usize = 5;

/// The forum's status tag ids, resolved by name at startup.
#[derive(Debug, Clone, Default)]
pub struct StatusTags {
    ids: HashMap<StatusTag, ForumTagId>,
}

impl StatusTags {
    /// Match the forum's tags against the status names, ignoring case.
    /// Missing tags are logged and skipped.
    pub fn resolve<'a>(available: impl IntoIterator<Item = (ForumTagId, &'a str)>) -> Self {
        let available: Vec<_> = available.into_iter().collect();
        let mut ids = HashMap::new();
        for tag in StatusTag::ALL {
            match available
                .iter()
                .find(|(_, name)| name.trim().eq_ignore_ascii_case(tag.name()))
            {
                Some((id, _)) => {
                    ids.insert(tag, *id);
                }
                None => {
                    tracing::warn!(
                        tag = tag.name(),
                        "Forum has no status tag with this name, tickets will not carry it"
                    );
                }
            }
        }
        Self { ids }
    }

    pub fn get(&self, tag: StatusTag) -> Option<ForumTagId> {
        self.ids.get(&tag).copied()
    }

    fn is_status(&self, id: ForumTagId) -> bool {
        self.ids.values().any(|status| *status == id)
    }

    /// The applied tag list with `tag` as the only status tag. Other tags
    /// are kept.
    pub fn apply(&self, current: &[ForumTagId], tag: StatusTag) -> Vec<ForumTagId> {
        let mut applied: Vec<ForumTagId> = self.get(tag).into_iter().collect();
        applied.extend(current.iter().copied().filter(|id| !self.is_status(*id)));
        applied.truncate(MAX_APPLIED_TAGS);
        applied
    }
}
