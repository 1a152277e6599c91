use std::collections::HashSet;

use tracing::warn;

use crate::platform::ChannelEvent;

/// Accepts posts only from allow-listed channels.
///
/// Entries are either `@handle` (case-sensitive) or a numeric chat id.
#[derive(Debug, Clone)]
pub struct ChannelFilter {
    allowed: HashSet<String>,
}

impl ChannelFilter {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed = HashSet::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            if !entry.starts_with('@') && entry.parse::<i64>().is_err() {
                warn!(
                    "Channel '{}' is neither an @handle nor a numeric id and will never match",
                    entry
                );
            }
            allowed.insert(entry.to_string());
        }
        Self { allowed }
    }

    pub fn accept(&self, event: &ChannelEvent) -> bool {
        if let Some(handle) = &event.channel_handle {
            if self.allowed.contains(&format!("@{}", handle)) {
                return true;
            }
        }
        self.allowed.contains(&event.channel_id.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
