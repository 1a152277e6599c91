use teloxide::utils::html;

use crate::platform::{ChannelEvent, Media};

const LINK_DOMAIN: &str = "t.me";

/// A notification ready to be relayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub price: Option<String>,
    pub link: Option<String>,
    pub media: Option<Media>,
}

impl Notification {
    /// HTML body, also used as the media caption
    pub fn body(&self) -> String {
        let mut lines = vec![format!("New gift on: {}", html::escape(&self.title))];
        if let Some(price) = &self.price {
            lines.push(format!("Price: {} ⭐", price));
        }
        if let Some(link) = &self.link {
            lines.push(format!("Link: {}", link));
        }
        lines.join("\n")
    }
}

pub fn format(event: &ChannelEvent, price: Option<String>) -> Notification {
    let title = event.title.clone().unwrap_or_else(|| event.identity());

    // Private channels have no resolvable message links
    let link = event
        .channel_handle
        .as_ref()
        .map(|handle| format!("https://{}/{}/{}", LINK_DOMAIN, handle, event.message_id));

    Notification {
        title,
        price,
        link,
        media: event.media.clone(),
    }
}
