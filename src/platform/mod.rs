pub mod telegram;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

/// Media attached to a channel post, referenced by platform file id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    Photo(String),
    Animation(String),
}

/// A post received from an observed channel
#[derive(Debug, Clone)]
pub struct ChannelEvent {
    /// Numeric channel id
    pub channel_id: i64,
    /// Public handle without the leading `@`, if the channel has one
    pub channel_handle: Option<String>,
    /// Message id, unique within the channel
    pub message_id: i32,
    /// Message text, or the media caption when the post has no text
    pub text: Option<String>,
    pub media: Option<Media>,
    /// Channel display title
    pub title: Option<String>,
}

impl ChannelEvent {
    /// `@handle` when the channel is public, otherwise the numeric id.
    pub fn identity(&self) -> String {
        match &self.channel_handle {
            Some(handle) => format!("@{}", handle),
            None => self.channel_id.to_string(),
        }
    }

    pub fn seen_key(&self) -> SeenKey {
        SeenKey {
            channel_id: self.channel_id,
            message_id: self.message_id,
        }
    }
}

/// Identifies one processed source message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeenKey {
    pub channel_id: i64,
    pub message_id: i32,
}

impl fmt::Display for SeenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel_id, self.message_id)
    }
}

/// Outbound side of the messaging platform.
///
/// Bodies and captions are HTML-formatted.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send_text(&self, chat_id: i64, body: &str) -> Result<()>;

    async fn send_photo(&self, chat_id: i64, media: &str, caption: &str) -> Result<()>;

    async fn send_animation(&self, chat_id: i64, media: &str, caption: &str) -> Result<()>;
}
