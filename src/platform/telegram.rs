use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, ParseMode};

use crate::platform::{ChannelEvent, Media, Outbound};

/// Build a platform-agnostic event from a Telegram channel post
pub fn channel_event(msg: &Message) -> ChannelEvent {
    let text = msg.text().or_else(|| msg.caption()).map(str::to_string);

    // Telegram lists photo sizes smallest first
    let media = if let Some(sizes) = msg.photo() {
        sizes.last().map(|p| Media::Photo(p.file.id.0.clone()))
    } else {
        msg.animation().map(|a| Media::Animation(a.file.id.0.clone()))
    };

    ChannelEvent {
        channel_id: msg.chat.id.0,
        channel_handle: msg.chat.username().map(str::to_string),
        message_id: msg.id.0,
        text,
        media,
        title: msg.chat.title().map(str::to_string),
    }
}

/// Sends notifications through the Telegram Bot API
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Outbound for TelegramOutbound {
    async fn send_text(&self, chat_id: i64, body: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), body)
            .parse_mode(ParseMode::Html)
            .await
            .with_context(|| format!("Failed to send message to {}", chat_id))?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, media: &str, caption: &str) -> Result<()> {
        self.bot
            .send_photo(ChatId(chat_id), InputFile::file_id(FileId(media.to_string())))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await
            .with_context(|| format!("Failed to send photo to {}", chat_id))?;
        Ok(())
    }

    async fn send_animation(&self, chat_id: i64, media: &str, caption: &str) -> Result<()> {
        self.bot
            .send_animation(ChatId(chat_id), InputFile::file_id(FileId(media.to_string())))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await
            .with_context(|| format!("Failed to send animation to {}", chat_id))?;
        Ok(())
    }
}
