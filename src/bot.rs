use std::sync::Arc;

use anyhow::{bail, Context, Result};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::memory::SeenStore;
use crate::platform::telegram::{channel_event, TelegramOutbound};
use crate::relay::filter::ChannelFilter;
use crate::relay::matcher::Matcher;
use crate::relay::AnnouncementPipeline;

/// Operator commands
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Check that the bot is running")]
    Start,
    #[command(description = "Show monitored channels and keywords")]
    Status,
    #[command(description = "Show help")]
    Help,
}

/// Shared application state
pub struct AppState {
    config: Config,
    keywords: Vec<String>,
    pipeline: AnnouncementPipeline,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let keywords = config.keywords();
        let matcher = Matcher::new(&keywords).context("Failed to build keyword matcher")?;
        let filter = ChannelFilter::new(&config.relay.channels);
        if filter.is_empty() {
            bail!("No channels configured");
        }
        let seen = SeenStore::open(&config.relay.state_path).await;
        let pipeline = AnnouncementPipeline::new(filter, matcher, seen, config.destination());

        Ok(Self {
            config,
            keywords,
            pipeline,
        })
    }

    async fn status_text(&self) -> String {
        let destination = match self.config.destination() {
            Some(id) => id.to_string(),
            None => "not set".to_string(),
        };
        format!(
            "Channels: {}\nKeywords: {}\nDestination: {}\nRemembered posts: {}",
            self.config.relay.channels.join(", "),
            self.keywords.join(", "),
            destination,
            self.pipeline.seen().len().await
        )
    }
}

/// Start the Telegram bot
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let bot = Bot::new(&state.config.telegram.bot_token);

    info!("Starting Telegram bot...");

    // Skip the backlog accumulated while the bot was offline
    bot.delete_webhook()
        .drop_pending_updates(true)
        .await
        .context("Failed to drop pending updates")?;

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let handler = dptree::entry()
        .branch(Update::filter_channel_post().endpoint(handle_channel_post))
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("bot"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_channel_post(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let event = channel_event(&msg);
    let outbound = TelegramOutbound::new(bot);

    // The post is already marked seen; a failed send is logged, not retried
    if let Err(e) = state.pipeline.handle(&event, &outbound).await {
        error!(
            "Failed to relay post {} from {}: {:#}",
            event.message_id,
            event.identity(),
            e
        );
    }

    Ok(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let caller_id = msg
        .from
        .as_ref()
        .map(|user| user.id.0.to_string())
        .unwrap_or_else(|| msg.chat.id.0.to_string());

    let mut reply = match cmd {
        Command::Start => "Bot is active.\nMonitoring the configured channels.".to_string(),
        Command::Status => state.status_text().await,
        Command::Help => Command::descriptions().to_string(),
    };

    if state.config.destination().is_none() && !matches!(cmd, Command::Help) {
        reply.push_str(&format!("\n\nYour chat ID is: {}", caller_id));
    }

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
