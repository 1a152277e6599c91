pub mod filter;
pub mod format;
pub mod matcher;

use anyhow::Result;
use tracing::{debug, info};

use crate::memory::SeenStore;
use crate::platform::{ChannelEvent, Media, Outbound};
use crate::relay::filter::ChannelFilter;
use crate::relay::format::Notification;
use crate::relay::matcher::Matcher;

/// Why a post was not relayed. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ChannelNotAllowed,
    NoKeyword,
    Duplicate,
    NoDestination,
}

/// A notification addressed to the destination chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub chat_id: i64,
    pub notification: Notification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    Dispatch(Delivery),
}

/// Filter → match → dedup → format → dispatch, one post at a time.
///
/// Posts are marked seen before sending, so a failed send is not retried
/// and is not relayed again after a restart.
pub struct AnnouncementPipeline {
    filter: ChannelFilter,
    matcher: Matcher,
    seen: SeenStore,
    destination: Option<i64>,
}

impl AnnouncementPipeline {
    /// `destination` of `None` means relaying is not configured yet.
    pub fn new(
        filter: ChannelFilter,
        matcher: Matcher,
        seen: SeenStore,
        destination: Option<i64>,
    ) -> Self {
        Self {
            filter,
            matcher,
            seen,
            destination,
        }
    }

    pub fn seen(&self) -> &SeenStore {
        &self.seen
    }

    /// Decide what to do with a post. Marks the post as seen when it
    /// passes the channel and keyword checks.
    pub async fn evaluate(&self, event: &ChannelEvent) -> Decision {
        if !self.filter.accept(event) {
            return Decision::Skip(SkipReason::ChannelNotAllowed);
        }

        let text = match event.text.as_deref() {
            Some(t) if self.matcher.matches(t) => t,
            _ => return Decision::Skip(SkipReason::NoKeyword),
        };

        if !self.seen.check_and_mark(event.seen_key()).await {
            return Decision::Skip(SkipReason::Duplicate);
        }

        let Some(chat_id) = self.destination else {
            return Decision::Skip(SkipReason::NoDestination);
        };

        let price = self.matcher.extract_price(text);
        Decision::Dispatch(Delivery {
            chat_id,
            notification: format::format(event, price),
        })
    }

    /// Evaluate a post and send the resulting notification, if any.
    ///
    /// A send error is returned to the caller; the post stays marked.
    pub async fn handle(&self, event: &ChannelEvent, outbound: &dyn Outbound) -> Result<Decision> {
        let decision = self.evaluate(event).await;
        match &decision {
            Decision::Skip(reason) => {
                debug!(
                    "Skipping post {} from {}: {:?}",
                    event.message_id,
                    event.identity(),
                    reason
                );
            }
            Decision::Dispatch(delivery) => {
                info!(
                    "Relaying post {} from {} to {}",
                    event.message_id,
                    event.identity(),
                    delivery.chat_id
                );
                dispatch(delivery, outbound).await?;
            }
        }
        Ok(decision)
    }
}

async fn dispatch(delivery: &Delivery, outbound: &dyn Outbound) -> Result<()> {
    let body = delivery.notification.body();
    match &delivery.notification.media {
        Some(Media::Photo(file_id)) => {
            outbound
                .send_photo(delivery.chat_id, file_id, &body)
                .await
        }
        Some(Media::Animation(file_id)) => {
            outbound
                .send_animation(delivery.chat_id, file_id, &body)
                .await
        }
        None => outbound.send_text(delivery.chat_id, &body).await,
    }
}
