use std::sync::Arc;
use anyhow::anyhow;
use async_trait::async_trait;
use poise::serenity_prelude::{Channel, ChannelId, ChannelType, Http};

/// Posts a message to a channel.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, channel_id: ChannelId, text: String) -> anyhow::Result<()>;
}

/// Whether messages can be posted to a channel of this kind.
pub fn is_text_capable(kind: ChannelType) -> bool {
    matches!(
        kind,
        ChannelType::Text
            | ChannelType::Private
            | ChannelType::News
            | ChannelType::NewsThread
            | ChannelType::PublicThread
            | ChannelType::PrivateThread
            | ChannelType::Voice
            | ChannelType::Stage
    )
}

/// Looks the channel up and returns it only if it accepts messages.
pub async fn resolve_text_channel(http: &Http, channel_id: ChannelId) -> Option<ChannelId> {
    let channel = match channel_id.to_channel(http).await {
        Ok(channel) => channel,
        Err(err) => {
            tracing::debug!("Failed to resolve channel {}: {:?}", channel_id, err);
            return None;
        }
    };

    let text_capable = match &channel {
        Channel::Guild(channel) => is_text_capable(channel.kind),
        Channel::Private(_) => true,
        _ => false,
    };

    text_capable.then_some(channel_id)
}

pub struct HttpAnnouncer {
    http: Arc<Http>,
}

impl HttpAnnouncer {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Announcer for HttpAnnouncer {
    async fn announce(&self, channel_id: ChannelId, text: String) -> anyhow::Result<()> {
        let channel_id = resolve_text_channel(&self.http, channel_id).await
            .ok_or(anyhow!("channel {} does not exist or is not text-capable", channel_id))?;

        channel_id.say(&self.http, text).await?;

        Ok(())
    }
}
