use crate::session::{AudioSource, DriverEvent, EventSink};
use anyhow::Context;
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId};
use songbird::input::{Compose, Input, YoutubeDl};
use songbird::{Call, CoreEvent, Event, EventContext, EventHandler, Songbird, TrackEvent};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Joins voice channels and opens audio sources.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> anyhow::Result<Arc<dyn AudioDriver>>;

    async fn open(&self, url: &str) -> anyhow::Result<AudioSource>;
}

/// A live voice connection.
#[async_trait]
pub trait AudioDriver: Send + Sync {
    /// Replaces whatever is playing with `input`.
    async fn play(&self, input: Input, events: EventSink) -> anyhow::Result<()>;

    async fn stop(&self);

    async fn leave(&self) -> anyhow::Result<()>;

    async fn subscribe_to_disconnect_event(&self, events: EventSink);
}

pub struct SongbirdGateway {
    songbird: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdGateway {
    pub fn new(songbird: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self { songbird, http }
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> anyhow::Result<Arc<dyn AudioDriver>> {
        let call = self.songbird.join(guild_id, channel_id).await
            .context("Failed to join voice channel")?;

        Ok(Arc::new(SongbirdDriver { call }))
    }

    async fn open(&self, url: &str) -> anyhow::Result<AudioSource> {
        let mut source = YoutubeDl::new(self.http.clone(), url.to_owned());

        // resolving metadata makes yt-dlp fail early for unplayable urls
        let metadata = source.aux_metadata().await
            .with_context(|| format!("Failed to resolve audio source {url}"))?;

        Ok(AudioSource {
            url: url.to_owned(),
            title: metadata.title,
            input: source.into(),
        })
    }
}

pub struct SongbirdDriver {
    pub call: Arc<Mutex<Call>>
}

struct SongbirdEventHandler { sink: EventSink, event: DriverEvent }
#[async_trait]
impl EventHandler for SongbirdEventHandler {
    async fn act(&self, _: &EventContext<'_>) -> Option<Event> {
        self.sink.emit(self.event).await;
        None
    }
}

#[async_trait]
impl AudioDriver for SongbirdDriver {
    async fn play(&self, input: Input, events: EventSink) -> anyhow::Result<()> {
        let mut call = self.call.lock().await;
        let track = call.play_only_input(input);
        track.add_event(Event::Track(TrackEvent::End), SongbirdEventHandler { sink: events.clone(), event: DriverEvent::TrackEnded })?;
        track.add_event(Event::Track(TrackEvent::Error), SongbirdEventHandler { sink: events, event: DriverEvent::TrackFailed })?;
        Ok(())
    }

    async fn stop(&self) {
        let mut call = self.call.lock().await;
        call.stop();
    }

    async fn leave(&self) -> anyhow::Result<()> {
        let mut call = self.call.lock().await;
        call.remove_all_global_events();
        call.leave().await?;
        Ok(())
    }

    async fn subscribe_to_disconnect_event(&self, events: EventSink) {
        let mut call = self.call.lock().await;
        // the call object is reused per guild, so drop handlers from earlier joins
        call.remove_all_global_events();
        call.add_global_event(Event::Core(CoreEvent::DriverDisconnect), SongbirdEventHandler { sink: events, event: DriverEvent::Disconnected });
    }
}
