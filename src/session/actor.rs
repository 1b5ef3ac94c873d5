use std::sync::Arc;
use poise::serenity_prelude::{ChannelId, GuildId};
use tokio::sync::{mpsc, oneshot};
use crate::session::driver::{AudioDriver, VoiceGateway};
use crate::session::{
    AudioSource, DriverEvent, EventSink, NowPlaying, SessionCommand, SessionError, SessionHandle,
    SessionSnapshot, SessionState, StopOutcome,
};

struct Connection {
    channel_id: ChannelId,
    driver: Arc<dyn AudioDriver>,
    epoch: u64,
}

/// Owns the voice session of one guild.
///
/// Commands are processed one at a time. Opening an audio source happens
/// outside the mailbox so that `stop` is never blocked behind a slow open;
/// every state change bumps `generation`, and an opened source is only
/// played if its generation is still current when it comes back.
pub struct SessionActor {
    guild_id: GuildId,
    rx: mpsc::Receiver<SessionCommand>,
    tx: mpsc::WeakSender<SessionCommand>,
    gateway: Arc<dyn VoiceGateway>,
    connection: Option<Connection>,
    state: SessionState,
    current_source: Option<String>,
    generation: u64,
    epoch: u64,
}

impl SessionActor {
    pub fn new(guild_id: GuildId, gateway: Arc<dyn VoiceGateway>) -> (Self, SessionHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = Self {
            guild_id,
            rx: cmd_rx,
            tx: cmd_tx.downgrade(),
            gateway,
            connection: None,
            state: SessionState::Disconnected,
            current_source: None,
            generation: 0,
            epoch: 0,
        };

        (actor, SessionHandle::new(cmd_tx))
    }

    pub async fn run(mut self) {
        tracing::info!(guild_id = %self.guild_id, "Session actor started");

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                SessionCommand::Play { channel_id, url, reply } => {
                    self.handle_play(channel_id, url, reply).await;
                }
                SessionCommand::SourceOpened { generation, result, reply } => {
                    self.handle_source_opened(generation, result, reply).await;
                }
                SessionCommand::Stop { reply } => {
                    let outcome = self.handle_stop().await;
                    let _ = reply.send(outcome);
                }
                SessionCommand::Driver { stamp, event } => {
                    self.handle_driver_event(stamp, event).await;
                }
                SessionCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
            }
        }

        tracing::info!(guild_id = %self.guild_id, "Session actor stopped");
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            channel_id: self.connection.as_ref().map(|c| c.channel_id),
            current_source: self.current_source.clone(),
            generation: self.generation,
        }
    }

    fn sink(&self, stamp: u64) -> Option<EventSink> {
        self.tx.upgrade().map(|tx| EventSink::new(tx, stamp))
    }

    async fn handle_play(
        &mut self,
        channel_id: ChannelId,
        url: String,
        reply: oneshot::Sender<Result<NowPlaying, SessionError>>,
    ) {
        self.generation += 1;
        let generation = self.generation;

        if self.state == SessionState::Playing {
            if let Some(connection) = &self.connection {
                connection.driver.stop().await;
            }
            self.state = SessionState::Connected;
            self.current_source = None;
        }

        if let Err(err) = self.ensure_connected(channel_id).await {
            tracing::warn!(guild_id = %self.guild_id, "Failed to connect: {}", err);
            let _ = reply.send(Err(err));
            return;
        }

        let Some(tx) = self.tx.upgrade() else {
            let _ = reply.send(Err(SessionError::Closed));
            return;
        };

        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            let result = gateway.open(&url).await.map_err(SessionError::SourceUnavailable);
            let opened = SessionCommand::SourceOpened { generation, result, reply };

            if let Err(mpsc::error::SendError(SessionCommand::SourceOpened { reply, .. })) = tx.send(opened).await {
                let _ = reply.send(Err(SessionError::Closed));
            }
        });
    }

    async fn ensure_connected(&mut self, channel_id: ChannelId) -> Result<(), SessionError> {
        if self.connection.as_ref().is_some_and(|c| c.channel_id == channel_id) {
            return Ok(());
        }

        // connected elsewhere in this guild: replace the old connection
        self.teardown().await;

        let driver = self.gateway.join(self.guild_id, channel_id).await
            .map_err(SessionError::Join)?;

        self.epoch += 1;
        if let Some(sink) = self.sink(self.epoch) {
            driver.subscribe_to_disconnect_event(sink).await;
        }

        self.connection = Some(Connection { channel_id, driver, epoch: self.epoch });
        self.state = SessionState::Connected;
        tracing::info!(guild_id = %self.guild_id, channel_id = %channel_id, "Joined voice channel");

        Ok(())
    }

    async fn handle_source_opened(
        &mut self,
        generation: u64,
        result: Result<AudioSource, SessionError>,
        reply: oneshot::Sender<Result<NowPlaying, SessionError>>,
    ) {
        if generation != self.generation {
            tracing::debug!(guild_id = %self.guild_id, generation, current = self.generation, "Discarding stale audio source");
            let _ = reply.send(Err(SessionError::Superseded));
            return;
        }

        let source = match result {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(guild_id = %self.guild_id, "{}", err);
                let _ = reply.send(Err(err));
                return;
            }
        };

        let Some(driver) = self.connection.as_ref().map(|c| c.driver.clone()) else {
            let _ = reply.send(Err(SessionError::NotConnected));
            return;
        };

        let Some(sink) = self.sink(generation) else {
            let _ = reply.send(Err(SessionError::Closed));
            return;
        };

        let AudioSource { url, title, input } = source;

        if let Err(err) = driver.play(input, sink).await {
            tracing::error!(guild_id = %self.guild_id, "Failed to start playback: {:?}", err);
            let _ = reply.send(Err(SessionError::Playback(err)));
            return;
        }

        tracing::info!(guild_id = %self.guild_id, url = %url, "Playing");
        self.state = SessionState::Playing;
        self.current_source = Some(url.clone());
        let _ = reply.send(Ok(NowPlaying { url, title }));
    }

    async fn handle_stop(&mut self) -> StopOutcome {
        self.generation += 1;

        if self.connection.is_none() {
            return StopOutcome::AlreadyIdle;
        }

        self.teardown().await;
        StopOutcome::Stopped
    }

    async fn handle_driver_event(&mut self, stamp: u64, event: DriverEvent) {
        match event {
            DriverEvent::TrackEnded => {
                if stamp == self.generation && self.state == SessionState::Playing {
                    tracing::debug!(guild_id = %self.guild_id, "Track ended");
                    self.state = SessionState::Connected;
                    self.current_source = None;
                }
            }
            DriverEvent::TrackFailed => {
                if stamp == self.generation {
                    tracing::error!(guild_id = %self.guild_id, source = ?self.current_source, "Playback failed, leaving voice channel");
                    self.generation += 1;
                    self.teardown().await;
                }
            }
            DriverEvent::Disconnected => {
                if self.connection.as_ref().is_some_and(|c| c.epoch == stamp) {
                    tracing::info!(guild_id = %self.guild_id, "Voice driver disconnected");
                    self.generation += 1;
                    self.connection = None;
                    self.state = SessionState::Disconnected;
                    self.current_source = None;
                }
            }
        }
    }

    async fn teardown(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.driver.stop().await;
            if let Err(err) = connection.driver.leave().await {
                tracing::warn!(guild_id = %self.guild_id, "Failed to leave voice channel: {:?}", err);
            }
            tracing::info!(guild_id = %self.guild_id, channel_id = %connection.channel_id, "Left voice channel");
        }

        self.state = SessionState::Disconnected;
        self.current_source = None;
    }
}
