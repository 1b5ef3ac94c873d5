use poise::serenity_prelude::ChannelId;
use songbird::input::Input;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

pub mod actor;
pub mod driver;
pub mod manager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Playing,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to join the voice channel: {0}")]
    Join(anyhow::Error),
    #[error("audio source is unavailable: {0}")]
    SourceUnavailable(anyhow::Error),
    #[error("failed to start playback: {0}")]
    Playback(anyhow::Error),
    #[error("request was superseded by a newer one")]
    Superseded,
    #[error("session is not connected")]
    NotConnected,
    #[error("session is no longer running")]
    Closed,
}

/// An opened audio source, ready to be handed to the driver.
pub struct AudioSource {
    pub url: String,
    pub title: Option<String>,
    pub input: Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub url: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyIdle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub channel_id: Option<ChannelId>,
    pub current_source: Option<String>,
    pub generation: u64,
}

impl SessionSnapshot {
    pub fn disconnected() -> Self {
        Self {
            state: SessionState::Disconnected,
            channel_id: None,
            current_source: None,
            generation: 0,
        }
    }
}

/// Signals raised by the voice driver outside of any command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    TrackEnded,
    TrackFailed,
    Disconnected,
}

enum SessionCommand {
    Play {
        channel_id: ChannelId,
        url: String,
        reply: oneshot::Sender<Result<NowPlaying, SessionError>>,
    },
    SourceOpened {
        generation: u64,
        result: Result<AudioSource, SessionError>,
        reply: oneshot::Sender<Result<NowPlaying, SessionError>>,
    },
    Stop {
        reply: oneshot::Sender<StopOutcome>,
    },
    Driver {
        stamp: u64,
        event: DriverEvent,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Delivers driver events back to the owning session, tagged with the
/// generation (tracks) or connection epoch (disconnects) they belong to.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<SessionCommand>,
    stamp: u64,
}

impl EventSink {
    fn new(tx: mpsc::Sender<SessionCommand>, stamp: u64) -> Self {
        Self { tx, stamp }
    }

    pub async fn emit(&self, event: DriverEvent) {
        let _ = self
            .tx
            .send(SessionCommand::Driver { stamp: self.stamp, event })
            .await;
    }
}

#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    fn new(tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { tx }
    }

    pub async fn play(&self, channel_id: ChannelId, url: String) -> Result<NowPlaying, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Play { channel_id, url, reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn stop(&self) -> Result<StopOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Stop { reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Snapshot { reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }
}
