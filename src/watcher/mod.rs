pub mod announcer;
pub mod kick;
pub mod youtube;

use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use poise::serenity_prelude::ChannelId;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use crate::watcher::announcer::Announcer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    VideoFeed,
    LiveStatus,
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::VideoFeed => write!(f, "video-feed"),
            SourceKind::LiveStatus => write!(f, "live-status"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected response status {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// One external source the watcher polls.
///
/// `fetch` talks to the outside world; everything else is pure so that the
/// change detection can be exercised without a network.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    type Snapshot: Send;
    type Token: Clone + PartialEq + Debug + Send + Sync;

    fn kind(&self) -> SourceKind;

    async fn fetch(&self) -> Result<Self::Snapshot, FetchError>;

    /// `None` when the snapshot carries nothing to compare.
    fn extract(&self, snapshot: &Self::Snapshot) -> Option<Self::Token>;

    /// Whether moving from `previous` to `current` deserves an announcement.
    /// Only called when the two differ.
    fn is_forward(&self, previous: &Self::Token, current: &Self::Token) -> bool;

    fn format(&self, token: &Self::Token) -> anyhow::Result<String>;
}

#[derive(Debug, Clone)]
pub struct WatcherState<T> {
    pub kind: SourceKind,
    pub last_seen: Option<T>,
    pub poll_interval: Duration,
    pub target: ChannelId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    FetchFailed,
    Empty,
    Baseline,
    Unchanged,
    Suppressed,
    Notified,
    NotifyFailed,
}

pub struct Watcher<P: Probe> {
    probe: P,
    state: WatcherState<P::Token>,
    fetch_timeout: Duration,
    announcer: Arc<dyn Announcer>,
}

impl<P: Probe> Watcher<P> {
    pub fn new(probe: P, target: ChannelId, poll_interval: Duration, fetch_timeout: Duration, announcer: Arc<dyn Announcer>) -> Self {
        let state = WatcherState {
            kind: probe.kind(),
            last_seen: None,
            poll_interval,
            target,
        };

        Self { probe, state, fetch_timeout, announcer }
    }

    pub fn state(&self) -> &WatcherState<P::Token> {
        &self.state
    }

    pub async fn tick(&mut self) -> TickOutcome {
        let kind = self.state.kind;

        let snapshot = match tokio::time::timeout(self.fetch_timeout, self.probe.fetch()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => {
                tracing::debug!(%kind, "Fetch failed, skipping tick: {}", err);
                return TickOutcome::FetchFailed;
            }
            Err(_) => {
                tracing::debug!(%kind, "Fetch failed, skipping tick: {}", FetchError::Timeout(self.fetch_timeout));
                return TickOutcome::FetchFailed;
            }
        };

        let Some(token) = self.probe.extract(&snapshot) else {
            tracing::debug!(%kind, "Snapshot had no token, skipping tick");
            return TickOutcome::Empty;
        };

        let outcome = match &self.state.last_seen {
            None => {
                tracing::info!(%kind, token = ?token, "Baseline established");
                TickOutcome::Baseline
            }
            Some(previous) if *previous == token => TickOutcome::Unchanged,
            Some(previous) if !self.probe.is_forward(previous, &token) => TickOutcome::Suppressed,
            Some(_) => self.notify(&token).await,
        };

        self.state.last_seen = Some(token);
        outcome
    }

    async fn notify(&self, token: &P::Token) -> TickOutcome {
        let kind = self.state.kind;

        let text = match self.probe.format(token) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(%kind, "Failed to format notification: {:?}", err);
                return TickOutcome::NotifyFailed;
            }
        };

        match self.announcer.announce(self.state.target, text).await {
            Ok(()) => {
                tracing::info!(%kind, token = ?token, channel_id = %self.state.target, "Announced change");
                TickOutcome::Notified
            }
            Err(err) => {
                tracing::warn!(%kind, channel_id = %self.state.target, "Failed to announce change: {:?}", err);
                TickOutcome::NotifyFailed
            }
        }
    }

    /// Ticks immediately, then once per poll interval. Ticks never overlap:
    /// a slow fetch delays the next one.
    pub async fn run(mut self) {
        tracing::info!(kind = %self.state.kind, interval = ?self.state.poll_interval, "Watcher started");

        let mut interval = tokio::time::interval(self.state.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}
