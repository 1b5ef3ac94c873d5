use std::sync::Arc;
use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, GuildId};
use crate::session::actor::SessionActor;
use crate::session::driver::VoiceGateway;
use crate::session::{NowPlaying, SessionError, SessionHandle, SessionSnapshot, StopOutcome};

/// Registry of voice sessions, one actor per guild.
pub struct SessionManager {
    sessions: DashMap<GuildId, SessionHandle>,

    gateway: Arc<dyn VoiceGateway>,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn VoiceGateway>) -> Self {
        Self {
            sessions: DashMap::new(),
            gateway,
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<SessionHandle> {
        self.sessions.get(&guild_id).map(|r| r.value().clone())
    }

    pub fn get_or_spawn(&self, guild_id: GuildId) -> SessionHandle {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                let (actor, handle) = SessionActor::new(guild_id, self.gateway.clone());
                tokio::spawn(actor.run());
                tracing::info!("Registered session for guild: {}", guild_id);
                handle
            })
            .value()
            .clone()
    }

    pub async fn play(&self, guild_id: GuildId, channel_id: ChannelId, url: String) -> Result<NowPlaying, SessionError> {
        self.get_or_spawn(guild_id).play(channel_id, url).await
    }

    /// Stopping a guild that never played is a no-op.
    pub async fn stop(&self, guild_id: GuildId) -> Result<StopOutcome, SessionError> {
        match self.get(guild_id) {
            Some(handle) => handle.stop().await,
            None => Ok(StopOutcome::AlreadyIdle),
        }
    }

    pub async fn snapshot(&self, guild_id: GuildId) -> Result<SessionSnapshot, SessionError> {
        match self.get(guild_id) {
            Some(handle) => handle.snapshot().await,
            None => Ok(SessionSnapshot::disconnected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_utils::MockGateway;
    use crate::session::{DriverEvent, SessionState};

    fn guild() -> GuildId {
        GuildId::new(1)
    }

    fn voice() -> ChannelId {
        ChannelId::new(10)
    }

    fn manager() -> (SessionManager, MockGateway) {
        let gateway = MockGateway::new();
        (SessionManager::new(Arc::new(gateway.clone())), gateway)
    }

    #[tokio::test]
    async fn play_from_disconnected_starts_playing() {
        let (manager, gateway) = manager();

        let playing = manager.play(guild(), voice(), "U1".to_string()).await.unwrap();
        assert_eq!(playing.url, "U1");
        assert_eq!(playing.title.as_deref(), Some("title of U1"));

        let snapshot = manager.snapshot(guild()).await.unwrap();
        assert_eq!(snapshot.state, SessionState::Playing);
        assert_eq!(snapshot.current_source.as_deref(), Some("U1"));
        assert_eq!(snapshot.channel_id, Some(voice()));
        assert_eq!(gateway.log(), vec!["join 1 10", "play"]);
    }

    #[tokio::test]
    async fn second_play_halts_previous_source_and_reuses_connection() {
        let (manager, gateway) = manager();

        manager.play(guild(), voice(), "U1".to_string()).await.unwrap();
        manager.play(guild(), voice(), "U2".to_string()).await.unwrap();

        let snapshot = manager.snapshot(guild()).await.unwrap();
        assert_eq!(snapshot.state, SessionState::Playing);
        assert_eq!(snapshot.current_source.as_deref(), Some("U2"));
        // the first source is stopped before the second starts
        assert_eq!(gateway.log(), vec!["join 1 10", "play", "stop", "play"]);
    }

    #[tokio::test]
    async fn play_in_another_channel_replaces_connection() {
        let (manager, gateway) = manager();

        manager.play(guild(), voice(), "U1".to_string()).await.unwrap();
        manager.play(guild(), ChannelId::new(11), "U2".to_string()).await.unwrap();

        let snapshot = manager.snapshot(guild()).await.unwrap();
        assert_eq!(snapshot.channel_id, Some(ChannelId::new(11)));
        assert_eq!(gateway.count("join"), 2);
        assert_eq!(gateway.count("leave"), 1);
        assert_eq!(gateway.log().last().map(String::as_str), Some("play"));
    }

    #[tokio::test]
    async fn stop_twice_is_idempotent() {
        let (manager, gateway) = manager();

        manager.play(guild(), voice(), "U1".to_string()).await.unwrap();

        assert_eq!(manager.stop(guild()).await.unwrap(), StopOutcome::Stopped);
        assert_eq!(manager.stop(guild()).await.unwrap(), StopOutcome::AlreadyIdle);

        let snapshot = manager.snapshot(guild()).await.unwrap();
        assert_eq!(snapshot.state, SessionState::Disconnected);
        assert_eq!(snapshot.current_source, None);
        assert_eq!(gateway.count("leave"), 1);
    }

    #[tokio::test]
    async fn stop_without_session_is_noop() {
        let (manager, gateway) = manager();

        assert_eq!(manager.stop(guild()).await.unwrap(), StopOutcome::AlreadyIdle);
        assert_eq!(manager.stop(guild()).await.unwrap(), StopOutcome::AlreadyIdle);
        assert_eq!(manager.snapshot(guild()).await.unwrap().state, SessionState::Disconnected);
        assert!(gateway.log().is_empty());
    }

    #[tokio::test]
    async fn source_open_failure_stays_connected() {
        let (manager, gateway) = manager();

        let result = manager.play(guild(), voice(), "bad-url".to_string()).await;
        assert!(matches!(result, Err(SessionError::SourceUnavailable(_))));

        let snapshot = manager.snapshot(guild()).await.unwrap();
        assert_eq!(snapshot.state, SessionState::Connected);
        assert_eq!(snapshot.current_source, None);
        assert_eq!(gateway.count("play"), 0);
    }

    #[tokio::test]
    async fn join_failure_stays_disconnected() {
        let (manager, _gateway) = manager();

        let result = manager.play(guild(), ChannelId::new(666), "U1".to_string()).await;
        assert!(matches!(result, Err(SessionError::Join(_))));
        assert_eq!(manager.snapshot(guild()).await.unwrap().state, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn stop_during_source_open_discards_the_stale_source() {
        let (manager, gateway) = manager();
        let handle = manager.get_or_spawn(guild());

        let pending = tokio::spawn(async move { handle.play(voice(), "slow-url".to_string()).await });

        while manager.snapshot(guild()).await.unwrap().state != SessionState::Connected {
            tokio::task::yield_now().await;
        }

        assert_eq!(manager.stop(guild()).await.unwrap(), StopOutcome::Stopped);
        gateway.release();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(SessionError::Superseded)));

        let snapshot = manager.snapshot(guild()).await.unwrap();
        assert_eq!(snapshot.state, SessionState::Disconnected);
        assert_eq!(gateway.count("play"), 0);
    }

    #[tokio::test]
    async fn track_end_returns_to_connected() {
        let (manager, gateway) = manager();

        manager.play(guild(), voice(), "U1".to_string()).await.unwrap();
        gateway.fire_track(DriverEvent::TrackEnded).await;

        let snapshot = manager.snapshot(guild()).await.unwrap();
        assert_eq!(snapshot.state, SessionState::Connected);
        assert_eq!(snapshot.current_source, None);
    }

    #[tokio::test]
    async fn end_of_a_replaced_track_is_ignored() {
        let (manager, gateway) = manager();

        manager.play(guild(), voice(), "U1".to_string()).await.unwrap();
        let replaced = gateway.track_sink();
        manager.play(guild(), voice(), "U2".to_string()).await.unwrap();

        replaced.emit(DriverEvent::TrackEnded).await;
        replaced.emit(DriverEvent::TrackFailed).await;

        let snapshot = manager.snapshot(guild()).await.unwrap();
        assert_eq!(snapshot.state, SessionState::Playing);
        assert_eq!(snapshot.current_source.as_deref(), Some("U2"));
        assert_eq!(gateway.count("leave"), 0);
    }

    #[tokio::test]
    async fn playback_failure_tears_down_connection() {
        let (manager, gateway) = manager();

        manager.play(guild(), voice(), "U1".to_string()).await.unwrap();
        gateway.fire_track(DriverEvent::TrackFailed).await;

        let snapshot = manager.snapshot(guild()).await.unwrap();
        assert_eq!(snapshot.state, SessionState::Disconnected);
        assert_eq!(gateway.count("leave"), 1);
    }

    #[tokio::test]
    async fn driver_disconnect_resets_session() {
        let (manager, gateway) = manager();

        manager.play(guild(), voice(), "U1".to_string()).await.unwrap();
        gateway.fire_disconnect().await;

        let snapshot = manager.snapshot(guild()).await.unwrap();
        assert_eq!(snapshot.state, SessionState::Disconnected);
        assert_eq!(snapshot.channel_id, None);

        // stop after a platform disconnect has nothing left to tear down
        assert_eq!(manager.stop(guild()).await.unwrap(), StopOutcome::AlreadyIdle);
    }

    #[tokio::test]
    async fn guilds_do_not_share_sessions() {
        let (manager, _gateway) = manager();
        let other = GuildId::new(2);

        manager.play(guild(), voice(), "U1".to_string()).await.unwrap();
        manager.play(other, ChannelId::new(20), "U2".to_string()).await.unwrap();
        manager.stop(other).await.unwrap();

        let first = manager.snapshot(guild()).await.unwrap();
        assert_eq!(first.state, SessionState::Playing);
        assert_eq!(first.current_source.as_deref(), Some("U1"));
        assert_eq!(manager.snapshot(other).await.unwrap().state, SessionState::Disconnected);
    }
}
