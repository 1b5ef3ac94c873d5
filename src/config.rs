use anyhow::anyhow;
use config::{Config, Environment};
use poise::serenity_prelude::{ApplicationId, ChannelId, GuildId, RoleId};
use serde::Deserialize;
use std::time::Duration;

pub fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    load_with_environment(path, Environment::default())
}

fn load_with_environment(path: &str, environment: Environment) -> anyhow::Result<AppConfig> {
    let config = Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(environment.try_parsing(true).ignore_empty(true))
        .build()?;

    config.try_deserialize()
        .map_err(|e| anyhow!(e))
}

/// Flat configuration, keyed by the lower-cased environment variable names
/// (`TOKEN`, `MOD_ROLE_ID`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub token: String,

    pub client_id: u64,

    pub guild_id: Option<u64>,

    pub mod_role_id: Option<u64>,

    pub welcome_channel_id: Option<u64>,

    pub announce_channel_id: Option<u64>,

    pub youtube_channel_id: Option<String>,

    pub kick_username: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_youtube_poll")]
    pub youtube_poll_secs: u64,

    #[serde(default = "default_kick_poll")]
    pub kick_poll_secs: u64,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_port() -> u16 { 3000 }

fn default_locale() -> String { crate::localization::DEFAULT_LOCALE.to_string() }

fn default_youtube_poll() -> u64 { 5 * 60 }

fn default_kick_poll() -> u64 { 3 * 60 }

fn default_fetch_timeout() -> u64 { 30 }

fn snowflake(id: Option<u64>) -> Option<u64> {
    id.filter(|id| *id != 0)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Source and destination of one watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub source: String,
    pub channel_id: ChannelId,
    pub interval: Duration,
}

impl AppConfig {
    pub fn verify(&self) -> anyhow::Result<()> {
        if self.token.trim().is_empty() {
            return Err(anyhow!("bot token is empty"))
        }

        if self.client_id == 0 {
            return Err(anyhow!("CLIENT_ID must be a non-zero application id"))
        }

        let ids = [
            ("GUILD_ID", self.guild_id),
            ("MOD_ROLE_ID", self.mod_role_id),
            ("WELCOME_CHANNEL_ID", self.welcome_channel_id),
            ("ANNOUNCE_CHANNEL_ID", self.announce_channel_id),
        ];
        if let Some((name, _)) = ids.iter().find(|(_, id)| *id == Some(0)) {
            return Err(anyhow!("{} must be a non-zero id", name))
        }

        if self.youtube_poll_secs == 0 || self.kick_poll_secs == 0 {
            return Err(anyhow!("poll intervals must be positive"))
        }

        let timeout = self.fetch_timeout();
        if timeout.is_zero() {
            return Err(anyhow!("FETCH_TIMEOUT_SECS must be positive"))
        }
        for target in [self.youtube_watch(), self.kick_watch()].into_iter().flatten() {
            if timeout >= target.interval {
                return Err(anyhow!(
                    "FETCH_TIMEOUT_SECS ({}s) must be shorter than the poll interval of {} ({}s)",
                    timeout.as_secs(), target.source, target.interval.as_secs()
                ))
            }
        }

        Ok(())
    }

    pub fn application_id(&self) -> ApplicationId {
        ApplicationId::new(self.client_id)
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        snowflake(self.guild_id).map(GuildId::new)
    }

    pub fn moderation_role(&self) -> Option<RoleId> {
        snowflake(self.mod_role_id).map(RoleId::new)
    }

    pub fn welcome_channel(&self) -> Option<ChannelId> {
        snowflake(self.welcome_channel_id).map(ChannelId::new)
    }

    pub fn announce_channel(&self) -> Option<ChannelId> {
        snowflake(self.announce_channel_id).map(ChannelId::new)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Present only when both the channel id and the announcement channel are set.
    pub fn youtube_watch(&self) -> Option<WatchTarget> {
        Some(WatchTarget {
            source: non_blank(&self.youtube_channel_id)?.to_string(),
            channel_id: self.announce_channel()?,
            interval: Duration::from_secs(self.youtube_poll_secs),
        })
    }

    /// Present only when both the username and the announcement channel are set.
    pub fn kick_watch(&self) -> Option<WatchTarget> {
        Some(WatchTarget {
            source: non_blank(&self.kick_username)?.to_string(),
            channel_id: self.announce_channel()?,
            interval: Duration::from_secs(self.kick_poll_secs),
        })
    }
}
