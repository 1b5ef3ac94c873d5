use std::fmt::{self, Display, Formatter};
use crate::config::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub name: &'static str,
    pub enabled: bool,
    pub detail: String,
}

impl Capability {
    fn enabled(name: &'static str, detail: String) -> Self {
        Self { name, enabled: true, detail }
    }

    fn disabled(name: &'static str, detail: &str) -> Self {
        Self { name, enabled: false, detail: detail.to_string() }
    }
}

/// Which optional subsystems the configuration turns on.
#[derive(Debug, Clone)]
pub struct CapabilityReport {
    pub capabilities: Vec<Capability>,
}

impl CapabilityReport {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut capabilities = Vec::new();

        capabilities.push(match config.guild_id() {
            Some(guild_id) => Capability::enabled("guild command registration", format!("guild {}", guild_id)),
            None => Capability::disabled("guild command registration", "GUILD_ID not set, registering globally"),
        });

        capabilities.push(match config.moderation_role() {
            Some(role) => Capability::enabled("moderation role", format!("role {}", role)),
            None => Capability::disabled("moderation role", "MOD_ROLE_ID not set, commands are open to everyone"),
        });

        capabilities.push(match config.welcome_channel() {
            Some(channel) => Capability::enabled("welcome messages", format!("channel {}", channel)),
            None => Capability::disabled("welcome messages", "WELCOME_CHANNEL_ID not set"),
        });

        capabilities.push(match config.announce_channel() {
            Some(channel) => Capability::enabled("announcements", format!("channel {}", channel)),
            None => Capability::disabled("announcements", "ANNOUNCE_CHANNEL_ID not set"),
        });

        capabilities.push(match config.youtube_watch() {
            Some(target) => Capability::enabled(
                "youtube watcher",
                format!("channel {} every {}s", target.source, target.interval.as_secs()),
            ),
            None => Capability::disabled("youtube watcher", "needs YOUTUBE_CHANNEL_ID and ANNOUNCE_CHANNEL_ID"),
        });

        capabilities.push(match config.kick_watch() {
            Some(target) => Capability::enabled(
                "kick watcher",
                format!("user {} every {}s", target.source, target.interval.as_secs()),
            ),
            None => Capability::disabled("kick watcher", "needs KICK_USERNAME and ANNOUNCE_CHANNEL_ID"),
        });

        Self { capabilities }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.name == name && c.enabled)
    }

    pub fn log(&self) {
        for capability in &self.capabilities {
            if capability.enabled {
                tracing::info!(capability = capability.name, "Enabled: {}", capability.detail);
            } else {
                tracing::warn!(capability = capability.name, "Disabled: {}", capability.detail);
            }
        }
    }
}

impl Display for CapabilityReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for capability in &self.capabilities {
            let mark = if capability.enabled { "enabled " } else { "disabled" };
            writeln!(f, "{} {:<28} {}", mark, capability.name, capability.detail)?;
        }
        Ok(())
    }
}
