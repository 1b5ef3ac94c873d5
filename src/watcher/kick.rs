use std::sync::Arc;
use async_trait::async_trait;
use fluent::FluentArgs;
use serde::Deserialize;
use serde_json::Value;
use crate::localization::Locales;
use crate::watcher::{FetchError, Probe, SourceKind};

const CHANNEL_API: &str = "https://kick.com/api/v2/channels";

/// The part of the channel payload the watcher cares about.
#[derive(Debug, Deserialize)]
pub struct KickChannel {
    #[serde(default)]
    pub livestream: Option<Value>,
}

impl KickChannel {
    /// Null, `false`, `0` and `""` all mean offline.
    pub fn is_live(&self) -> bool {
        match &self.livestream {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

pub struct KickLiveProbe {
    client: reqwest::Client,
    username: String,
    locales: Arc<Locales>,
    locale: String,
}

impl KickLiveProbe {
    pub fn new(client: reqwest::Client, username: String, locales: Arc<Locales>, locale: String) -> Self {
        Self { client, username, locales, locale }
    }

    pub fn channel_url(&self) -> String {
        format!("https://kick.com/{}", self.username)
    }
}

#[async_trait]
impl Probe for KickLiveProbe {
    type Snapshot = KickChannel;
    type Token = bool;

    fn kind(&self) -> SourceKind {
        SourceKind::LiveStatus
    }

    async fn fetch(&self) -> Result<KickChannel, FetchError> {
        let response = self.client
            .get(format!("{}/{}", CHANNEL_API, self.username))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn extract(&self, channel: &KickChannel) -> Option<bool> {
        Some(channel.is_live())
    }

    // only going live is announced
    fn is_forward(&self, previous: &bool, current: &bool) -> bool {
        !*previous && *current
    }

    fn format(&self, _live: &bool) -> anyhow::Result<String> {
        let mut args = FluentArgs::new();
        args.set("url", self.channel_url());

        self.locales.resolve(&self.locale, "kick-live", Some(&args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::load_from_static_dir;

    fn probe() -> KickLiveProbe {
        KickLiveProbe::new(
            reqwest::Client::new(),
            "streamer".to_string(),
            Arc::new(load_from_static_dir("en").unwrap()),
            "en".to_string(),
        )
    }

    fn parse(body: &str) -> KickChannel {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn live_when_livestream_is_present() {
        let channel = parse(r#"{"slug":"streamer","livestream":{"id":1,"is_live":true}}"#);
        assert_eq!(probe().extract(&channel), Some(true));
    }

    #[test]
    fn offline_when_livestream_is_null_or_missing() {
        assert_eq!(probe().extract(&parse(r#"{"slug":"streamer","livestream":null}"#)), Some(false));
        assert_eq!(probe().extract(&parse(r#"{"slug":"streamer"}"#)), Some(false));
    }

    #[test]
    fn falsy_livestream_values_are_offline() {
        for body in [
            r#"{"livestream":false}"#,
            r#"{"livestream":0}"#,
            r#"{"livestream":""}"#,
        ] {
            assert_eq!(probe().extract(&parse(body)), Some(false), "{}", body);
        }
        assert_eq!(probe().extract(&parse(r#"{"livestream":true}"#)), Some(true));
    }

    #[test]
    fn only_rising_edge_is_forward() {
        let probe = probe();
        assert!(probe.is_forward(&false, &true));
        assert!(!probe.is_forward(&true, &false));
    }

    #[test]
    fn notification_links_the_channel() {
        assert_eq!(probe().format(&true).unwrap(), "🟢 **Live on Kick!** https://kick.com/streamer");
    }
}
