use std::sync::{Arc, LazyLock};
use async_trait::async_trait;
use fluent::FluentArgs;
use regex::Regex;
use crate::localization::Locales;
use crate::watcher::{FetchError, Probe, SourceKind};

const FEED_URL: &str = "https://www.youtube.com/feeds/videos.xml";

static VIDEO_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| { Regex::new(r"<yt:videoId>(.*?)</yt:videoId>").unwrap() });

/// The first video id in the feed, which is the most recent upload.
pub fn latest_video_id(feed: &str) -> Option<&str> {
    VIDEO_ID_REGEX
        .captures(feed)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().trim())
        .filter(|id| !id.is_empty())
}

pub fn video_url(video_id: &str) -> String {
    format!("https://youtu.be/{}", video_id)
}

pub struct YoutubeFeedProbe {
    client: reqwest::Client,
    channel_id: String,
    locales: Arc<Locales>,
    locale: String,
}

impl YoutubeFeedProbe {
    pub fn new(client: reqwest::Client, channel_id: String, locales: Arc<Locales>, locale: String) -> Self {
        Self { client, channel_id, locales, locale }
    }
}

#[async_trait]
impl Probe for YoutubeFeedProbe {
    type Snapshot = String;
    type Token = String;

    fn kind(&self) -> SourceKind {
        SourceKind::VideoFeed
    }

    async fn fetch(&self) -> Result<String, FetchError> {
        let response = self.client
            .get(FEED_URL)
            .query(&[("channel_id", self.channel_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.text().await?)
    }

    fn extract(&self, feed: &String) -> Option<String> {
        latest_video_id(feed).map(str::to_owned)
    }

    // any new id is a new upload
    fn is_forward(&self, _previous: &String, _current: &String) -> bool {
        true
    }

    fn format(&self, video_id: &String) -> anyhow::Result<String> {
        let mut args = FluentArgs::new();
        args.set("url", video_url(video_id));

        self.locales.resolve(&self.locale, "youtube-new-video", Some(&args))
    }
}
