//! Status widgets: fetch a third-party JSON document, map it defensively into
//! a view-model and keep the latest one for the terminal and the HTTP API.

pub mod discord;
pub mod github;
pub mod roblox;
pub mod spotify;
pub mod steam;

use crate::config::WidgetEndpoints;
use crate::logger::Logger;
use crate::net::{FetchError, JsonSource, with_cache_buster};
use discord::DiscordView;
use github::GitHubView;
use roblox::RobloxView;
use serde::Serialize;
use serde_json::{Value, json};
use spotify::SpotifyView;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use steam::SteamView;
use time::{OffsetDateTime, UtcOffset};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum WidgetKind {
    GitHub,
    Steam,
    Discord,
    Roblox,
    Spotify,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 5] = [
        WidgetKind::GitHub,
        WidgetKind::Steam,
        WidgetKind::Discord,
        WidgetKind::Roblox,
        WidgetKind::Spotify,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WidgetKind::GitHub => "github",
            WidgetKind::Steam => "steam",
            WidgetKind::Discord => "discord",
            WidgetKind::Roblox => "roblox",
            WidgetKind::Spotify => "spotify",
        }
    }

    pub fn base_interval(self) -> Duration {
        match self {
            WidgetKind::GitHub => Duration::from_secs(600),
            WidgetKind::Steam | WidgetKind::Roblox => Duration::from_secs(120),
            WidgetKind::Discord | WidgetKind::Spotify => Duration::from_secs(30),
        }
    }

    /// Low-end devices poll half as often.
    pub fn poll_interval(self, low_end: bool) -> Duration {
        if low_end {
            self.base_interval() * 2
        } else {
            self.base_interval()
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub github: Option<GitHubView>,
    pub steam: Option<SteamView>,
    pub discord: Option<DiscordView>,
    pub roblox: Option<RobloxView>,
    pub spotify: Option<SpotifyView>,
    /// RFC 3339 time of the last successful refresh, keyed by widget name.
    pub refreshed_at: BTreeMap<&'static str, String>,
    pub last_errors: BTreeMap<&'static str, String>,
}

impl WidgetSnapshot {
    pub fn has(&self, kind: WidgetKind) -> bool {
        match kind {
            WidgetKind::GitHub => self.github.is_some(),
            WidgetKind::Steam => self.steam.is_some(),
            WidgetKind::Discord => self.discord.is_some(),
            WidgetKind::Roblox => self.roblox.is_some(),
            WidgetKind::Spotify => self.spotify.is_some(),
        }
    }
}

#[derive(Clone)]
pub struct WidgetBoard {
    source: Arc<dyn JsonSource>,
    endpoints: WidgetEndpoints,
    default_author: String,
    offset: UtcOffset,
    logger: Logger,
    state: Arc<RwLock<WidgetSnapshot>>,
}

impl WidgetBoard {
    pub fn new(
        source: Arc<dyn JsonSource>,
        endpoints: WidgetEndpoints,
        default_author: String,
        offset: UtcOffset,
        logger: Logger,
    ) -> Self {
        Self {
            source,
            endpoints,
            default_author,
            offset,
            logger,
            state: Arc::new(RwLock::new(WidgetSnapshot::default())),
        }
    }

    pub async fn snapshot(&self) -> WidgetSnapshot {
        self.state.read().await.clone()
    }

    /// Refreshes one widget when it has never loaded, then returns the snapshot.
    pub async fn ensure(&self, kind: WidgetKind) -> WidgetSnapshot {
        if !self.state.read().await.has(kind) {
            let _ = self.refresh(kind).await;
        }
        self.snapshot().await
    }

    /// Fetches and maps one widget. On failure the previous view stays in place.
    pub async fn refresh(&self, kind: WidgetKind) -> Result<(), FetchError> {
        let result = self.fetch(kind).await;
        let mut state = self.state.write().await;
        if let Err(error) = result {
            self.logger.warn(
                "widget.refresh_failed",
                json!({ "widget": kind.as_str(), "error": error.to_string() }),
            );
            state.last_errors.insert(kind.as_str(), error.to_string());
            return Err(error);
        }
        state.last_errors.remove(kind.as_str());
        Ok(())
    }

    pub async fn refresh_all(&self) {
        for kind in WidgetKind::ALL {
            let _ = self.refresh(kind).await;
        }
    }

    async fn fetch(&self, kind: WidgetKind) -> Result<(), FetchError> {
        let stamp = OffsetDateTime::now_utc();
        match kind {
            WidgetKind::GitHub => {
                let value = self.fetch_github().await?;
                let view = github::map_github(&value, self.offset, &self.default_author);
                self.store(kind, stamp, |state| state.github = Some(view)).await;
            }
            WidgetKind::Steam => {
                let value = self.source.get_json(&self.endpoints.steam_status_url).await?;
                let view = steam::map_steam(&value);
                self.store(kind, stamp, |state| state.steam = Some(view)).await;
            }
            WidgetKind::Discord => {
                let Some(url) = self.lanyard_url() else {
                    return Err(FetchError::Transport("DISCORD_USER_ID is not configured".into()));
                };
                let value = self.source.get_json(&url).await?;
                let view = discord::map_discord(&value);
                self.store(kind, stamp, |state| state.discord = Some(view)).await;
            }
            WidgetKind::Roblox => {
                let value = self.source.get_json(&self.endpoints.roblox_status_url).await?;
                let view = roblox::map_roblox(&value);
                self.store(kind, stamp, |state| state.roblox = Some(view)).await;
            }
            WidgetKind::Spotify => {
                let value = self.source.get_json(&self.endpoints.spotify_status_url).await?;
                let view = spotify::map_spotify(&value);
                self.store(kind, stamp, |state| state.spotify = Some(view)).await;
            }
        }
        Ok(())
    }

    /// Tries the primary stats URL, then the fallback file.
    async fn fetch_github(&self) -> Result<Value, FetchError> {
        let stamp = OffsetDateTime::now_utc().unix_timestamp();
        let primary = with_cache_buster(&self.endpoints.github_stats_url, stamp);
        match self.source.get_json(&primary).await {
            Ok(value) => Ok(value),
            Err(error) if self.endpoints.github_stats_fallback_url.is_empty() => Err(error),
            Err(error) => {
                self.logger.debug(
                    "widget.github_fallback",
                    json!({ "error": error.to_string() }),
                );
                let fallback =
                    with_cache_buster(&self.endpoints.github_stats_fallback_url, stamp);
                self.source.get_json(&fallback).await
            }
        }
    }

    fn lanyard_url(&self) -> Option<String> {
        let id = self.endpoints.discord_user_id.trim();
        if id.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}",
            self.endpoints.lanyard_base_url.trim_end_matches('/'),
            id
        ))
    }

    async fn store(
        &self,
        kind: WidgetKind,
        stamp: OffsetDateTime,
        apply: impl FnOnce(&mut WidgetSnapshot),
    ) {
        let mut state = self.state.write().await;
        apply(&mut state);
        state.refreshed_at.insert(
            kind.as_str(),
            stamp
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
        );
    }

    /// One polling task per widget; each only touches its own slot.
    pub fn spawn_pollers(&self, low_end: bool) -> Vec<JoinHandle<()>> {
        WidgetKind::ALL
            .into_iter()
            .map(|kind| {
                let board = self.clone();
                let period = kind.poll_interval(low_end);
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                    loop {
                        ticker.tick().await;
                        let _ = board.refresh(kind).await;
                    }
                })
            })
            .collect()
    }
}

/// String field, ignoring blanks and non-strings.
pub(crate) fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

pub(crate) fn str_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    current
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Counter rendered as text; numbers and numeric strings pass, anything else is `0`.
pub(crate) fn count_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
        _ => "0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::logger::LogLevel;
    use crate::net::testing::CannedSource;
    use pretty_assertions::assert_eq;

    fn board(source: CannedSource, discord_id: &str) -> WidgetBoard {
        let mut endpoints = Config::default().widgets;
        endpoints.github_stats_url = "https://stats.test/primary.json".to_string();
        endpoints.github_stats_fallback_url = "https://stats.test/fallback.json".to_string();
        endpoints.discord_user_id = discord_id.to_string();
        WidgetBoard::new(
            Arc::new(source),
            endpoints,
            "Piotrunius".to_string(),
            UtcOffset::UTC,
            Logger::new("test".into()).with_min_level(LogLevel::Error),
        )
    }

    #[tokio::test]
    async fn github_falls_back_to_the_secondary_file() {
        let source = CannedSource::default().with(
            "https://stats.test/fallback.json",
            json!({ "summary": { "projects": 3 } }),
        );
        let board = board(source, "");
        board.refresh(WidgetKind::GitHub).await.unwrap();
        let snapshot = board.snapshot().await;
        assert_eq!(snapshot.github.unwrap().summary.projects, "3");
        assert!(snapshot.refreshed_at.contains_key("github"));
    }

    #[tokio::test]
    async fn failures_keep_the_previous_view() {
        let source = CannedSource::default().with(
            "https://api.lanyard.rest/v1/users/42",
            json!({ "data": { "discord_status": "online" } }),
        );
        let board = board(source, "42");
        board.refresh(WidgetKind::Discord).await.unwrap();
        assert!(board.refresh(WidgetKind::Steam).await.is_err());
        let snapshot = board.snapshot().await;
        assert_eq!(snapshot.discord.unwrap().status, "Online");
        assert!(snapshot.steam.is_none());
        assert!(snapshot.last_errors.contains_key("steam"));
    }

    #[tokio::test]
    async fn discord_requires_a_user_id() {
        let board = board(CannedSource::default(), "");
        assert!(board.refresh(WidgetKind::Discord).await.is_err());
    }

    #[test]
    fn low_end_devices_poll_less_often() {
        assert_eq!(WidgetKind::Discord.poll_interval(false), Duration::from_secs(30));
        assert_eq!(WidgetKind::GitHub.poll_interval(true), Duration::from_secs(1200));
    }

    #[test]
    fn counts_accept_numbers_and_numeric_strings() {
        let value = json!({ "a": 5, "b": " 7 ", "c": null });
        assert_eq!(count_field(&value, "a"), "5");
        assert_eq!(count_field(&value, "b"), "7");
        assert_eq!(count_field(&value, "c"), "0");
        assert_eq!(count_field(&value, "missing"), "0");
    }
}
