use super::str_field;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotifyView {
    pub is_playing: bool,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_art: Option<String>,
    pub url: Option<String>,
    pub progress_ms: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl SpotifyView {
    pub fn idle() -> Self {
        Self {
            is_playing: false,
            title: "Not playing".to_string(),
            artist: "—".to_string(),
            album: None,
            album_art: None,
            url: None,
            progress_ms: None,
            duration_ms: None,
        }
    }

    /// `[#####-----] 1:02 / 3:30` when timing is known.
    pub fn progress_bar(&self, width: usize) -> Option<String> {
        let (progress, duration) = (self.progress_ms?, self.duration_ms?);
        if duration == 0 {
            return None;
        }
        let ratio = progress.min(duration) as f64 / duration as f64;
        let filled = (ratio * width as f64).round() as usize;
        Some(format!(
            "[{}{}] {} / {}",
            "#".repeat(filled),
            "-".repeat(width.saturating_sub(filled)),
            format_ms(progress),
            format_ms(duration)
        ))
    }
}

fn pointer_str(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

pub fn format_ms(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Maps a worker payload or a Web API `currently-playing` document.
pub fn map_spotify(value: &Value) -> SpotifyView {
    let item = value.get("item").unwrap_or(value);
    let title = str_field(item, "title").or_else(|| str_field(item, "name"));
    let Some(title) = title else {
        return SpotifyView::idle();
    };
    let artist = str_field(item, "artist")
        .or_else(|| {
            item.get("artists").and_then(Value::as_array).map(|artists| {
                artists
                    .iter()
                    .filter_map(|artist| str_field(artist, "name"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
        })
        .filter(|artist| !artist.is_empty())
        .unwrap_or_else(|| "Unknown artist".to_string());
    let album = item.get("album").and_then(|album| match album {
        Value::String(name) => Some(name.clone()),
        other => str_field(other, "name"),
    });
    SpotifyView {
        is_playing: value
            .get("isPlaying")
            .or_else(|| value.get("is_playing"))
            .and_then(Value::as_bool)
            .unwrap_or(true),
        title,
        artist,
        album,
        album_art: str_field(item, "albumArt")
            .or_else(|| pointer_str(item, "/album/images/0/url")),
        url: str_field(item, "url")
            .or_else(|| pointer_str(item, "/external_urls/spotify")),
        progress_ms: value
            .get("progressMs")
            .or_else(|| value.get("progress_ms"))
            .and_then(Value::as_u64),
        duration_ms: item
            .get("durationMs")
            .or_else(|| item.get("duration_ms"))
            .and_then(Value::as_u64),
    }
}

/// Maps the `spotify` block Lanyard attaches to a Discord presence.
pub fn map_lanyard_spotify(spotify: &Value) -> SpotifyView {
    let start = spotify.pointer("/timestamps/start").and_then(Value::as_u64);
    let end = spotify.pointer("/timestamps/end").and_then(Value::as_u64);
    SpotifyView {
        is_playing: true,
        title: str_field(spotify, "song").unwrap_or_else(|| "Unknown track".to_string()),
        artist: str_field(spotify, "artist")
            .map(|artist| artist.replace(';', ","))
            .unwrap_or_else(|| "Unknown artist".to_string()),
        album: str_field(spotify, "album"),
        album_art: str_field(spotify, "album_art_url"),
        url: str_field(spotify, "track_id")
            .map(|id| format!("https://open.spotify.com/track/{id}")),
        progress_ms: None,
        duration_ms: start.zip(end).map(|(start, end)| end.saturating_sub(start)),
    }
}
