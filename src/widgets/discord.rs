use super::spotify::{SpotifyView, map_lanyard_spotify};
use super::str_field;
use serde::Serialize;
use serde_json::Value;

const SPOTIFY_ACTIVITY: u64 = 2;
const CUSTOM_STATUS_ACTIVITY: u64 = 4;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordView {
    pub username: String,
    pub status: String,
    pub custom_status: Option<String>,
    pub activity: Option<String>,
    pub spotify: Option<SpotifyView>,
}

pub fn status_label(raw: &str) -> &'static str {
    match raw {
        "online" => "Online",
        "idle" => "Idle",
        "dnd" => "Do Not Disturb",
        _ => "Offline",
    }
}

fn activity_verb(kind: u64) -> &'static str {
    match kind {
        1 => "Streaming",
        2 => "Listening to",
        3 => "Watching",
        5 => "Competing in",
        _ => "Playing",
    }
}

/// Maps a Lanyard `/v1/users/<id>` document (or its bare `data` object).
pub fn map_discord(value: &Value) -> DiscordView {
    let data = value.get("data").unwrap_or(value);
    let user = data.get("discord_user").unwrap_or(&Value::Null);
    let activities: &[Value] = data
        .get("activities")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let custom_status = activities
        .iter()
        .find(|activity| {
            activity.get("type").and_then(Value::as_u64) == Some(CUSTOM_STATUS_ACTIVITY)
        })
        .and_then(|activity| str_field(activity, "state"));
    let activity = activities
        .iter()
        .filter(|activity| {
            !matches!(
                activity.get("type").and_then(Value::as_u64),
                Some(SPOTIFY_ACTIVITY) | Some(CUSTOM_STATUS_ACTIVITY)
            )
        })
        .find_map(|activity| {
            let name = str_field(activity, "name")?;
            let verb = activity_verb(activity.get("type").and_then(Value::as_u64).unwrap_or(0));
            Some(match str_field(activity, "details") {
                Some(details) => format!("{verb} {name}: {details}"),
                None => format!("{verb} {name}"),
            })
        });
    let listening = data
        .get("listening_to_spotify")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let spotify = if listening {
        data.get("spotify").filter(|value| value.is_object()).map(map_lanyard_spotify)
    } else {
        None
    };

    DiscordView {
        username: str_field(user, "global_name")
            .or_else(|| str_field(user, "display_name"))
            .or_else(|| str_field(user, "username"))
            .unwrap_or_else(|| "—".to_string()),
        status: status_label(
            data.get("discord_status")
                .and_then(Value::as_str)
                .unwrap_or("offline"),
        )
        .to_string(),
        custom_status,
        activity,
        spotify,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn maps_presence_activity_and_spotify() {
        let view = map_discord(&json!({
            "success": true,
            "data": {
                "discord_user": { "username": "piotrunius", "global_name": "Piotrunius" },
                "discord_status": "dnd",
                "listening_to_spotify": true,
                "spotify": { "song": "Track", "artist": "Artist" },
                "activities": [
                    { "type": 4, "state": "coding" },
                    { "type": 2, "name": "Spotify" },
                    { "type": 0, "name": "Minecraft", "details": "Survival" }
                ]
            }
        }));
        assert_eq!(view.username, "Piotrunius");
        assert_eq!(view.status, "Do Not Disturb");
        assert_eq!(view.custom_status.as_deref(), Some("coding"));
        assert_eq!(view.activity.as_deref(), Some("Playing Minecraft: Survival"));
        assert_eq!(view.spotify.map(|s| s.title), Some("Track".to_string()));
    }

    #[test]
    fn missing_fields_fall_back_to_offline() {
        let view = map_discord(&json!({ "success": false }));
        assert_eq!(view.username, "—");
        assert_eq!(view.status, "Offline");
        assert!(view.activity.is_none());
        assert!(view.spotify.is_none());
    }
}
