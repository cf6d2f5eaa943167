use super::{count_field, str_field};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SteamView {
    pub persona: String,
    pub status: String,
    pub game: Option<String>,
    pub avatar: Option<String>,
    pub profile_url: Option<String>,
}

pub fn persona_state_label(state: u64) -> &'static str {
    match state {
        1 => "Online",
        2 => "Busy",
        3 => "Away",
        4 => "Snooze",
        5 => "Looking to trade",
        6 => "Looking to play",
        _ => "Offline",
    }
}

/// Accepts a bare player object or the Web API `response.players[0]` envelope.
pub fn map_steam(value: &Value) -> SteamView {
    let player = value
        .pointer("/response/players/0")
        .or_else(|| value.get("player"))
        .unwrap_or(value);
    let state = player
        .get("personastate")
        .and_then(Value::as_u64)
        .or_else(|| count_field(player, "personastate").parse().ok())
        .unwrap_or(0);
    let game = str_field(player, "gameextrainfo").or_else(|| str_field(player, "game"));
    let status = if game.is_some() {
        "In game".to_string()
    } else {
        str_field(player, "status").unwrap_or_else(|| persona_state_label(state).to_string())
    };
    SteamView {
        persona: str_field(player, "personaname").unwrap_or_else(|| "—".to_string()),
        status,
        game,
        avatar: str_field(player, "avatarfull").or_else(|| str_field(player, "avatar")),
        profile_url: str_field(player, "profileurl"),
    }
}
