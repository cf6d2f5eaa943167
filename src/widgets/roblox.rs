use super::str_field;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobloxView {
    pub username: String,
    pub display_name: String,
    pub presence: String,
    pub location: Option<String>,
}

pub fn presence_label(kind: u64) -> &'static str {
    match kind {
        1 => "Online",
        2 => "In game",
        3 => "In Studio",
        _ => "Offline",
    }
}

pub fn map_roblox(value: &Value) -> RobloxView {
    let presence = value
        .get("presence")
        .or_else(|| value.pointer("/userPresences/0"))
        .unwrap_or(value);
    let kind = presence
        .get("userPresenceType")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let username = str_field(value, "username")
        .or_else(|| str_field(value, "name"))
        .unwrap_or_else(|| "—".to_string());
    RobloxView {
        display_name: str_field(value, "displayName").unwrap_or_else(|| username.clone()),
        username,
        presence: presence_label(kind).to_string(),
        location: str_field(presence, "lastLocation").filter(|_| kind >= 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn location_is_only_shown_in_game() {
        let view = map_roblox(&json!({
            "username": "Piotrunius",
            "presence": { "userPresenceType": 2, "lastLocation": "Doors" }
        }));
        assert_eq!(view.presence, "In game");
        assert_eq!(view.location.as_deref(), Some("Doors"));
        assert_eq!(view.display_name, "Piotrunius");

        let view = map_roblox(&json!({ "userPresences": [{ "userPresenceType": 1, "lastLocation": "Website" }] }));
        assert_eq!(view.presence, "Online");
        assert_eq!(view.location, None);
    }
}
