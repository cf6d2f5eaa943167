use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_PAYLOAD_BYTES: usize = 2048;
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 8000;
const DEFAULT_MAX_SESSIONS: usize = 256;
const DEFAULT_SESSION_IDLE_SECONDS: u64 = 1800;
const DEFAULT_DISPLAY_UTC_OFFSET_MINUTES: i32 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

type Result<T> = std::result::Result<T, ConfigError>;

/// Low-end detection mode; `Auto` asks sysinfo.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LowEndMode {
    Auto,
    Forced,
    Disabled,
}

#[derive(Clone, Debug)]
pub struct WidgetEndpoints {
    pub github_stats_url: String,
    pub github_stats_fallback_url: String,
    pub steam_status_url: String,
    pub lanyard_base_url: String,
    pub discord_user_id: String,
    pub roblox_status_url: String,
    pub spotify_status_url: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub max_payload_bytes: usize,
    pub allowed_origins: Vec<String>,
    pub allow_all_origins: bool,
    pub prompt_user: String,
    pub prompt_host: String,
    pub preferences_path: Option<PathBuf>,
    pub github_username: String,
    pub github_api_base_url: String,
    pub weather_base_url: String,
    pub widgets: WidgetEndpoints,
    pub widgets_enabled: bool,
    pub http_timeout: Duration,
    pub max_sessions: usize,
    pub session_idle: Duration,
    pub display_utc_offset_minutes: i32,
    pub low_end_mode: LowEndMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            allowed_origins: vec![],
            allow_all_origins: false,
            prompt_user: "guest".to_string(),
            prompt_host: "piotrunius.bio".to_string(),
            preferences_path: None,
            github_username: "Piotrunius".to_string(),
            github_api_base_url: "https://api.github.com".to_string(),
            weather_base_url: "https://wttr.in".to_string(),
            widgets: WidgetEndpoints {
                github_stats_url: "https://github-api.piotrunius.workers.dev/".to_string(),
                github_stats_fallback_url: "https://piotrunius.github.io/data/github-stats.json"
                    .to_string(),
                steam_status_url: "https://steam-api.piotrunius.workers.dev/".to_string(),
                lanyard_base_url: "https://api.lanyard.rest/v1/users".to_string(),
                discord_user_id: String::new(),
                roblox_status_url: "https://roblox-api.piotrunius.workers.dev/".to_string(),
                spotify_status_url: "https://spotify-api.piotrunius.workers.dev/".to_string(),
            },
            widgets_enabled: true,
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECONDS),
            display_utc_offset_minutes: DEFAULT_DISPLAY_UTC_OFFSET_MINUTES,
            low_end_mode: LowEndMode::Auto,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        let port = parse_port("PORT", DEFAULT_PORT)?;
        let max_payload_bytes = parse_positive("MAX_PAYLOAD_BYTES", DEFAULT_MAX_PAYLOAD_BYTES)?;
        let http_timeout_ms = parse_positive("HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS as usize)?;
        let max_sessions = parse_positive("MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?;
        let session_idle_seconds =
            parse_positive("SESSION_IDLE_SECONDS", DEFAULT_SESSION_IDLE_SECONDS as usize)?;
        let display_utc_offset_minutes =
            parse_offset("DISPLAY_UTC_OFFSET_MINUTES", DEFAULT_DISPLAY_UTC_OFFSET_MINUTES)?;

        let allowed_origins = parse_list(&env::var("CORS_ALLOW_ORIGIN").unwrap_or_default());
        let allow_all_origins = env::var("ALLOW_ALL_ORIGINS")
            .unwrap_or_default()
            .eq_ignore_ascii_case("true");
        let allow_all_origins =
            allow_all_origins && allowed_origins.iter().any(|origin| origin == "*");

        if !allow_all_origins && allowed_origins.is_empty() {
            return Err(ConfigError::Message(
                "CORS_ALLOW_ORIGIN must include at least one allowed origin (or set ALLOW_ALL_ORIGINS=true with \"*\")"
                    .to_string(),
            ));
        }

        let preferences_path = env::var("PREFERENCES_PATH")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        let low_end_mode = match env::var("LOW_END_DEVICE")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "" | "auto" => LowEndMode::Auto,
            "true" | "1" | "yes" => LowEndMode::Forced,
            "false" | "0" | "no" => LowEndMode::Disabled,
            other => {
                return Err(ConfigError::Message(format!(
                    "LOW_END_DEVICE must be auto, true or false; got {other}"
                )));
            }
        };

        let widgets = WidgetEndpoints {
            github_stats_url: env_or("GITHUB_STATS_URL", &defaults.widgets.github_stats_url),
            github_stats_fallback_url: env_or(
                "GITHUB_STATS_FALLBACK_URL",
                &defaults.widgets.github_stats_fallback_url,
            ),
            steam_status_url: env_or("STEAM_STATUS_URL", &defaults.widgets.steam_status_url),
            lanyard_base_url: env_or("LANYARD_BASE_URL", &defaults.widgets.lanyard_base_url),
            discord_user_id: env_or("DISCORD_USER_ID", &defaults.widgets.discord_user_id),
            roblox_status_url: env_or("ROBLOX_STATUS_URL", &defaults.widgets.roblox_status_url),
            spotify_status_url: env_or("SPOTIFY_STATUS_URL", &defaults.widgets.spotify_status_url),
        };
        for (name, value) in [
            ("GITHUB_STATS_URL", &widgets.github_stats_url),
            ("STEAM_STATUS_URL", &widgets.steam_status_url),
            ("LANYARD_BASE_URL", &widgets.lanyard_base_url),
            ("ROBLOX_STATUS_URL", &widgets.roblox_status_url),
            ("SPOTIFY_STATUS_URL", &widgets.spotify_status_url),
        ] {
            validate_url(name, value)?;
        }

        let github_api_base_url = env_or("GITHUB_API_BASE_URL", &defaults.github_api_base_url);
        validate_url("GITHUB_API_BASE_URL", &github_api_base_url)?;
        let weather_base_url = env_or("WEATHER_BASE_URL", &defaults.weather_base_url);
        validate_url("WEATHER_BASE_URL", &weather_base_url)?;

        Ok(Self {
            port,
            max_payload_bytes,
            allowed_origins,
            allow_all_origins,
            prompt_user: env_or("PROMPT_USER", &defaults.prompt_user),
            prompt_host: env_or("PROMPT_HOST", &defaults.prompt_host),
            preferences_path,
            github_username: env_or("GITHUB_USERNAME", &defaults.github_username),
            github_api_base_url,
            weather_base_url,
            widgets,
            widgets_enabled: !env::var("WIDGETS_ENABLED")
                .unwrap_or_default()
                .eq_ignore_ascii_case("false"),
            http_timeout: Duration::from_millis(http_timeout_ms as u64),
            max_sessions,
            session_idle: Duration::from_secs(session_idle_seconds as u64),
            display_utc_offset_minutes,
            low_end_mode,
        })
    }
}

fn env_or(name: &str, fallback: &str) -> String {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn parse_port(name: &str, fallback: u16) -> Result<u16> {
    match env::var(name) {
        Ok(value) => {
            let parsed = value.trim().parse::<u16>().unwrap_or(0);
            if parsed == 0 {
                Err(ConfigError::Message(format!("{name} must be greater than zero")))
            } else {
                Ok(parsed)
            }
        }
        Err(_) => Ok(fallback),
    }
}

fn parse_positive(name: &str, fallback: usize) -> Result<usize> {
    match env::var(name) {
        Ok(value) => {
            let parsed = value.trim().parse::<usize>().unwrap_or(0);
            if parsed == 0 {
                Err(ConfigError::Message(format!("{name} must be greater than zero")))
            } else {
                Ok(parsed)
            }
        }
        Err(_) => Ok(fallback),
    }
}

fn parse_offset(name: &str, fallback: i32) -> Result<i32> {
    match env::var(name) {
        Ok(value) => match value.trim().parse::<i32>() {
            Ok(parsed) if (-18 * 60..=18 * 60).contains(&parsed) => Ok(parsed),
            _ => Err(ConfigError::Message(format!(
                "{name} must be a whole number of minutes between -1080 and 1080"
            ))),
        },
        Err(_) => Ok(fallback),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

fn validate_url(name: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|_| ConfigError::Message(format!("{name} must be a valid URL; got {value}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Message(format!(
            "{name} must use http or https; got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_origin_lists() {
        assert_eq!(
            parse_list(" https://a.test, ,https://b.test "),
            vec!["https://a.test".to_string(), "https://b.test".to_string()]
        );
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(validate_url("X", "ftp://example.com").is_err());
        assert!(validate_url("X", "not a url").is_err());
        assert!(validate_url("X", "https://wttr.in").is_ok());
    }

    #[test]
    fn defaults_are_usable_without_environment() {
        let config = Config::default();
        assert_eq!(config.prompt_user, "guest");
        assert_eq!(config.low_end_mode, LowEndMode::Auto);
        assert!(config.preferences_path.is_none());
    }
}
