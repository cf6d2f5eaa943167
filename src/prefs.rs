use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

pub const MIN_OPACITY: f32 = 0.1;
pub const MAX_OPACITY: f32 = 1.0;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write preferences: {0}")]
    Write(#[source] std::io::Error),
    #[error("invalid preferences file: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }
}

/// Client-side flags, stored under the same keys the page used in `localStorage`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(
        rename = "wip-notice-dismissed",
        default,
        with = "string_bool"
    )]
    pub wip_notice_dismissed: bool,
    #[serde(rename = "terminalOpacity", default = "default_opacity", with = "string_f32")]
    pub terminal_opacity: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            wip_notice_dismissed: false,
            terminal_opacity: default_opacity(),
        }
    }
}

fn default_opacity() -> f32 {
    0.95
}

pub fn clamp_opacity(value: f32) -> f32 {
    value.clamp(MIN_OPACITY, MAX_OPACITY)
}

/// One changed key; stores merge these instead of whole documents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PreferenceChange {
    Theme(Theme),
    NoticeDismissed(bool),
    Opacity(f32),
}

impl Preferences {
    pub fn apply(&mut self, change: PreferenceChange) {
        match change {
            PreferenceChange::Theme(theme) => self.theme = theme,
            PreferenceChange::NoticeDismissed(dismissed) => self.wip_notice_dismissed = dismissed,
            PreferenceChange::Opacity(value) => self.terminal_opacity = clamp_opacity(value),
        }
    }
}

type ClientPreferences = BTreeMap<String, Preferences>;

/// Preferences per client id, the way each browser kept its own
/// `localStorage`. Backed by a JSON file when a path is configured,
/// otherwise held in memory. Updates are serialised by one lock.
#[derive(Clone, Debug, Default)]
pub struct PreferencesStore {
    path: Option<PathBuf>,
    memory: Arc<Mutex<ClientPreferences>>,
}

impl PreferencesStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            memory: Arc::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn read_all(
        &self,
        memory: &ClientPreferences,
    ) -> Result<ClientPreferences, PreferencesError> {
        let Some(path) = &self.path else {
            return Ok(memory.clone());
        };
        match tokio::fs::read_to_string(path).await {
            Ok(content) if content.trim().is_empty() => Ok(ClientPreferences::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Ok(ClientPreferences::new())
            }
            Err(error) => Err(PreferencesError::Read(error)),
        }
    }

    async fn write_all(&self, clients: &ClientPreferences) -> Result<(), PreferencesError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(PreferencesError::Write)?;
            }
        }
        let body = serde_json::to_string_pretty(clients)?;
        tokio::fs::write(path, body)
            .await
            .map_err(PreferencesError::Write)
    }

    /// Validates the backing file; returns how many clients it holds.
    pub async fn check(&self) -> Result<usize, PreferencesError> {
        let memory = self.memory.lock().await;
        Ok(self.read_all(&memory).await?.len())
    }

    /// Preferences of one client, defaults when it has none stored.
    pub async fn load(&self, client: &str) -> Result<Preferences, PreferencesError> {
        let memory = self.memory.lock().await;
        let mut prefs = self
            .read_all(&memory)
            .await?
            .remove(client)
            .unwrap_or_default();
        prefs.terminal_opacity = clamp_opacity(prefs.terminal_opacity);
        Ok(prefs)
    }

    /// Merges changed keys into the stored entry of one client and
    /// returns the result. Keys not named in `changes` keep their
    /// stored value.
    pub async fn update(
        &self,
        client: &str,
        changes: &[PreferenceChange],
    ) -> Result<Preferences, PreferencesError> {
        let mut memory = self.memory.lock().await;
        let mut clients = self.read_all(&memory).await?;
        let prefs = clients.entry(client.to_string()).or_default();
        for change in changes {
            prefs.apply(*change);
        }
        let updated = prefs.clone();
        if self.path.is_some() {
            self.write_all(&clients).await?;
        } else {
            *memory = clients;
        }
        Ok(updated)
    }
}

mod string_bool {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "true" } else { "false" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match raw {
            serde_json::Value::Bool(value) => value,
            serde_json::Value::String(value) => value == "true",
            _ => false,
        })
    }
}

mod string_f32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match raw {
            serde_json::Value::Number(value) => value.as_f64().unwrap_or(0.95) as f32,
            serde_json::Value::String(value) => value.trim().parse().unwrap_or(0.95),
            _ => 0.95,
        })
    }
}
