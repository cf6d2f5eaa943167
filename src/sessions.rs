use crate::prefs::PreferencesStore;
use crate::terminal::{Terminal, TerminalServices};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

const MAX_CLIENT_ID_LEN: usize = 64;

fn valid_client_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_CLIENT_ID_LEN
        && id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

struct SessionEntry {
    terminal: Terminal,
    last_seen: Instant,
}

/// Live terminals keyed by session id, capped and pruned when idle.
#[derive(Clone)]
pub struct SessionStore {
    services: Arc<TerminalServices>,
    prefs_store: PreferencesStore,
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    max_sessions: usize,
    idle: Duration,
}

impl SessionStore {
    pub fn new(services: Arc<TerminalServices>, prefs_store: PreferencesStore) -> Self {
        let max_sessions = services.config.max_sessions.max(1);
        let idle = services.config.session_idle;
        Self {
            services,
            prefs_store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_sessions,
            idle,
        }
    }

    pub fn services(&self) -> &Arc<TerminalServices> {
        &self.services
    }

    /// Opens a terminal with the client's stored preferences and prints its banner.
    /// An unknown or malformed client id gets a fresh one and default preferences.
    pub async fn create(&self, client_id: Option<&str>) -> (Uuid, Terminal) {
        let client = match client_id.filter(|id| valid_client_id(id)) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        let prefs = match self.prefs_store.load(&client).await {
            Ok(prefs) => prefs,
            Err(error) => {
                self.services.logger.warn(
                    "preferences.load_failed",
                    json!({ "clientId": client, "error": error.to_string() }),
                );
                Default::default()
            }
        };
        let terminal = Terminal::new(
            self.services.clone(),
            self.prefs_store.clone(),
            &client,
            prefs,
            StdRng::from_os_rng(),
        );
        terminal.greet();
        let id = Uuid::new_v4();

        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle);
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id)
            else {
                break;
            };
            sessions.remove(&oldest);
            self.services
                .logger
                .info("session.evicted", json!({ "sessionId": oldest.to_string() }));
        }
        sessions.insert(
            id,
            SessionEntry {
                terminal: terminal.clone(),
                last_seen: now,
            },
        );
        self.services.logger.info(
            "session.created",
            json!({ "sessionId": id.to_string(), "sessions": sessions.len() }),
        );
        (id, terminal)
    }

    /// Looks a session up and marks it as active.
    pub async fn get(&self, id: &Uuid) -> Option<Terminal> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(entry.terminal.clone())
    }

    /// Drops every session idle for longer than the configured window.
    pub async fn prune(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let now = Instant::now();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Background task pruning idle sessions once a minute.
    pub fn spawn_janitor(&self) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                ticker.tick().await;
                let removed = store.prune().await;
                if removed > 0 {
                    store
                        .services
                        .logger
                        .debug("session.pruned", json!({ "removed": removed }));
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, LowEndMode};
    use crate::effects::DeviceProfile;
    use crate::logger::{LogLevel, Logger};
    use crate::net::testing::CannedSource;
    use pretty_assertions::assert_eq;

    fn store(max_sessions: usize, idle: Duration) -> SessionStore {
        let config = Config {
            max_sessions,
            session_idle: idle,
            ..Config::default()
        };
        let services = TerminalServices::new(
            Arc::new(config),
            Arc::new(CannedSource::default()),
            None,
            DeviceProfile::from_capabilities(8, 0, LowEndMode::Disabled),
            Logger::new("test".into()).with_min_level(LogLevel::Error),
        );
        SessionStore::new(Arc::new(services), PreferencesStore::new(None))
    }

    #[tokio::test]
    async fn oldest_session_is_evicted_at_capacity() {
        let store = store(2, Duration::from_secs(600));
        let (first, _) = store.create(None).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (second, _) = store.create(None).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (third, _) = store.create(None).await;
        assert_eq!(store.len().await, 2);
        assert!(store.get(&first).await.is_none());
        assert!(store.get(&second).await.is_some());
        assert!(store.get(&third).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_pruned() {
        let store = store(10, Duration::from_secs(60));
        let (id, terminal) = store.create(None).await;
        assert!(!terminal.scrollback().is_empty());
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.prune().await, 1);
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn sessions_keep_a_valid_client_id() {
        let store = store(10, Duration::from_secs(600));
        let (_, kept) = store.create(Some("visitor_42-a")).await;
        assert_eq!(kept.client_id(), "visitor_42-a");

        let (_, replaced) = store.create(Some("../../etc/passwd")).await;
        assert!(Uuid::parse_str(replaced.client_id()).is_ok());
        let (_, fresh) = store.create(None).await;
        assert_ne!(fresh.client_id(), replaced.client_id());
    }

    #[tokio::test]
    async fn sessions_of_one_client_share_preferences() {
        let store = store(10, Duration::from_secs(600));
        let (_, first) = store.create(Some("shared")).await;
        first.submit("theme light").await;
        let (_, second) = store.create(Some("shared")).await;
        let report = second.submit("theme").await;
        assert_eq!(report.lines[0].text, "Current theme: light");

        let (_, other) = store.create(Some("someone-else")).await;
        let report = other.submit("theme").await;
        assert_eq!(report.lines[0].text, "Current theme: dark");
    }
}
