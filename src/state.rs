use crate::games::{GuessGame, Stopwatch, TicTacToe, TodoList};
use crate::history::CommandHistory;
use crate::konami::KonamiTracker;
use crate::prefs::{PreferenceChange, Preferences};
use crate::vfs::HOME;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use tokio::time::Instant;

/// Everything one terminal session owns. Reset when the session is dropped.
#[derive(Debug)]
pub struct SessionState {
    pub cwd: String,
    pub root: bool,
    pub history: CommandHistory,
    pub aliases: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
    pub todo: TodoList,
    pub stopwatch: Stopwatch,
    pub guess: GuessGame,
    pub ttt: TicTacToe,
    pub konami: KonamiTracker,
    /// Whether the background track is playing; the visualizer needs it.
    pub audio_playing: bool,
    pub rng: StdRng,
    pub prefs: Preferences,
    /// Keys changed by handlers, persisted and drained by the dispatcher.
    pub pending_prefs: Vec<PreferenceChange>,
    pub started_at: Instant,
}

impl SessionState {
    pub fn new(user: &str, prefs: Preferences, rng: StdRng) -> Self {
        Self {
            cwd: HOME.to_string(),
            root: false,
            history: CommandHistory::default(),
            aliases: default_aliases(),
            env: default_env(user),
            todo: TodoList::default(),
            stopwatch: Stopwatch::default(),
            guess: GuessGame::default(),
            ttt: TicTacToe::default(),
            konami: KonamiTracker::default(),
            audio_playing: false,
            rng,
            prefs,
            pending_prefs: Vec::new(),
            started_at: Instant::now(),
        }
    }

    #[cfg(test)]
    pub(crate) fn seeded(user: &str, seed: u64) -> Self {
        use rand::SeedableRng;
        Self::new(user, Preferences::default(), StdRng::seed_from_u64(seed))
    }

    pub fn user<'a>(&self, configured: &'a str) -> &'a str {
        if self.root { "root" } else { configured }
    }

    pub fn prompt(&self, user: &str, host: &str) -> String {
        let symbol = if self.root { '#' } else { '$' };
        format!("{}@{}:{}{}", self.user(user), host, self.cwd, symbol)
    }

    pub fn set_pref(&mut self, change: PreferenceChange) {
        self.prefs.apply(change);
        self.pending_prefs.push(change);
    }

    pub fn take_pref_changes(&mut self) -> Vec<PreferenceChange> {
        std::mem::take(&mut self.pending_prefs)
    }
}

fn default_aliases() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("ll".to_string(), "ls -la".to_string()),
        ("cls".to_string(), "clear".to_string()),
    ])
}

fn default_env(user: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("USER".to_string(), user.to_string()),
        ("HOME".to_string(), HOME.to_string()),
        ("SHELL".to_string(), "/bin/biosh".to_string()),
        ("TERM".to_string(), "xterm-256color".to_string()),
        ("EDITOR".to_string(), "nvim".to_string()),
        ("PATH".to_string(), "/usr/local/bin:/usr/bin:/bin".to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::Theme;
    use pretty_assertions::assert_eq;

    #[test]
    fn prompt_reflects_root_mode_and_path() {
        let mut state = SessionState::seeded("guest", 1);
        assert_eq!(state.prompt("guest", "host"), "guest@host:~$");
        state.root = true;
        state.cwd = "~/projects".to_string();
        assert_eq!(state.prompt("guest", "host"), "root@host:~/projects#");
    }

    #[test]
    fn pref_changes_apply_and_drain_once() {
        let mut state = SessionState::seeded("guest", 1);
        assert!(state.take_pref_changes().is_empty());
        state.set_pref(PreferenceChange::Theme(Theme::Light));
        assert_eq!(state.prefs.theme, Theme::Light);
        assert_eq!(
            state.take_pref_changes(),
            vec![PreferenceChange::Theme(Theme::Light)]
        );
        assert!(state.take_pref_changes().is_empty());
    }
}
