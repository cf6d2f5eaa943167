//! One terminal session: prompt, echo, history, dispatch, completion and the
//! scrollback the frontend renders.

use crate::commands::{AsyncContext, CommandContext, CommandRegistry, Handler};
use crate::config::Config;
use crate::date::display_offset;
use crate::effects::DeviceProfile;
use crate::history::HistoryDirection;
use crate::logger::Logger;
use crate::net::JsonSource;
use crate::output::{Effect, LineStyle, OutputLine};
use crate::parser::{parse_invocation, tokenize};
use crate::prefs::{PreferenceChange, Preferences, PreferencesStore};
use crate::profile::Profile;
use crate::scheduler::{Interrupt, Scrollback, ScrollbackEntry};
use crate::state::SessionState;
use crate::vfs::{FsNode, VirtualFs, join_path};
use crate::widgets::WidgetBoard;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use time::UtcOffset;

/// Read-only pieces shared by every session.
pub struct TerminalServices {
    pub registry: CommandRegistry,
    pub fs: VirtualFs,
    pub profile: Profile,
    pub config: Arc<Config>,
    pub source: Arc<dyn JsonSource>,
    pub widgets: Option<WidgetBoard>,
    pub device: DeviceProfile,
    pub offset: UtcOffset,
    pub logger: Logger,
}

impl TerminalServices {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn JsonSource>,
        widgets: Option<WidgetBoard>,
        device: DeviceProfile,
        logger: Logger,
    ) -> Self {
        let profile = Profile::default();
        Self {
            registry: CommandRegistry::builtin(),
            fs: VirtualFs::seeded(&profile),
            profile,
            offset: display_offset(config.display_utc_offset_minutes),
            config,
            source,
            widgets,
            device,
            logger,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub echo: OutputLine,
    pub lines: Vec<OutputLine>,
    pub effects: Vec<Effect>,
    pub prompt: String,
    pub cwd: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Completion {
    /// Exactly one match; `input` is the filled line.
    Filled { input: String },
    /// Several matches, listed as a hint.
    Candidates { candidates: Vec<String>, hint: OutputLine },
    NoMatch,
}

#[derive(Clone)]
pub struct Terminal {
    services: Arc<TerminalServices>,
    state: Arc<Mutex<SessionState>>,
    scrollback: Scrollback,
    interrupt: Interrupt,
    prefs_store: PreferencesStore,
    client_id: Arc<str>,
}

impl Terminal {
    pub fn new(
        services: Arc<TerminalServices>,
        prefs_store: PreferencesStore,
        client_id: &str,
        prefs: Preferences,
        rng: StdRng,
    ) -> Self {
        let state = SessionState::new(&services.config.prompt_user, prefs, rng);
        Self {
            services,
            state: Arc::new(Mutex::new(state)),
            scrollback: Scrollback::default(),
            interrupt: Interrupt::default(),
            prefs_store,
            client_id: Arc::from(client_id),
        }
    }

    /// Key under which this visitor's preferences are stored.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn services(&self) -> &Arc<TerminalServices> {
        &self.services
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    pub fn prompt(&self) -> String {
        let config = &self.services.config;
        self.lock().prompt(&config.prompt_user, &config.prompt_host)
    }

    pub fn cwd(&self) -> String {
        self.lock().cwd.clone()
    }

    pub fn preferences(&self) -> Preferences {
        self.lock().prefs.clone()
    }

    /// Greeting printed when the session opens.
    pub fn banner(&self) -> Vec<OutputLine> {
        let dismissed = self.lock().prefs.wip_notice_dismissed;
        banner_lines(&self.services.profile, dismissed)
    }

    /// Prints the banner into an empty scrollback.
    pub fn greet(&self) -> Vec<OutputLine> {
        let banner = self.banner();
        self.scrollback.print_all(banner.clone());
        banner
    }

    /// Echoes, records and dispatches one submitted line.
    pub async fn submit(&self, input: &str) -> DispatchReport {
        let config = &self.services.config;
        let (echo, invocation) = {
            let mut state = self.lock();
            let prompt = state.prompt(&config.prompt_user, &config.prompt_host);
            let echo = OutputLine::new(format!("{prompt} {input}"), LineStyle::Prompt);
            state.history.push(input);
            (echo, parse_invocation(input, &state.aliases))
        };
        self.scrollback.print(echo.clone());

        let Some(invocation) = invocation else {
            return self.report(echo, vec![], vec![]);
        };

        let Some(command) = self.services.registry.get(&invocation.name) else {
            self.services.logger.debug(
                "command.not_found",
                json!({ "command": invocation.name }),
            );
            let lines = vec![OutputLine::error(format!(
                "Command not found: {}. Type \"help\" for available commands.",
                invocation.name
            ))];
            self.scrollback.print_all(lines.clone());
            return self.report(echo, lines, vec![]);
        };

        self.services.logger.debug(
            "command.dispatched",
            json!({
                "command": command.name,
                "alias": invocation.alias,
                "argc": invocation.args.len(),
            }),
        );

        let (lines, effects) = match command.handler {
            Handler::Sync(handler) => {
                let (lines, effects, changes) = {
                    let mut state = self.lock();
                    let mut ctx = CommandContext::new(&mut state, &self.services);
                    let lines = handler(&mut ctx, &invocation.args);
                    let effects = std::mem::take(&mut ctx.effects);
                    (lines, effects, state.take_pref_changes())
                };
                if !changes.is_empty() {
                    self.persist(&changes).await;
                }
                (lines, effects)
            }
            Handler::Async(handler) => {
                let ctx = AsyncContext {
                    services: self.services.clone(),
                    scrollback: self.scrollback.clone(),
                    interrupt: self.interrupt.clone(),
                };
                (handler(ctx, invocation.args).await, vec![])
            }
        };

        if effects.contains(&Effect::Clear) {
            self.scrollback.clear();
        }
        self.scrollback.print_all(lines.clone());
        self.report(echo, lines, effects)
    }

    fn report(
        &self,
        echo: OutputLine,
        lines: Vec<OutputLine>,
        effects: Vec<Effect>,
    ) -> DispatchReport {
        let config = &self.services.config;
        let state = self.lock();
        DispatchReport {
            echo,
            lines,
            effects,
            prompt: state.prompt(&config.prompt_user, &config.prompt_host),
            cwd: state.cwd.clone(),
        }
    }

    async fn persist(&self, changes: &[PreferenceChange]) {
        if let Err(error) = self.prefs_store.update(&self.client_id, changes).await {
            self.services.logger.warn(
                "preferences.save_failed",
                json!({ "clientId": &*self.client_id, "error": error.to_string() }),
            );
        }
    }

    pub fn recall(&self, direction: HistoryDirection) -> String {
        self.lock().history.recall(direction)
    }

    /// Tab completion against command names or the current directory.
    pub fn complete(&self, input: &str) -> Completion {
        let state = self.lock();
        let tokens = tokenize(input);
        let completing_name = tokens.len() <= 1 && !input.ends_with(char::is_whitespace);

        if completing_name {
            let partial = tokens.first().map(|token| token.to_lowercase()).unwrap_or_default();
            let mut candidates: Vec<String> = self
                .services
                .registry
                .visible_names()
                .into_iter()
                .chain(state.aliases.keys().cloned())
                .filter(|name| name.starts_with(&partial))
                .collect();
            candidates.sort();
            candidates.dedup();
            return choose(candidates, |single| format!("{single} "));
        }

        let last = if input.ends_with(char::is_whitespace) {
            ""
        } else {
            input.rsplit(char::is_whitespace).next().unwrap_or("")
        };
        let head = &input[..input.len() - last.len()];
        let (dir_part, name_part) = match last.rfind('/') {
            Some(index) => (&last[..=index], &last[index + 1..]),
            None => ("", last),
        };
        let dir_path = if dir_part.is_empty() {
            state.cwd.clone()
        } else {
            join_path(&state.cwd, dir_part)
        };
        let Some(FsNode::Dir(children)) = self.services.fs.resolve(&dir_path) else {
            return Completion::NoMatch;
        };
        let candidates: Vec<String> = children
            .keys()
            .filter(|name| name.starts_with(name_part))
            .filter(|name| name_part.starts_with('.') || !name.starts_with('.'))
            .cloned()
            .collect();
        choose(candidates, |single| format!("{head}{dir_part}{single} "))
    }

    /// Feeds one keydown to the Konami tracker.
    pub fn press_key(&self, key: &str) -> Option<Effect> {
        if !self.lock().konami.press(key) {
            return None;
        }
        self.services.logger.info("konami.activated", json!({}));
        self.scrollback
            .print(OutputLine::success("↑↑↓↓←→←→BA: Konami code activated!"));
        Some(Effect::Konami)
    }

    /// Stops every running timed sequence in this session.
    pub fn interrupt(&self) {
        self.interrupt.trigger();
        self.scrollback.print(OutputLine::muted("^C"));
    }

    pub fn scrollback_since(&self, seq: u64) -> Vec<ScrollbackEntry> {
        self.scrollback.since(seq)
    }
}

pub fn banner_lines(profile: &Profile, notice_dismissed: bool) -> Vec<OutputLine> {
    let mut lines = vec![
        OutputLine::accent(format!("Welcome to {}'s terminal.", profile.name)),
        OutputLine::muted("Type `help` to see what you can do here."),
    ];
    if !notice_dismissed {
        lines.push(OutputLine::warning(
            "This page is a work in progress. Hide this with `notice dismiss`.",
        ));
    }
    lines
}

fn choose(candidates: Vec<String>, fill: impl Fn(&str) -> String) -> Completion {
    match candidates.len() {
        0 => Completion::NoMatch,
        1 => Completion::Filled {
            input: fill(&candidates[0]),
        },
        _ => Completion::Candidates {
            hint: OutputLine::muted(candidates.join("  ")),
            candidates,
        },
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{terminal, terminal_with};
    use super::*;
    use crate::net::testing::CannedSource;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn texts(lines: &[OutputLine]) -> Vec<String> {
        lines.iter().map(|line| line.text.clone()).collect()
    }

    #[tokio::test]
    async fn echo_strips_quotes_and_keeps_arguments() {
        let terminal = terminal();
        let report = terminal.submit("echo \"hello world\" again").await;
        assert_eq!(report.echo.text, "guest@piotrunius.bio:~$ echo \"hello world\" again");
        assert_eq!(texts(&report.lines), vec!["hello world again"]);
    }

    #[tokio::test]
    async fn unknown_commands_yield_one_error_and_only_touch_history() {
        let terminal = terminal();
        let before = terminal.cwd();
        let report = terminal.submit("frobnicate now").await;
        assert_eq!(report.lines.len(), 1);
        assert!(report.lines[0].is_error());
        assert_eq!(
            report.lines[0].text,
            "Command not found: frobnicate. Type \"help\" for available commands."
        );
        assert_eq!(terminal.cwd(), before);
        assert_eq!(terminal.recall(HistoryDirection::Previous), "frobnicate now");
    }

    #[tokio::test]
    async fn command_names_are_case_insensitive() {
        let terminal = terminal();
        let report = terminal.submit("PWD").await;
        assert_eq!(texts(&report.lines), vec!["/home/guest"]);
    }

    #[tokio::test]
    async fn history_recall_walks_back_and_forward() {
        let terminal = terminal();
        for line in ["x1", "x2", "x3"] {
            terminal.submit(line).await;
        }
        let recalled = [
            terminal.recall(HistoryDirection::Previous),
            terminal.recall(HistoryDirection::Previous),
            terminal.recall(HistoryDirection::Previous),
            terminal.recall(HistoryDirection::Next),
        ];
        assert_eq!(recalled, ["x3", "x2", "x1", "x2"].map(String::from));
    }

    #[tokio::test]
    async fn cd_then_parent_returns_to_the_start() {
        let terminal = terminal();
        for dir in ["projects", "setup", "music", "socials"] {
            terminal.submit(&format!("cd {dir}")).await;
            assert_eq!(terminal.cwd(), format!("~/{dir}"));
            terminal.submit("cd ..").await;
            assert_eq!(terminal.cwd(), "~");
        }
        let report = terminal.submit("cd about.txt").await;
        assert!(report.lines[0].is_error());
        assert_eq!(terminal.cwd(), "~");
    }

    #[tokio::test]
    async fn aliases_expand_once() {
        let terminal = terminal();
        terminal.submit("alias ll=\"ls -la\"").await;
        let aliased = terminal.submit("ll projects").await;
        let direct = terminal.submit("ls -la projects").await;
        assert_eq!(texts(&aliased.lines), texts(&direct.lines));
        assert!(aliased.lines.iter().any(|line| line.text.ends_with(".wip")));

        terminal.submit("alias loop=loop").await;
        let report = terminal.submit("loop").await;
        assert_eq!(
            report.lines[0].text,
            "Command not found: loop. Type \"help\" for available commands."
        );
    }

    #[tokio::test]
    async fn cat_prints_one_line_per_segment() {
        let terminal = terminal();
        let report = terminal.submit("cat about.txt").await;
        let Some(FsNode::File(content)) = terminal.services().fs.resolve("about.txt") else {
            panic!("about.txt should be seeded");
        };
        let expected: Vec<String> = content.split('\n').map(str::to_string).collect();
        assert_eq!(texts(&report.lines), expected);
    }

    #[tokio::test]
    async fn first_guess_starts_the_game() {
        let terminal = terminal();
        let report = terminal.submit("guess 50").await;
        assert_eq!(
            texts(&report.lines),
            vec!["I'm thinking of a number between 1 and 100. Make a guess!"]
        );
        let report = terminal.submit("guess 50").await;
        assert!(!report.lines[0].text.starts_with("I'm thinking"));
    }

    #[tokio::test]
    async fn clear_empties_the_scrollback() {
        let terminal = terminal();
        terminal.submit("echo one").await;
        let report = terminal.submit("clear").await;
        assert_eq!(report.effects, vec![Effect::Clear]);
        assert!(terminal.scrollback().is_empty());
    }

    #[tokio::test]
    async fn theme_changes_emit_an_effect() {
        let terminal = terminal();
        let report = terminal.submit("theme toggle").await;
        assert_eq!(
            report.effects,
            vec![Effect::Theme {
                theme: "light".to_string()
            }]
        );
        assert_eq!(terminal.preferences().theme.as_str(), "light");
    }

    #[tokio::test]
    async fn su_switches_the_prompt_to_root() {
        let terminal = terminal();
        let report = terminal.submit("su").await;
        assert_eq!(report.prompt, "root@piotrunius.bio:~#");
        let report = terminal.submit("exit").await;
        assert_eq!(report.prompt, "guest@piotrunius.bio:~$");
        assert!(report.effects.is_empty());
    }

    #[tokio::test]
    async fn weather_uses_the_json_source() {
        let source = CannedSource::default().with(
            "https://wttr.in/Berlin",
            json!({ "current_condition": [{ "temp_C": "20", "weatherDesc": [{ "value": "Sunny" }] }] }),
        );
        let terminal = terminal_with(source);
        let report = terminal.submit("weather Berlin").await;
        assert_eq!(report.lines[0].text, "Weather for Berlin");
        assert_eq!(report.lines[1].text, "  Sunny");

        let report = terminal.submit("weather Nowhere").await;
        assert_eq!(report.lines.len(), 1);
        assert!(report.lines[0].is_error());
    }

    #[tokio::test]
    async fn widget_failures_become_lines() {
        let terminal = terminal();
        let report = terminal.submit("steam").await;
        assert_eq!(texts(&report.lines), vec!["steam: could not fetch data right now"]);
    }

    #[tokio::test(start_paused = true)]
    async fn hack_runs_to_completion_on_virtual_time() {
        let terminal = terminal();
        let report = terminal.submit("hack").await;
        assert_eq!(report.lines[0].text, "ACCESS GRANTED");
        let printed = texts(
            &terminal
                .scrollback_since(0)
                .into_iter()
                .map(|entry| entry.line)
                .collect::<Vec<_>>(),
        );
        assert!(printed.contains(&"Connecting to mainframe...".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_stops_a_running_hack() {
        let terminal = terminal();
        let running = {
            let terminal = terminal.clone();
            tokio::spawn(async move { terminal.submit("hack").await })
        };
        tokio::time::sleep(Duration::from_millis(1000)).await;
        terminal.interrupt();
        let report = running.await.unwrap();
        assert_eq!(texts(&report.lines), vec!["^C hack aborted"]);
        let printed: Vec<String> = terminal
            .scrollback_since(0)
            .into_iter()
            .map(|entry| entry.line.text)
            .collect();
        assert!(printed.contains(&"Connecting to mainframe...".to_string()));
        assert!(!printed.iter().any(|text| text.starts_with("Downloading")));
    }

    #[test]
    fn completion_fills_unique_command_names() {
        let terminal = terminal();
        assert_eq!(
            terminal.complete("neo"),
            Completion::Filled {
                input: "neofetch ".to_string()
            }
        );
        assert!(matches!(terminal.complete("s"), Completion::Candidates { .. }));
        assert_eq!(terminal.complete("zzz"), Completion::NoMatch);
    }

    #[test]
    fn completion_lists_directory_children() {
        let terminal = terminal();
        assert_eq!(
            terminal.complete("cat ab"),
            Completion::Filled {
                input: "cat about.txt ".to_string()
            }
        );
        assert_eq!(
            terminal.complete("cat projects/REA"),
            Completion::Filled {
                input: "cat projects/README.md ".to_string()
            }
        );
        assert_eq!(
            terminal.complete("cat .se"),
            Completion::Filled {
                input: "cat .secret ".to_string()
            }
        );
    }

    #[tokio::test]
    async fn tic_tac_toe_reports_the_computer_win() {
        let terminal = terminal();
        for cell in ["1", "9"] {
            let report = terminal.submit(&format!("ttt {cell}")).await;
            assert_eq!(report.lines.last().unwrap().style, LineStyle::Muted);
        }
        let report = terminal.submit("ttt 4").await;
        let last = report.lines.last().unwrap();
        assert_eq!(last.text, "Computer played 7 and wins.");
        assert!(last.is_error());

        let report = terminal.submit("ttt 2").await;
        assert_eq!(
            texts(&report.lines),
            vec!["ttt: game over, start again with `ttt reset`"]
        );
    }

    #[tokio::test]
    async fn setup_open_launches_every_link_of_an_item() {
        let terminal = terminal();
        let report = terminal.submit("setup open storage").await;
        assert_eq!(texts(&report.lines), vec!["Opening 2 links for Storage..."]);
        assert_eq!(report.effects.len(), 2);
        assert!(report.effects.iter().all(|effect| matches!(effect, Effect::OpenUrl { .. })));

        let report = terminal.submit("setup open toaster").await;
        assert_eq!(texts(&report.lines), vec!["setup: no item called 'toaster'"]);
        assert!(report.effects.is_empty());
    }

    #[tokio::test]
    async fn visualizer_follows_the_audio_state() {
        let terminal = terminal();
        let report = terminal.submit("visualizer").await;
        assert_eq!(
            texts(&report.lines),
            vec!["visualizer: nothing is playing. Start the track with `audio play`."]
        );

        let report = terminal.submit("audio play").await;
        assert!(matches!(
            report.effects.as_slice(),
            [Effect::Audio { playing: true, volume, .. }] if (*volume - 0.4).abs() < f32::EPSILON
        ));
        let report = terminal.submit("visualizer").await;
        assert_eq!(report.lines.len(), 8);
        assert!(report.lines.iter().all(|line| line.style == LineStyle::Accent));

        terminal.submit("audio toggle").await;
        let report = terminal.submit("audio").await;
        assert_eq!(
            texts(&report.lines),
            vec!["Audio: paused (Smoking Alone - BackDrop)"]
        );
    }

    #[test]
    fn konami_code_emits_an_effect() {
        let terminal = terminal();
        let keys = [
            "ArrowUp", "ArrowUp", "ArrowDown", "ArrowDown", "ArrowLeft", "ArrowRight",
            "ArrowLeft", "ArrowRight", "b",
        ];
        for key in keys {
            assert_eq!(terminal.press_key(key), None);
        }
        assert_eq!(terminal.press_key("a"), Some(Effect::Konami));
    }
}
