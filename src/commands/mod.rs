//! Command table: name → tagged handler descriptor.

mod files;
mod fun;
mod games;
mod profile;
mod shell;
mod status;

use crate::output::{Effect, OutputLine};
use crate::scheduler::{Interrupt, Scrollback};
use crate::state::SessionState;
use crate::terminal::TerminalServices;
use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs under the session lock with exclusive access to session state.
pub type SyncHandler = fn(&mut CommandContext<'_>, &[String]) -> Vec<OutputLine>;

/// Runs without the session lock; may await network calls or timers.
pub type AsyncHandler = fn(AsyncContext, Vec<String>) -> BoxFuture<'static, Vec<OutputLine>>;

#[derive(Clone, Copy)]
pub enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub icon: &'static str,
    pub hidden: bool,
    pub handler: Handler,
}

pub struct CommandContext<'a> {
    pub state: &'a mut SessionState,
    pub services: &'a TerminalServices,
    pub effects: Vec<Effect>,
}

impl<'a> CommandContext<'a> {
    pub fn new(state: &'a mut SessionState, services: &'a TerminalServices) -> Self {
        Self {
            state,
            services,
            effects: Vec::new(),
        }
    }

    pub fn effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }
}

#[derive(Clone)]
pub struct AsyncContext {
    pub services: Arc<TerminalServices>,
    pub scrollback: Scrollback,
    pub interrupt: Interrupt,
}

impl AsyncContext {
    /// Prints straight to the scrollback ahead of the handler's return value.
    pub fn print(&self, line: OutputLine) {
        self.scrollback.print(line);
    }
}

#[derive(Clone, Debug, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Command>,
}

impl CommandRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every built-in command.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        shell::register(&mut registry);
        files::register(&mut registry);
        profile::register(&mut registry);
        status::register(&mut registry);
        games::register(&mut registry);
        fun::register(&mut registry);
        registry
    }

    pub fn register(&mut self, command: Command) {
        self.commands.insert(command.name, command);
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn visible(&self) -> impl Iterator<Item = &Command> {
        self.commands.values().filter(|command| !command.hidden)
    }

    pub fn visible_names(&self) -> Vec<String> {
        self.visible().map(|command| command.name.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

pub(crate) fn sync(
    name: &'static str,
    usage: &'static str,
    description: &'static str,
    icon: &'static str,
    handler: SyncHandler,
) -> Command {
    Command {
        name,
        description,
        usage,
        icon,
        hidden: false,
        handler: Handler::Sync(handler),
    }
}

pub(crate) fn asynchronous(
    name: &'static str,
    usage: &'static str,
    description: &'static str,
    icon: &'static str,
    handler: AsyncHandler,
) -> Command {
    Command {
        name,
        description,
        usage,
        icon,
        hidden: false,
        handler: Handler::Async(handler),
    }
}

pub(crate) fn hidden(mut command: Command) -> Command {
    command.hidden = true;
    command
}

pub(crate) fn usage_warning(command: &str, usage: &str) -> OutputLine {
    OutputLine::warning(format!("{command}: usage: {usage}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_the_core_commands() {
        let registry = CommandRegistry::builtin();
        for name in ["help", "cd", "ls", "cat", "tree", "alias", "guess", "weather", "hack"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(registry.get("hack").unwrap().hidden);
        assert!(!registry.visible_names().contains(&"hack".to_string()));
    }

    #[test]
    fn names_are_lowercase() {
        let registry = CommandRegistry::builtin();
        for command in registry.visible() {
            assert_eq!(command.name, command.name.to_lowercase());
        }
    }
}
