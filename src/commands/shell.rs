use super::{CommandContext, CommandRegistry, hidden, sync, usage_warning};
use crate::date::now_string;
use crate::output::{Effect, OutputLine};
use crate::parser::parse_assignment;
use crate::prefs::{MAX_OPACITY, MIN_OPACITY, PreferenceChange, Theme, clamp_opacity};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use sysinfo::System;

static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("variable regex should compile")
});

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(sync(
        "help",
        "help [command]",
        "List commands or describe one",
        "fa-circle-question",
        help,
    ));
    registry.register(sync("clear", "clear", "Clear the terminal", "fa-broom", clear));
    registry.register(sync(
        "echo",
        "echo [text]",
        "Print text, expanding $VARS",
        "fa-comment",
        echo,
    ));
    registry.register(sync(
        "pwd",
        "pwd",
        "Print the working directory",
        "fa-location-dot",
        pwd,
    ));
    registry.register(sync(
        "whoami",
        "whoami",
        "Print the current user",
        "fa-user",
        whoami,
    ));
    registry.register(sync(
        "date",
        "date",
        "Show the current date and time",
        "fa-calendar",
        date,
    ));
    registry.register(sync(
        "uname",
        "uname [-a|-r|-m|-s]",
        "Print system information",
        "fa-microchip",
        uname,
    ));
    registry.register(sync(
        "history",
        "history [clear]",
        "Show command history",
        "fa-clock-rotate-left",
        history,
    ));
    registry.register(sync(
        "alias",
        "alias [name=\"command\"]",
        "List or define aliases",
        "fa-link",
        alias,
    ));
    registry.register(sync(
        "unalias",
        "unalias <name>",
        "Remove an alias",
        "fa-link-slash",
        unalias,
    ));
    registry.register(sync(
        "export",
        "export NAME=value",
        "Set an environment variable",
        "fa-dollar-sign",
        export,
    ));
    registry.register(sync("env", "env", "List environment variables", "fa-list", env));
    registry.register(sync(
        "theme",
        "theme [dark|light|toggle]",
        "Show or switch the colour theme",
        "fa-palette",
        theme,
    ));
    registry.register(sync(
        "opacity",
        "opacity [0.1-1.0]",
        "Show or set terminal opacity",
        "fa-droplet",
        opacity,
    ));
    registry.register(sync(
        "notice",
        "notice [dismiss|reset]",
        "Show or dismiss the work-in-progress notice",
        "fa-triangle-exclamation",
        notice,
    ));
    registry.register(sync(
        "exit",
        "exit",
        "Leave root mode or close the terminal",
        "fa-door-open",
        exit,
    ));
    registry.register(hidden(sync(
        "sudo",
        "sudo <command>",
        "Become root, sort of",
        "fa-user-shield",
        sudo,
    )));
    registry.register(hidden(sync("su", "su", "Switch to root", "fa-user-shield", su)));
}

fn help(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let registry = &ctx.services.registry;
    if let Some(name) = args.first() {
        let name = name.to_lowercase();
        return match registry.get(&name).filter(|command| !command.hidden) {
            Some(command) => vec![
                OutputLine::accent(command.name),
                OutputLine::plain(format!("  {}", command.description)),
                OutputLine::muted(format!("  usage: {}", command.usage)),
            ],
            None => vec![OutputLine::error(format!("help: no such command: {name}"))],
        };
    }
    let width = registry
        .visible()
        .map(|command| command.usage.len())
        .max()
        .unwrap_or(0);
    let mut lines = vec![OutputLine::accent("Available commands:")];
    lines.extend(registry.visible().map(|command| {
        OutputLine::plain(format!("  {:<width$}  {}", command.usage, command.description))
    }));
    lines.push(OutputLine::muted(
        "Tab completes, ↑/↓ walk history. Some commands are not listed...",
    ));
    lines
}

fn clear(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    ctx.effect(Effect::Clear);
    vec![]
}

fn echo(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let text = args.join(" ");
    vec![OutputLine::plain(expand_vars(&text, &ctx.state.env))]
}

/// Replaces `$NAME` and `${NAME}`; unknown names expand to nothing.
pub(crate) fn expand_vars(text: &str, env: &std::collections::BTreeMap<String, String>) -> String {
    VAR_REGEX
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            env.get(name).cloned().unwrap_or_default()
        })
        .into_owned()
}

fn pwd(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    let home = if ctx.state.root {
        "/root".to_string()
    } else {
        format!("/home/{}", ctx.services.config.prompt_user)
    };
    let display = match ctx.state.cwd.strip_prefix('~') {
        Some(rest) => format!("{home}{rest}"),
        None => ctx.state.cwd.clone(),
    };
    vec![OutputLine::plain(display)]
}

fn whoami(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    let user = ctx.state.user(&ctx.services.config.prompt_user).to_string();
    vec![OutputLine::plain(user)]
}

fn date(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    vec![OutputLine::plain(now_string(ctx.services.offset))]
}

fn uname(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let kernel_name = System::name().unwrap_or_else(|| "Linux".to_string());
    let release = System::kernel_version().unwrap_or_else(|| "unknown".to_string());
    let machine = std::env::consts::ARCH.to_string();
    let flag = args.first().map(String::as_str).unwrap_or("-s");
    let line = match flag {
        "-a" => format!(
            "{} {} {} {}",
            kernel_name, ctx.services.config.prompt_host, release, machine
        ),
        "-r" => release,
        "-m" => machine,
        "-s" => kernel_name,
        other => return vec![OutputLine::warning(format!("uname: invalid option '{other}'"))],
    };
    vec![OutputLine::plain(line)]
}

fn history(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    if args.first().is_some_and(|arg| arg == "clear") {
        ctx.state.history = Default::default();
        return vec![OutputLine::success("History cleared.")];
    }
    ctx.state
        .history
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| OutputLine::plain(format!("{:>4}  {entry}", index + 1)))
        .collect()
}

fn alias(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    if args.is_empty() {
        if ctx.state.aliases.is_empty() {
            return vec![OutputLine::muted("No aliases defined.")];
        }
        return ctx
            .state
            .aliases
            .iter()
            .map(|(name, expansion)| OutputLine::plain(format!("alias {name}='{expansion}'")))
            .collect();
    }
    let Some((name, expansion)) = parse_assignment(args) else {
        let name = args[0].to_lowercase();
        return match ctx.state.aliases.get(&name) {
            Some(expansion) => vec![OutputLine::plain(format!("alias {name}='{expansion}'"))],
            None => vec![usage_warning("alias", "alias name=\"command\"")],
        };
    };
    let name = name.to_lowercase();
    if expansion.trim().is_empty() {
        return vec![OutputLine::warning(format!("alias: empty expansion for '{name}'"))];
    }
    ctx.state.aliases.insert(name.clone(), expansion.clone());
    vec![OutputLine::success(format!("alias {name}='{expansion}'"))]
}

fn unalias(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let Some(name) = args.first() else {
        return vec![usage_warning("unalias", "unalias <name>")];
    };
    let name = name.to_lowercase();
    match ctx.state.aliases.remove(&name) {
        Some(_) => vec![OutputLine::success(format!("Removed alias '{name}'."))],
        None => vec![OutputLine::error(format!("unalias: {name}: not found"))],
    }
}

fn export(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    if args.is_empty() {
        return env(ctx, args);
    }
    let Some((name, value)) = parse_assignment(args) else {
        return vec![usage_warning("export", "export NAME=value")];
    };
    let valid = name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if !valid {
        return vec![OutputLine::error(format!("export: '{name}': not a valid identifier"))];
    }
    let value = expand_vars(&value, &ctx.state.env);
    ctx.state.env.insert(name, value);
    vec![]
}

fn env(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    ctx.state
        .env
        .iter()
        .map(|(name, value)| OutputLine::plain(format!("{name}={value}")))
        .collect()
}

fn theme(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let current = ctx.state.prefs.theme;
    let next = match args.first().map(|arg| arg.to_ascii_lowercase()) {
        None => {
            return vec![OutputLine::plain(format!("Current theme: {}", current.as_str()))];
        }
        Some(arg) if arg == "toggle" => current.toggled(),
        Some(arg) => match Theme::parse(&arg) {
            Some(theme) => theme,
            None => return vec![usage_warning("theme", "theme [dark|light|toggle]")],
        },
    };
    ctx.state.set_pref(PreferenceChange::Theme(next));
    ctx.effect(Effect::Theme {
        theme: next.as_str().to_string(),
    });
    vec![OutputLine::success(format!("Theme set to {}.", next.as_str()))]
}

fn opacity(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let Some(raw) = args.first() else {
        return vec![OutputLine::plain(format!(
            "Terminal opacity: {:.2}",
            ctx.state.prefs.terminal_opacity
        ))];
    };
    let Ok(value) = raw.parse::<f32>() else {
        return vec![OutputLine::warning(format!(
            "opacity: '{raw}' is not a number between {MIN_OPACITY} and {MAX_OPACITY}"
        ))];
    };
    if !value.is_finite() {
        return vec![OutputLine::warning(format!("opacity: '{raw}' is not a number"))];
    }
    let value = clamp_opacity(value);
    ctx.state.set_pref(PreferenceChange::Opacity(value));
    ctx.effect(Effect::Opacity { value });
    vec![OutputLine::success(format!("Terminal opacity set to {value:.2}."))]
}

fn notice(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    match args.first().map(String::as_str) {
        None => {
            let state = if ctx.state.prefs.wip_notice_dismissed {
                "dismissed"
            } else {
                "shown"
            };
            vec![OutputLine::plain(format!("Work-in-progress notice: {state}"))]
        }
        Some("dismiss") => {
            ctx.state.set_pref(PreferenceChange::NoticeDismissed(true));
            vec![OutputLine::success("Notice dismissed.")]
        }
        Some("reset") => {
            ctx.state.set_pref(PreferenceChange::NoticeDismissed(false));
            vec![OutputLine::success("Notice will be shown again.")]
        }
        Some(_) => vec![usage_warning("notice", "notice [dismiss|reset]")],
    }
}

fn exit(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    if ctx.state.root {
        ctx.state.root = false;
        let user = ctx.services.config.prompt_user.clone();
        ctx.state.env.insert("USER".to_string(), user);
        return vec![OutputLine::muted("logout")];
    }
    ctx.effect(Effect::CloseTerminal);
    vec![OutputLine::muted("Goodbye!")]
}

fn sudo(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    match args.first().map(String::as_str) {
        None => vec![usage_warning("sudo", "sudo <command>")],
        Some("su") | Some("-i") | Some("-s") => su(ctx, &[]),
        Some("rm") => vec![
            OutputLine::error("Nice try. This filesystem is read-only."),
            OutputLine::muted("This incident will be reported."),
        ],
        Some(_) if ctx.state.root => {
            vec![OutputLine::muted("You are already root. With great power...")]
        }
        Some(_) => vec![
            OutputLine::error(format!(
                "[sudo] password for {}: ",
                ctx.services.config.prompt_user
            )),
            OutputLine::error(format!(
                "{} is not in the sudoers file. This incident will be reported.",
                ctx.services.config.prompt_user
            )),
        ],
    }
}

fn su(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    if ctx.state.root {
        return vec![OutputLine::muted("Already root.")];
    }
    ctx.state.root = true;
    ctx.state.env.insert("USER".to_string(), "root".to_string());
    vec![
        OutputLine::warning("You are now root. Please don't break anything."),
        OutputLine::muted("Type `exit` to go back."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn variables_expand_in_both_forms() {
        let env = BTreeMap::from([("USER".to_string(), "guest".to_string())]);
        assert_eq!(expand_vars("hi $USER, ${USER}!", &env), "hi guest, guest!");
        assert_eq!(expand_vars("$MISSING-x", &env), "-x");
        assert_eq!(expand_vars("costs $5", &env), "costs $5");
    }
}
