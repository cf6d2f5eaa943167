use super::{CommandContext, CommandRegistry, sync, usage_warning};
use crate::output::{Effect, LineStyle, OutputLine, escape_html, lines_of};
use crate::profile::{SetupItem, Social};
use crate::vfs::FsNode;
use std::time::Duration;

const NEOFETCH_LOGO: [&str; 7] = [
    "   ____  _        ",
    "  |  _ \\(_) ___   ",
    "  | |_) | |/ _ \\  ",
    "  |  __/| | (_) | ",
    "  |_|   |_|\\___/  ",
    "                  ",
    "                  ",
];

const SETUP_USAGE: &str = "setup [pc|gear|open <item>]";
const AUDIO_USAGE: &str = "audio [play|pause|toggle]";

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(sync(
        "about",
        "about",
        "Who is behind this page",
        "fa-id-card",
        about,
    ));
    registry.register(sync(
        "socials",
        "socials",
        "List social links",
        "fa-share-nodes",
        socials,
    ));
    registry.register(sync(
        "open",
        "open <social>",
        "Open a social link",
        "fa-arrow-up-right-from-square",
        open,
    ));
    registry.register(sync(
        "setup",
        SETUP_USAGE,
        "Show my hardware",
        "fa-desktop",
        setup,
    ));
    registry.register(sync(
        "music",
        "music",
        "Show the background track",
        "fa-music",
        music,
    ));
    registry.register(sync(
        "audio",
        AUDIO_USAGE,
        "Play or pause the background track",
        "fa-play",
        audio,
    ));
    registry.register(sync(
        "neofetch",
        "neofetch",
        "System summary with a logo",
        "fa-terminal",
        neofetch,
    ));
}

fn about(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    let mut lines = match ctx.services.fs.resolve("about.txt") {
        Some(FsNode::File(content)) => lines_of(content),
        _ => vec![OutputLine::plain(ctx.services.profile.bio)],
    };
    lines.push(OutputLine::muted("Type `socials` to find me elsewhere."));
    lines
}

fn social_row(social: &Social) -> OutputLine {
    let family = if social.is_brand_icon() { "fa-brands" } else { "fa-solid" };
    OutputLine {
        text: format!(
            "<i class=\"{family} fa-{icon}\" style=\"color:{color}\"></i> {label:<10} <a href=\"{url}\" target=\"_blank\" rel=\"noreferrer\">{url}</a>",
            icon = escape_html(social.icon),
            color = escape_html(social.color),
            label = escape_html(social.label),
            url = escape_html(social.url),
        ),
        style: LineStyle::Plain,
        is_html: true,
    }
}

fn socials(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    let mut lines: Vec<OutputLine> = ctx.services.profile.socials.iter().map(social_row).collect();
    lines.push(OutputLine::muted("Use `open <name>` to visit one."));
    lines
}

fn open(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let Some(query) = args.first() else {
        return vec![usage_warning("open", "open <social>")];
    };
    let Some(social) = ctx.services.profile.find_social(query) else {
        return vec![OutputLine::error(format!(
            "open: unknown link '{query}'. Try `socials`."
        ))];
    };
    ctx.effect(Effect::OpenUrl {
        url: social.url.to_string(),
    });
    vec![OutputLine::success(format!("Opening {}...", social.label))]
}

fn setup_lines(title: &str, items: &[SetupItem]) -> Vec<OutputLine> {
    let mut lines = vec![OutputLine::accent(title)];
    for item in items {
        lines.push(OutputLine::plain(format!("  {:<12} {}", item.label, item.value)));
    }
    lines
}

fn setup(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let profile = &ctx.services.profile;
    match args.first().map(|arg| arg.to_ascii_lowercase()).as_deref() {
        None => {
            let mut lines = setup_lines("PC", &profile.pc);
            lines.push(OutputLine::plain(""));
            lines.extend(setup_lines("Gear", &profile.gear));
            lines.push(OutputLine::muted("Use `setup open <item>` to look one up."));
            lines
        }
        Some("pc") => setup_lines("PC", &profile.pc),
        Some("gear") => setup_lines("Gear", &profile.gear),
        Some("open") if args.len() > 1 => open_setup_item(ctx, &args[1..].join(" ")),
        Some(_) => vec![usage_warning("setup", SETUP_USAGE)],
    }
}

/// Opens every link of one setup entry.
fn open_setup_item(ctx: &mut CommandContext<'_>, query: &str) -> Vec<OutputLine> {
    let services = ctx.services;
    let Some(item) = services.profile.find_setup_item(query) else {
        return vec![OutputLine::error(format!("setup: no item called '{query}'"))];
    };
    for url in item.urls {
        ctx.effect(Effect::OpenUrl {
            url: url.to_string(),
        });
    }
    let noun = if item.urls.len() == 1 { "link" } else { "links" };
    vec![OutputLine::success(format!(
        "Opening {} {noun} for {}...",
        item.urls.len(),
        item.label
    ))]
}

fn music(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    let track = &ctx.services.profile.music;
    vec![
        OutputLine::accent(format!("♪ {} - {}", track.title, track.artist)),
        OutputLine::link("Listen on Pixabay", track.url),
    ]
}

fn audio(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let services = ctx.services;
    let track = &services.profile.music;
    let playing = match args.first().map(|arg| arg.to_ascii_lowercase()).as_deref() {
        None => {
            let state = if ctx.state.audio_playing { "playing" } else { "paused" };
            return vec![OutputLine::plain(format!(
                "Audio: {state} ({} - {})",
                track.title, track.artist
            ))];
        }
        Some("play") => true,
        Some("pause") => false,
        Some("toggle") => !ctx.state.audio_playing,
        Some(_) => return vec![usage_warning("audio", AUDIO_USAGE)],
    };
    ctx.state.audio_playing = playing;
    let source = &services.profile.audio;
    ctx.effect(Effect::Audio {
        playing,
        src: source.src.to_string(),
        volume: source.volume,
    });
    if playing {
        vec![OutputLine::success(format!("▶ Playing {} - {}", track.title, track.artist))]
    } else {
        vec![OutputLine::muted("⏸ Paused.")]
    }
}

fn neofetch(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    let services = ctx.services;
    let profile = &services.profile;
    let user = ctx.state.user(&services.config.prompt_user);
    let title = format!("{user}@{}", services.config.prompt_host);
    let part = |label: &str| {
        profile
            .pc
            .iter()
            .find(|item| item.label == label)
            .map(|item| item.value)
            .unwrap_or("unknown")
    };
    let info = [
        title.clone(),
        "-".repeat(title.chars().count()),
        "OS: Bazzite (Fedora Atomic)".to_string(),
        format!("Location: {}", profile.location),
        "Shell: biosh".to_string(),
        format!("Uptime: {}", format_uptime(ctx.state.started_at.elapsed())),
        format!("Theme: {}", ctx.state.prefs.theme.as_str()),
        format!("CPU: {}", part("CPU")),
        format!("GPU: {}", part("GPU")),
        format!("Memory: {}", part("RAM")),
    ];
    let rows = NEOFETCH_LOGO.len().max(info.len());
    (0..rows)
        .map(|row| {
            let logo = NEOFETCH_LOGO.get(row).copied().unwrap_or("                  ");
            let text = info.get(row).map(String::as_str).unwrap_or("");
            if row == 0 {
                OutputLine::accent(format!("{logo}{text}"))
            } else {
                OutputLine::plain(format!("{logo}{text}"))
            }
        })
        .collect()
}

fn format_uptime(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Profile;
    use pretty_assertions::assert_eq;

    #[test]
    fn social_rows_escape_and_pick_the_icon_family() {
        let profile = Profile::default();
        let row = social_row(&profile.socials[0]);
        assert!(row.is_html);
        assert!(row.text.contains("fa-brands fa-github"));
        let bio = social_row(profile.find_social("bio").unwrap());
        assert!(bio.text.contains("fa-solid fa-file"));
    }

    #[test]
    fn uptime_is_compact() {
        assert_eq!(format_uptime(Duration::from_secs(5)), "5s");
        assert_eq!(format_uptime(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_uptime(Duration::from_secs(7260)), "2h 1m");
    }
}
