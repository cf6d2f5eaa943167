use super::{AsyncContext, CommandContext, CommandRegistry, asynchronous, hidden, sync};
use crate::effects::{ParticleField, visualizer_ascii};
use crate::output::{Effect, OutputLine};
use crate::scheduler::{PlayOutcome, Sequence, play};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use rand::Rng;
use rand::seq::IndexedRandom;

const MATRIX_SECONDS: u64 = 5;
const COWSAY_WIDTH: usize = 40;
const VISUALIZER_BINS: usize = 32;
const VISUALIZER_ROWS: usize = 8;

const FORTUNES: &[&str] = &[
    "There is no place like 127.0.0.1.",
    "It works on my machine.",
    "A clean desk is a sign of a cluttered desk drawer.",
    "Today's bug is tomorrow's feature.",
    "You will find a missing semicolon in your future.",
    "Real programmers count from 0.",
    "The cake is a lie.",
    "Have you tried turning it off and on again?",
];

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(hidden(asynchronous(
        "hack",
        "hack [target]",
        "Totally real hacking",
        "fa-user-secret",
        hack,
    )));
    registry.register(hidden(sync(
        "rm",
        "rm <path>",
        "Remove files (not really)",
        "fa-trash",
        rm,
    )));
    registry.register(hidden(sync(
        "cowsay",
        "cowsay <text>",
        "A cow says things",
        "fa-cow",
        cowsay,
    )));
    registry.register(hidden(sync(
        "fortune",
        "fortune",
        "A fortune cookie",
        "fa-cookie",
        fortune,
    )));
    registry.register(hidden(sync(
        "matrix",
        "matrix",
        "Follow the white rabbit",
        "fa-code",
        matrix,
    )));
    registry.register(hidden(sync("konami", "konami", "A hint", "fa-gamepad", konami)));
    registry.register(hidden(sync("coffee", "coffee", "Brew some coffee", "fa-mug-hot", coffee)));
    registry.register(hidden(sync(
        "visualizer",
        "visualizer",
        "One frame of the audio visualizer",
        "fa-wave-square",
        visualizer,
    )));
    registry.register(hidden(sync(
        "particles",
        "particles",
        "One frame of the background particles",
        "fa-star",
        particles,
    )));
}

pub(crate) fn hack_sequence(target: &str) -> Sequence {
    Sequence::new()
        .then(300, OutputLine::muted(format!("Connecting to {target}...")))
        .then(600, OutputLine::plain("Bypassing firewall... [##########] 100%"))
        .then(600, OutputLine::plain("Decrypting passwords... hunter2"))
        .then(800, OutputLine::plain("Downloading the internet... 1 of 1 files"))
        .then(700, OutputLine::warning("Uploading virus.exe... just kidding"))
}

fn hack(ctx: AsyncContext, args: Vec<String>) -> BoxFuture<'static, Vec<OutputLine>> {
    async move {
        let target = args.first().cloned().unwrap_or_else(|| "mainframe".to_string());
        let sequence = hack_sequence(&target);
        match play(&sequence, &ctx.scrollback, &ctx.interrupt).await {
            PlayOutcome::Completed => vec![
                OutputLine::success("ACCESS GRANTED"),
                OutputLine::muted("(Nothing was hacked. Please don't call the police.)"),
            ],
            PlayOutcome::Interrupted { .. } => vec![OutputLine::warning("^C hack aborted")],
        }
    }
    .boxed()
}

fn rm(_ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let dangerous = args.iter().any(|arg| arg.starts_with("-rf") || arg.starts_with("-fr"))
        && args.iter().any(|arg| arg == "/" || arg == "/*" || arg == "~");
    if dangerous {
        return vec![
            OutputLine::error("Deleting everything..."),
            OutputLine::muted("Just kidding. This filesystem is read-only."),
        ];
    }
    let target = args.iter().find(|arg| !arg.starts_with('-'));
    match target {
        Some(target) => vec![OutputLine::error(format!(
            "rm: cannot remove '{target}': Read-only file system"
        ))],
        None => vec![OutputLine::warning("rm: missing operand")],
    }
}

/// Greedy word wrap used by the speech bubble.
fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub(crate) fn cowsay_lines(text: &str) -> Vec<String> {
    let text = if text.trim().is_empty() { "Moo." } else { text };
    let wrapped = wrap_words(text, COWSAY_WIDTH);
    let width = wrapped.iter().map(|line| line.chars().count()).max().unwrap_or(0);
    let mut lines = vec![format!(" {}", "_".repeat(width + 2))];
    if wrapped.len() == 1 {
        lines.push(format!("< {} >", wrapped[0]));
    } else {
        let last = wrapped.len() - 1;
        for (index, line) in wrapped.iter().enumerate() {
            let (open, close) = match index {
                0 => ('/', '\\'),
                i if i == last => ('\\', '/'),
                _ => ('|', '|'),
            };
            lines.push(format!("{open} {line:<width$} {close}"));
        }
    }
    lines.push(format!(" {}", "-".repeat(width + 2)));
    lines.extend(
        [
            r"        \   ^__^",
            r"         \  (oo)\_______",
            r"            (__)\       )\/\",
            r"                ||----w |",
            r"                ||     ||",
        ]
        .map(str::to_string),
    );
    lines
}

fn cowsay(_ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    cowsay_lines(&args.join(" "))
        .into_iter()
        .map(OutputLine::plain)
        .collect()
}

fn fortune(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    let line = FORTUNES
        .choose(&mut ctx.state.rng)
        .copied()
        .unwrap_or("Reply hazy, try again.");
    vec![OutputLine::accent(line)]
}

fn matrix(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    ctx.effect(Effect::Matrix {
        seconds: MATRIX_SECONDS,
    });
    vec![OutputLine::success("Wake up, Neo...")]
}

fn konami(_ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    vec![
        OutputLine::muted("↑ ↑ ↓ ↓ ← → ← → B A"),
        OutputLine::muted("Try it anywhere on the page."),
    ]
}

fn coffee(_ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    vec![
        OutputLine::error("Error 418: I'm a teapot."),
        OutputLine::muted("Brewing coffee is not supported by this device."),
    ]
}

fn visualizer(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    if !ctx.state.audio_playing {
        return vec![OutputLine::muted(
            "visualizer: nothing is playing. Start the track with `audio play`.",
        )];
    }
    let rng = &mut ctx.state.rng;
    // Louder bass, quieter highs, like a real spectrum.
    let bins: Vec<u8> = (0..VISUALIZER_BINS)
        .map(|bin| {
            let ceiling = 255 - (bin * 150 / VISUALIZER_BINS) as u8;
            rng.random_range(0..=ceiling)
        })
        .collect();
    visualizer_ascii(&bins, VISUALIZER_ROWS)
        .into_iter()
        .map(OutputLine::accent)
        .collect()
}

fn particles(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    let (cols, rows) = (48, 10);
    let (width, height) = (cols as f32 * 20.0, rows as f32 * 40.0);
    let count = ParticleField::particle_count(width, height, ctx.services.device.low_end);
    let mut field = ParticleField::new(width, height, count, &mut ctx.state.rng);
    field.step(1.0);
    field
        .render_ascii(cols, rows)
        .into_iter()
        .map(OutputLine::muted)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cowsay_wraps_long_text() {
        let short = cowsay_lines("hi");
        assert_eq!(short[0], " ____");
        assert_eq!(short[1], "< hi >");

        let long = cowsay_lines(&"moo ".repeat(20));
        assert!(long[1].starts_with("/ "));
        assert!(long.iter().any(|line| line.starts_with("\\ ")));
    }

    #[test]
    fn empty_cowsay_still_moos() {
        assert_eq!(cowsay_lines("")[1], "< Moo. >");
    }

    #[test]
    fn hack_sequence_names_the_target() {
        let sequence = hack_sequence("nasa");
        assert_eq!(sequence.steps()[0].line.text, "Connecting to nasa...");
        assert_eq!(sequence.total_duration().as_millis(), 3000);
    }
}
