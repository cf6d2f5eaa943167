use super::{CommandContext, CommandRegistry, sync, usage_warning};
use crate::games::{
    GUESS_MAX, GUESS_MIN, GuessOutcome, MoveError, TicTacToeOutcome, format_elapsed,
};
use crate::output::OutputLine;
use rand::Rng;

const MAX_DIE_SIDES: u32 = 1000;

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(sync(
        "todo",
        "todo [add|list|done|rm|clear]",
        "A tiny todo list",
        "fa-list-check",
        todo,
    ));
    registry.register(sync(
        "stopwatch",
        "stopwatch [start|stop|status|reset]",
        "A stopwatch",
        "fa-stopwatch",
        stopwatch,
    ));
    registry.register(sync(
        "guess",
        "guess <1-100>",
        "Guess the number",
        "fa-dice",
        guess,
    ));
    registry.register(sync(
        "ttt",
        "ttt [1-9|reset]",
        "Tic-tac-toe against the computer",
        "fa-hashtag",
        ttt,
    ));
    registry.register(sync("coin", "coin", "Flip a coin", "fa-coins", coin));
    registry.register(sync("roll", "roll [sides]", "Roll a die", "fa-dice-six", roll));
}

fn parse_number(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok()
}

fn todo(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let list = &mut ctx.state.todo;
    let sub = args.first().map(|arg| arg.to_ascii_lowercase());
    match sub.as_deref() {
        None | Some("list") => {
            if list.items().is_empty() {
                return vec![OutputLine::muted("No tasks yet. Add one with `todo add <text>`.")];
            }
            list.items()
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let mark = if item.done { 'x' } else { ' ' };
                    let line = format!("{:>2}. [{mark}] {}", index + 1, item.text);
                    if item.done {
                        OutputLine::muted(line)
                    } else {
                        OutputLine::plain(line)
                    }
                })
                .collect()
        }
        Some("add") => {
            let text = args[1..].join(" ");
            if text.trim().is_empty() {
                return vec![usage_warning("todo", "todo add <text>")];
            }
            let number = list.add(text.trim());
            vec![OutputLine::success(format!("Added task #{number}."))]
        }
        Some("done") => match args.get(1).and_then(|raw| parse_number(raw)) {
            Some(number) => match list.complete(number) {
                Some(text) => vec![OutputLine::success(format!("Completed: {text}"))],
                None => vec![OutputLine::error(format!("todo: no task #{number}"))],
            },
            None => vec![usage_warning("todo", "todo done <number>")],
        },
        Some("rm") => match args.get(1).and_then(|raw| parse_number(raw)) {
            Some(number) => match list.remove(number) {
                Some(item) => vec![OutputLine::success(format!("Removed: {}", item.text))],
                None => vec![OutputLine::error(format!("todo: no task #{number}"))],
            },
            None => vec![usage_warning("todo", "todo rm <number>")],
        },
        Some("clear") => {
            list.clear();
            vec![OutputLine::success("Todo list cleared.")]
        }
        Some(_) => vec![usage_warning("todo", "todo [add|list|done|rm|clear]")],
    }
}

fn stopwatch(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let watch = &mut ctx.state.stopwatch;
    match args.first().map(|arg| arg.to_ascii_lowercase()).as_deref() {
        Some("start") => {
            if watch.start() {
                vec![OutputLine::success("Stopwatch started.")]
            } else {
                vec![OutputLine::warning("Stopwatch is already running.")]
            }
        }
        Some("stop") => match watch.stop() {
            Some(elapsed) => vec![OutputLine::success(format!(
                "Stopped at {}.",
                format_elapsed(elapsed)
            ))],
            None => vec![OutputLine::warning("Stopwatch is not running.")],
        },
        None | Some("status") => {
            let state = if watch.is_running() { "running" } else { "stopped" };
            vec![OutputLine::plain(format!(
                "{} ({state})",
                format_elapsed(watch.elapsed())
            ))]
        }
        Some("reset") => {
            watch.reset();
            vec![OutputLine::success("Stopwatch reset.")]
        }
        Some(_) => vec![usage_warning("stopwatch", "stopwatch [start|stop|status|reset]")],
    }
}

fn start_message() -> OutputLine {
    OutputLine::info(format!(
        "I'm thinking of a number between {GUESS_MIN} and {GUESS_MAX}. Make a guess!"
    ))
}

fn guess(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let state = &mut *ctx.state;
    let Some(raw) = args.first() else {
        if !state.guess.is_active() {
            state.guess.start(&mut state.rng);
            return vec![start_message()];
        }
        return vec![usage_warning("guess", "guess <1-100>")];
    };
    if matches!(raw.as_str(), "quit" | "giveup" | "reset") {
        return match state.guess.give_up() {
            Some(target) => vec![OutputLine::muted(format!("The number was {target}."))],
            None => vec![OutputLine::muted("No game in progress.")],
        };
    }
    let value = match raw.trim().parse::<u32>() {
        Ok(value) if (GUESS_MIN..=GUESS_MAX).contains(&value) => value,
        _ => {
            return vec![OutputLine::warning(format!(
                "guess: '{raw}' is not a number between {GUESS_MIN} and {GUESS_MAX}"
            ))];
        }
    };
    match state.guess.guess(value, &mut state.rng) {
        GuessOutcome::Started => vec![start_message()],
        GuessOutcome::TooLow { attempts } => vec![OutputLine::plain(format!(
            "{value} is too low. (attempt {attempts})"
        ))],
        GuessOutcome::TooHigh { attempts } => vec![OutputLine::plain(format!(
            "{value} is too high. (attempt {attempts})"
        ))],
        GuessOutcome::Correct { attempts, target } => vec![OutputLine::success(format!(
            "Correct! The number was {target}. You got it in {attempts} {}.",
            if attempts == 1 { "try" } else { "tries" }
        ))],
    }
}

fn board_lines(ctx: &CommandContext<'_>) -> Vec<OutputLine> {
    ctx.state.ttt.render().into_iter().map(OutputLine::plain).collect()
}

fn ttt(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let Some(raw) = args.first() else {
        let mut lines = board_lines(ctx);
        lines.push(OutputLine::muted("You are X. Play with `ttt <1-9>`."));
        return lines;
    };
    if raw.eq_ignore_ascii_case("reset") {
        ctx.state.ttt.reset();
        let mut lines = vec![OutputLine::success("New game.")];
        lines.extend(board_lines(ctx));
        return lines;
    }
    let Some(position) = parse_number(raw) else {
        return vec![usage_warning("ttt", "ttt [1-9|reset]")];
    };
    let outcome = match ctx.state.ttt.play(position) {
        Ok(outcome) => outcome,
        Err(MoveError::OutOfRange) => {
            return vec![OutputLine::warning("ttt: pick a cell from 1 to 9")];
        }
        Err(MoveError::Occupied) => {
            return vec![OutputLine::warning(format!("ttt: cell {position} is taken"))];
        }
        Err(MoveError::GameOver) => {
            return vec![OutputLine::warning("ttt: game over, start again with `ttt reset`")];
        }
    };
    let mut lines = board_lines(ctx);
    lines.push(match outcome {
        TicTacToeOutcome::Ongoing { computer_move } => {
            OutputLine::muted(format!("Computer played {computer_move}."))
        }
        TicTacToeOutcome::PlayerWins => OutputLine::success("You win!"),
        TicTacToeOutcome::ComputerWins { computer_move } => {
            OutputLine::error(format!("Computer played {computer_move} and wins."))
        }
        TicTacToeOutcome::Draw => OutputLine::info("Draw."),
    });
    lines
}

fn coin(ctx: &mut CommandContext<'_>, _args: &[String]) -> Vec<OutputLine> {
    let side = if ctx.state.rng.random_bool(0.5) { "Heads" } else { "Tails" };
    vec![OutputLine::plain(format!("🪙 {side}!"))]
}

fn roll(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let sides = match args.first() {
        None => 6,
        Some(raw) => match raw.parse::<u32>() {
            Ok(sides) if (2..=MAX_DIE_SIDES).contains(&sides) => sides,
            _ => {
                return vec![OutputLine::warning(format!(
                    "roll: sides must be a number from 2 to {MAX_DIE_SIDES}"
                ))];
            }
        },
    };
    let value = ctx.state.rng.random_range(1..=sides);
    vec![OutputLine::plain(format!("🎲 d{sides}: {value}"))]
}
