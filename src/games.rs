//! Ephemeral per-session mini-game state.

use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

pub const GUESS_MIN: u32 = 1;
pub const GUESS_MAX: u32 = 100;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TodoItem {
    pub text: String,
    pub done: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TodoList {
    items: Vec<TodoItem>,
}

impl TodoList {
    pub fn add(&mut self, text: &str) -> usize {
        self.items.push(TodoItem {
            text: text.to_string(),
            done: false,
        });
        self.items.len()
    }

    /// Marks the 1-based entry done and returns its text.
    pub fn complete(&mut self, number: usize) -> Option<&str> {
        let item = self.items.get_mut(number.checked_sub(1)?)?;
        item.done = true;
        Some(item.text.as_str())
    }

    pub fn remove(&mut self, number: usize) -> Option<TodoItem> {
        let index = number.checked_sub(1)?;
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }
}

#[derive(Clone, Debug, Default)]
pub struct Stopwatch {
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl Stopwatch {
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Returns false when it was already running.
    pub fn start(&mut self) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(Instant::now());
        true
    }

    pub fn stop(&mut self) -> Option<Duration> {
        let started_at = self.started_at.take()?;
        self.accumulated += started_at.elapsed();
        Some(self.accumulated)
    }

    pub fn elapsed(&self) -> Duration {
        self.accumulated
            + self
                .started_at
                .map(|started_at| started_at.elapsed())
                .unwrap_or_default()
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let minutes = total_ms / 60_000;
    let seconds = (total_ms / 1000) % 60;
    let centis = (total_ms % 1000) / 10;
    format!("{minutes:02}:{seconds:02}.{centis:02}")
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GuessOutcome {
    Started,
    TooLow { attempts: u32 },
    TooHigh { attempts: u32 },
    Correct { attempts: u32, target: u32 },
}

#[derive(Clone, Debug, Default)]
pub struct GuessGame {
    target: Option<u32>,
    attempts: u32,
}

impl GuessGame {
    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    pub fn start(&mut self, rng: &mut impl Rng) {
        self.target = Some(rng.random_range(GUESS_MIN..=GUESS_MAX));
        self.attempts = 0;
    }

    /// The first guess of a game only picks the target; it is not judged.
    pub fn guess(&mut self, value: u32, rng: &mut impl Rng) -> GuessOutcome {
        let Some(target) = self.target else {
            self.start(rng);
            return GuessOutcome::Started;
        };
        self.attempts += 1;
        let attempts = self.attempts;
        if value < target {
            GuessOutcome::TooLow { attempts }
        } else if value > target {
            GuessOutcome::TooHigh { attempts }
        } else {
            self.target = None;
            self.attempts = 0;
            GuessOutcome::Correct { attempts, target }
        }
    }

    pub fn give_up(&mut self) -> Option<u32> {
        self.attempts = 0;
        self.target.take()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn symbol(self) -> char {
        match self {
            Mark::X => 'X',
            Mark::O => 'O',
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TicTacToeOutcome {
    Ongoing { computer_move: usize },
    PlayerWins,
    ComputerWins { computer_move: usize },
    Draw,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MoveError {
    OutOfRange,
    Occupied,
    GameOver,
}

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Player is X, the computer answers as O.
#[derive(Clone, Debug, Default)]
pub struct TicTacToe {
    cells: [Option<Mark>; 9],
    finished: bool,
}

impl TicTacToe {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Plays the 1-based `position` for the player, then the computer's reply.
    pub fn play(&mut self, position: usize) -> Result<TicTacToeOutcome, MoveError> {
        if self.finished {
            return Err(MoveError::GameOver);
        }
        let index = position
            .checked_sub(1)
            .filter(|index| *index < 9)
            .ok_or(MoveError::OutOfRange)?;
        if self.cells[index].is_some() {
            return Err(MoveError::Occupied);
        }
        self.cells[index] = Some(Mark::X);
        if self.winner() == Some(Mark::X) {
            self.finished = true;
            return Ok(TicTacToeOutcome::PlayerWins);
        }
        let Some(reply) = self.computer_move() else {
            self.finished = true;
            return Ok(TicTacToeOutcome::Draw);
        };
        self.cells[reply] = Some(Mark::O);
        if self.winner() == Some(Mark::O) {
            self.finished = true;
            return Ok(TicTacToeOutcome::ComputerWins {
                computer_move: reply + 1,
            });
        }
        if self.cells.iter().all(Option::is_some) {
            self.finished = true;
            return Ok(TicTacToeOutcome::Draw);
        }
        Ok(TicTacToeOutcome::Ongoing {
            computer_move: reply + 1,
        })
    }

    pub fn winner(&self) -> Option<Mark> {
        LINES.iter().find_map(|[a, b, c]| match (self.cells[*a], self.cells[*b], self.cells[*c]) {
            (Some(x), Some(y), Some(z)) if x == y && y == z => Some(x),
            _ => None,
        })
    }

    /// Win if possible, otherwise block, otherwise centre, corners, edges.
    fn computer_move(&self) -> Option<usize> {
        self.completing_move(Mark::O)
            .or_else(|| self.completing_move(Mark::X))
            .or_else(|| {
                [4, 0, 2, 6, 8, 1, 3, 5, 7]
                    .into_iter()
                    .find(|index| self.cells[*index].is_none())
            })
    }

    fn completing_move(&self, mark: Mark) -> Option<usize> {
        LINES.iter().find_map(|line| {
            let owned = line.iter().filter(|i| self.cells[**i] == Some(mark)).count();
            let empty: Vec<usize> = line
                .iter()
                .copied()
                .filter(|i| self.cells[*i].is_none())
                .collect();
            (owned == 2 && empty.len() == 1).then(|| empty[0])
        })
    }

    pub fn render(&self) -> Vec<String> {
        let cell = |index: usize| {
            self.cells[index]
                .map(Mark::symbol)
                .unwrap_or_else(|| char::from(b'1' + index as u8))
        };
        let mut rows = Vec::with_capacity(5);
        for row in 0..3 {
            let base = row * 3;
            rows.push(format!(" {} | {} | {} ", cell(base), cell(base + 1), cell(base + 2)));
            if row < 2 {
                rows.push("---+---+---".to_string());
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn todo_numbers_are_one_based() {
        let mut todo = TodoList::default();
        todo.add("ship it");
        todo.add("write tests");
        assert_eq!(todo.complete(2), Some("write tests"));
        assert_eq!(todo.complete(0), None);
        assert_eq!(todo.remove(1).map(|item| item.text), Some("ship it".to_string()));
        assert_eq!(todo.items().len(), 1);
        assert!(todo.items()[0].done);
    }

    #[test]
    fn first_guess_only_starts_the_game() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut game = GuessGame::default();
        assert_eq!(game.guess(50, &mut rng), GuessOutcome::Started);
        assert!(game.is_active());
    }

    #[test]
    fn binary_search_always_finds_the_target() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut game = GuessGame::default();
        game.guess(50, &mut rng);
        let (mut low, mut high) = (GUESS_MIN, GUESS_MAX);
        loop {
            let mid = (low + high) / 2;
            match game.guess(mid, &mut rng) {
                GuessOutcome::TooLow { .. } => low = mid + 1,
                GuessOutcome::TooHigh { .. } => high = mid - 1,
                GuessOutcome::Correct { attempts, target } => {
                    assert_eq!(target, mid);
                    assert!(attempts <= 7);
                    break;
                }
                GuessOutcome::Started => panic!("game restarted unexpectedly"),
            }
        }
        assert!(!game.is_active());
    }

    #[test]
    fn computer_blocks_an_open_line() {
        let mut board = TicTacToe::default();
        assert_eq!(board.play(1), Ok(TicTacToeOutcome::Ongoing { computer_move: 5 }));
        assert_eq!(board.play(2), Ok(TicTacToeOutcome::Ongoing { computer_move: 3 }));
        assert_eq!(board.play(2), Err(MoveError::Occupied));
        assert_eq!(board.play(10), Err(MoveError::OutOfRange));
    }

    #[test]
    fn computer_takes_a_winning_move() {
        let mut board = TicTacToe::default();
        board.play(1).unwrap();
        board.play(9).unwrap();
        // O holds 3 and 5, so it wins on 7 before blocking 1-4-7.
        let outcome = board.play(4).unwrap();
        assert_eq!(outcome, TicTacToeOutcome::ComputerWins { computer_move: 7 });
        assert!(board.is_finished());
        assert_eq!(board.play(2), Err(MoveError::GameOver));
    }

    #[test]
    fn renders_free_cells_as_numbers() {
        let board = TicTacToe::default();
        assert_eq!(board.render()[0], " 1 | 2 | 3 ");
    }

    #[tokio::test(start_paused = true)]
    async fn stopwatch_accumulates_across_runs() {
        let mut watch = Stopwatch::default();
        assert!(watch.start());
        assert!(!watch.start());
        tokio::time::advance(Duration::from_millis(1500)).await;
        watch.stop();
        tokio::time::advance(Duration::from_secs(10)).await;
        watch.start();
        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(format_elapsed(watch.elapsed()), "00:02.00");
    }
}
