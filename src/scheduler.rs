//! Scrollback buffer and the timer that plays staged output.
//!
//! Staged sequences sleep on `tokio::time`, so tests running with paused time
//! fast-forward through them.

use crate::output::OutputLine;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

const DEFAULT_SCROLLBACK_LIMIT: usize = 1000;

#[derive(Clone, Debug, Serialize)]
pub struct ScrollbackEntry {
    pub seq: u64,
    #[serde(flatten)]
    pub line: OutputLine,
}

#[derive(Debug)]
struct ScrollbackInner {
    entries: VecDeque<ScrollbackEntry>,
    next_seq: u64,
    limit: usize,
}

/// Append-only scrollback shared by the dispatcher and running handlers.
#[derive(Clone, Debug)]
pub struct Scrollback {
    inner: Arc<Mutex<ScrollbackInner>>,
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::with_limit(DEFAULT_SCROLLBACK_LIMIT)
    }
}

impl Scrollback {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScrollbackInner {
                entries: VecDeque::new(),
                next_seq: 1,
                limit: limit.max(1),
            })),
        }
    }

    pub fn print(&self, line: OutputLine) -> u64 {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.push_back(ScrollbackEntry { seq, line });
        while inner.entries.len() > inner.limit {
            inner.entries.pop_front();
        }
        seq
    }

    pub fn print_all(&self, lines: impl IntoIterator<Item = OutputLine>) {
        for line in lines {
            self.print(line);
        }
    }

    /// Entries with a sequence number greater than `seq`.
    pub fn since(&self, seq: u64) -> Vec<ScrollbackEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.seq > seq)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_seq(&self) -> u64 {
        self.lock().next_seq - 1
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScrollbackInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Clone, Debug)]
pub struct Step {
    pub delay: Duration,
    pub line: OutputLine,
}

/// Ordered delayed lines, e.g. the fake "hacking" progress.
#[derive(Clone, Debug, Default)]
pub struct Sequence {
    steps: Vec<Step>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, delay_ms: u64, line: OutputLine) -> Self {
        self.steps.push(Step {
            delay: Duration::from_millis(delay_ms),
            line,
        });
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|step| step.delay).sum()
    }
}

/// Session-wide interrupt; bumping the generation stops every running sequence.
#[derive(Clone, Debug)]
pub struct Interrupt {
    sender: Arc<watch::Sender<u64>>,
}

impl Default for Interrupt {
    fn default() -> Self {
        let (sender, _receiver) = watch::channel(0);
        Self {
            sender: Arc::new(sender),
        }
    }
}

impl Interrupt {
    pub fn trigger(&self) {
        self.sender.send_modify(|generation| *generation += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sender.subscribe()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayOutcome {
    Completed,
    Interrupted { printed: usize },
}

/// Prints each step after its delay; stops early when interrupted.
pub async fn play(
    sequence: &Sequence,
    scrollback: &Scrollback,
    interrupt: &Interrupt,
) -> PlayOutcome {
    let mut receiver = interrupt.subscribe();
    receiver.mark_unchanged();
    for (printed, step) in sequence.steps().iter().enumerate() {
        tokio::select! {
            _ = tokio::time::sleep(step.delay) => {
                scrollback.print(step.line.clone());
            }
            _ = receiver.changed() => {
                return PlayOutcome::Interrupted { printed };
            }
        }
    }
    PlayOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scrollback_drops_oldest_past_the_limit() {
        let scrollback = Scrollback::with_limit(2);
        scrollback.print(OutputLine::plain("a"));
        scrollback.print(OutputLine::plain("b"));
        scrollback.print(OutputLine::plain("c"));
        let texts: Vec<String> = scrollback.since(0).into_iter().map(|e| e.line.text).collect();
        assert_eq!(texts, vec!["b", "c"]);
        assert_eq!(scrollback.last_seq(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn plays_every_step_in_virtual_time() {
        let scrollback = Scrollback::default();
        let sequence = Sequence::new()
            .then(500, OutputLine::plain("one"))
            .then(1500, OutputLine::plain("two"));
        let started = tokio::time::Instant::now();
        let outcome = play(&sequence, &scrollback, &Interrupt::default()).await;
        assert_eq!(outcome, PlayOutcome::Completed);
        assert!(started.elapsed() >= sequence.total_duration());
        assert_eq!(scrollback.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_stops_before_the_next_line() {
        let scrollback = Scrollback::default();
        let interrupt = Interrupt::default();
        let sequence = Sequence::new()
            .then(100, OutputLine::plain("one"))
            .then(10_000, OutputLine::plain("two"));

        let task = {
            let scrollback = scrollback.clone();
            let interrupt = interrupt.clone();
            tokio::spawn(async move { play(&sequence, &scrollback, &interrupt).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        interrupt.trigger();
        let outcome = task.await.unwrap();
        assert_eq!(outcome, PlayOutcome::Interrupted { printed: 1 });
        assert_eq!(scrollback.len(), 1);
    }
}
