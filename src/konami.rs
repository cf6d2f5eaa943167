const SEQUENCE: [&str; 10] = [
    "arrowup",
    "arrowup",
    "arrowdown",
    "arrowdown",
    "arrowleft",
    "arrowright",
    "arrowleft",
    "arrowright",
    "b",
    "a",
];

/// Tracks keydown events until ↑↑↓↓←→←→BA has been typed.
#[derive(Clone, Debug, Default)]
pub struct KonamiTracker {
    progress: usize,
}

impl KonamiTracker {
    /// Feeds one key name (DOM `KeyboardEvent.key` style). Returns true when
    /// the sequence completes; matching then starts over.
    pub fn press(&mut self, key: &str) -> bool {
        let key = key.trim().to_ascii_lowercase();
        if key == SEQUENCE[self.progress] {
            self.progress += 1;
        } else if key == SEQUENCE[0] {
            // ↑↑↑ keeps the last two ups as a valid prefix.
            let all_ups = SEQUENCE[..self.progress].iter().all(|k| *k == SEQUENCE[0]);
            self.progress = if self.progress >= 2 && all_ups { self.progress } else { 1 };
        } else {
            self.progress = 0;
        }
        if self.progress == SEQUENCE.len() {
            self.progress = 0;
            return true;
        }
        false
    }

    pub fn progress(&self) -> usize {
        self.progress
    }
}
