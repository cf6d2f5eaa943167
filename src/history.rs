/// Append-only command history with an up/down recall cursor.
#[derive(Clone, Debug, Default)]
pub struct CommandHistory {
    entries: Vec<String>,
    cursor: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryDirection {
    Previous,
    Next,
}

impl CommandHistory {
    /// Records a submitted line and parks the cursor past the newest entry.
    pub fn push(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.entries.push(line.to_string());
        self.cursor = self.entries.len();
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor back, floored at the oldest entry.
    pub fn previous(&mut self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        self.cursor = self.cursor.saturating_sub(1);
        self.entries[self.cursor].clone()
    }

    /// Moves the cursor forward; past the newest entry the input is empty.
    pub fn next(&mut self) -> String {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
        self.entries.get(self.cursor).cloned().unwrap_or_default()
    }

    pub fn recall(&mut self, direction: HistoryDirection) -> String {
        match direction {
            HistoryDirection::Previous => self.previous(),
            HistoryDirection::Next => self.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seeded() -> CommandHistory {
        let mut history = CommandHistory::default();
        for line in ["x1", "x2", "x3"] {
            history.push(line);
        }
        history
    }

    #[test]
    fn recall_walks_back_then_forward() {
        let mut history = seeded();
        let recalled = vec![
            history.previous(),
            history.previous(),
            history.previous(),
            history.next(),
        ];
        assert_eq!(recalled, vec!["x3", "x2", "x1", "x2"]);
    }

    #[test]
    fn previous_is_floored_at_the_oldest_entry() {
        let mut history = seeded();
        for _ in 0..10 {
            history.previous();
        }
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.previous(), "x1");
    }

    #[test]
    fn next_past_the_end_yields_empty_input() {
        let mut history = seeded();
        history.previous();
        assert_eq!(history.next(), "");
        assert_eq!(history.next(), "");
        assert_eq!(history.cursor(), 3);
    }

    #[test]
    fn blank_lines_are_not_recorded() {
        let mut history = CommandHistory::default();
        history.push("   ");
        assert!(history.is_empty());
        assert_eq!(history.previous(), "");
    }

    #[test]
    fn pushing_resets_the_cursor() {
        let mut history = seeded();
        history.previous();
        history.previous();
        history.push("x4");
        assert_eq!(history.cursor(), 4);
        assert_eq!(history.previous(), "x4");
    }
}
