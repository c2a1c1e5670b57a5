use crossterm::event::KeyCode;

/// Single-choice picker cycling through a fixed list of labels; the
/// terminal stand-in for a dropdown. Screens keep any backing ids in a
/// parallel list and read back [`index`](Self::index).
pub struct SelectState {
    labels: Vec<String>,
    index: usize,
}

impl SelectState {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels, index: 0 }
    }

    /// Replace the options, keeping the selection when it still exists.
    pub fn set_labels(&mut self, labels: Vec<String>) {
        let current = self.current_label().map(str::to_string);
        self.index = current
            .and_then(|label| labels.iter().position(|l| *l == label))
            .unwrap_or(0);
        self.labels = labels;
    }

    pub fn select(&mut self, index: usize) {
        if index < self.labels.len() {
            self.index = index;
        }
    }

    pub fn select_label(&mut self, label: &str) {
        if let Some(index) = self.labels.iter().position(|l| l == label) {
            self.index = index;
        }
    }

    pub fn next(&mut self) {
        if !self.labels.is_empty() {
            self.index = (self.index + 1) % self.labels.len();
        }
    }

    pub fn previous(&mut self) {
        if !self.labels.is_empty() {
            self.index = (self.index + self.labels.len() - 1) % self.labels.len();
        }
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Right | KeyCode::Char(' ') => self.next(),
            KeyCode::Left => self.previous(),
            _ => {}
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn current_label(&self) -> Option<&str> {
        self.labels.get(self.index).map(String::as_str)
    }

    pub fn display(&self) -> String {
        match self.current_label() {
            Some(label) => format!("< {label} >"),
            None => "(none)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_forward_and_backward() {
        let mut state = SelectState::new(vec!["a".into(), "b".into(), "c".into()]);
        state.next();
        assert_eq!(state.current_label(), Some("b"));
        state.previous();
        state.previous();
        assert_eq!(state.current_label(), Some("c"));
    }

    #[test]
    fn replacing_labels_keeps_the_selection_when_possible() {
        let mut state = SelectState::new(vec!["all".into(), "tiling".into()]);
        state.select(1);
        state.set_labels(vec!["all".into(), "painting".into(), "tiling".into()]);
        assert_eq!(state.current_label(), Some("tiling"));
        state.set_labels(vec!["all".into()]);
        assert_eq!(state.current_label(), Some("all"));
    }
}
