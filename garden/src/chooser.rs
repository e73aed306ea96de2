//! Filtered recording picker opened by typing on the grid.

use crate::library::{LibraryEntry, LibraryStore};
use garden_core::RecordingId;

/// Open chooser state: the typed query and the highlighted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chooser {
    query: String,
    selected: usize,
}

impl Chooser {
    /// Opens with the character that triggered it.
    pub fn open(seed: char) -> Self {
        Self {
            query: seed.to_string(),
            selected: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn push(&mut self, c: char) {
        self.query.push(c);
        self.selected = 0;
    }

    pub fn erase(&mut self) {
        self.query.pop();
        self.selected = 0;
    }

    /// Entries whose name contains the query, ignoring case, sorted by name.
    pub fn matches<'a>(&self, library: &'a LibraryStore) -> Vec<&'a LibraryEntry> {
        let needle = self.query.to_lowercase();
        let mut found: Vec<&LibraryEntry> = library
            .entries()
            .iter()
            .filter(|entry| entry.meta.name.to_lowercase().contains(&needle))
            .collect();
        found.sort_by(|a, b| {
            a.meta
                .name
                .to_lowercase()
                .cmp(&b.meta.name.to_lowercase())
                .then_with(|| a.meta.name.cmp(&b.meta.name))
        });
        found
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self, library: &LibraryStore) {
        let count = self.matches(library).len();
        if self.selected + 1 < count {
            self.selected += 1;
        }
    }

    /// Keeps the highlight on a valid row after the library shrank.
    pub fn clamp(&mut self, library: &LibraryStore) {
        let count = self.matches(library).len();
        self.selected = self.selected.min(count.saturating_sub(1));
    }

    /// The highlighted recording, if any entry matches.
    pub fn selection(&self, library: &LibraryStore) -> Option<RecordingId> {
        self.matches(library)
            .get(self.selected)
            .map(|entry| entry.meta.id)
    }
}
