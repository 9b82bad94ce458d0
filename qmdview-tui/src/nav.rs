//! Navigation and view switching utilities.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    Search,
    History,
    Collections,
    Status,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Search => "Search",
            View::History => "History",
            View::Collections => "Collections",
            View::Status => "Status",
        }
    }

    pub fn all() -> &'static [View] {
        &[View::Search, View::History, View::Collections, View::Status]
    }

    pub fn index(&self) -> usize {
        Self::all().iter().position(|v| v == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<View> {
        Self::all().get(index).copied()
    }

    pub fn next(&self) -> View {
        let all = Self::all();
        all[(self.index() + 1) % all.len()]
    }

    pub fn previous(&self) -> View {
        let all = Self::all();
        all[(self.index() + all.len() - 1) % all.len()]
    }
}
