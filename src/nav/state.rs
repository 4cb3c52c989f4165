use serde::Serialize;

use super::search::{Direction, SearchScope};

/// A position worth returning to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Visit {
    pub node: String,
    /// Byte offset into the node body.
    pub point: usize,
}

/// The most recent successful search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastSearch {
    pub pattern: String,
    pub direction: Direction,
    pub scope: SearchScope,
    /// Node and body offset of the match; repeats start past it.
    pub node: String,
    pub start: usize,
}

/// Mutable navigation state of one session.
///
/// `current` changes only when a move succeeds. Every move except `back`
/// pushes the position it leaves onto `history`, unless the move stays
/// on the same node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    pub current: String,
    pub point: usize,
    pub history: Vec<Visit>,
    pub last_search: Option<LastSearch>,
}

impl NavigationState {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            point: 0,
            history: Vec::new(),
            last_search: None,
        }
    }

    /// Move to `node`, remembering where we were.
    pub(crate) fn move_to(&mut self, node: &str, point: usize) {
        if node != self.current {
            self.history.push(Visit {
                node: std::mem::take(&mut self.current),
                point: self.point,
            });
            self.current = node.to_string();
        }
        self.point = point;
    }

    /// Names in history order, oldest first.
    pub fn history_names(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(|v| v.node.as_str())
    }
}
