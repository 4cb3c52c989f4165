//! Pattern search across nodes.
//!
//! Within a node the first match in the search direction wins; across
//! nodes, the first node in traversal order holding any match wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use serde::Deserialize;

use crate::document::{Target, TraversalOrder};
use crate::error::NavigationError;
use crate::model::Node;
use crate::pattern::Pattern;

use super::state::LastSearch;
use super::{NavResult, Session};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// How much of the document a search covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchScope {
    /// The current node only.
    CurrentNode,
    /// From the point to the end of the document.
    Forward,
    /// From the point back to the start of the document.
    Backward,
    /// Every node, wrapping around to end where the search began.
    #[default]
    WholeDocument,
}

/// Session search settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub regex: bool,
    pub case_sensitive: bool,
    pub order: TraversalOrder,
}

/// Lets another thread stop a long search between nodes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Where a search starts within the current node.
#[derive(Debug, Clone, Copy)]
struct Origin {
    offset: usize,
    /// Exclude a match starting exactly at `offset` (repeat searches).
    strict: bool,
}

impl Session {
    /// Search from the point. `Forward` and `Backward` scopes imply their
    /// own direction; the other scopes use `direction`.
    pub fn search(
        &mut self,
        pattern: &str,
        direction: Direction,
        scope: SearchScope,
    ) -> NavResult<Arc<Node>> {
        self.search_cancellable(pattern, direction, scope, &CancelToken::new())
    }

    /// [`Session::search`] that gives up with `Cancelled` once `cancel`
    /// is set. The token is checked before each node is searched.
    pub fn search_cancellable(
        &mut self,
        pattern: &str,
        direction: Direction,
        scope: SearchScope,
        cancel: &CancelToken,
    ) -> NavResult<Arc<Node>> {
        let origin = Origin {
            offset: self.state.point,
            strict: false,
        };
        self.run_search(pattern, direction, scope, origin, cancel)
    }

    /// Repeat the last search with its own direction and scope.
    pub fn repeat_search(&mut self) -> NavResult<Arc<Node>> {
        let last = self
            .state
            .last_search
            .clone()
            .ok_or(NavigationError::NoPriorSearch)?;
        self.repeat(last, None)
    }

    /// Repeat the last search forward.
    pub fn search_next(&mut self) -> NavResult<Arc<Node>> {
        let last = self
            .state
            .last_search
            .clone()
            .ok_or(NavigationError::NoPriorSearch)?;
        self.repeat(last, Some(Direction::Forward))
    }

    /// Repeat the last search backward.
    pub fn search_previous(&mut self) -> NavResult<Arc<Node>> {
        let last = self
            .state
            .last_search
            .clone()
            .ok_or(NavigationError::NoPriorSearch)?;
        self.repeat(last, Some(Direction::Backward))
    }

    /// Flip regex matching; returns the new setting.
    pub fn toggle_regex(&mut self) -> bool {
        self.options.regex = !self.options.regex;
        self.options.regex
    }

    /// Flip case sensitivity; returns the new setting.
    pub fn toggle_case_sensitivity(&mut self) -> bool {
        self.options.case_sensitive = !self.options.case_sensitive;
        self.options.case_sensitive
    }

    pub fn set_search_options(&mut self, options: SearchOptions) {
        self.options = options;
    }

    fn repeat(&mut self, last: LastSearch, direction: Option<Direction>) -> NavResult<Arc<Node>> {
        let direction = direction.unwrap_or(last.direction);
        let scope = match last.scope {
            SearchScope::Forward | SearchScope::Backward => match direction {
                Direction::Forward => SearchScope::Forward,
                Direction::Backward => SearchScope::Backward,
            },
            other => other,
        };

        // Still sitting on the previous match: step past it.
        let origin = if self.state.current == last.node && self.state.point == last.start {
            Origin {
                offset: last.start,
                strict: true,
            }
        } else {
            Origin {
                offset: self.state.point,
                strict: false,
            }
        };
        self.run_search(&last.pattern, direction, scope, origin, &CancelToken::new())
    }

    fn run_search(
        &mut self,
        text: &str,
        direction: Direction,
        scope: SearchScope,
        origin: Origin,
        cancel: &CancelToken,
    ) -> NavResult<Arc<Node>> {
        if text.is_empty() {
            return Err(NavigationError::InvalidPattern("empty search string".into()));
        }
        let pattern = Pattern::new(text, self.options.regex, self.options.case_sensitive)?;
        let direction = match scope {
            SearchScope::Forward => Direction::Forward,
            SearchScope::Backward => Direction::Backward,
            SearchScope::CurrentNode | SearchScope::WholeDocument => direction,
        };

        let (node, start) = self
            .find(&pattern, direction, scope, origin, cancel)?
            .ok_or_else(|| NavigationError::PatternNotFound(text.to_string()))?;

        debug!("search {text:?} matched {:?} at {start}", node.name());
        self.state.last_search = Some(LastSearch {
            pattern: text.to_string(),
            direction,
            scope,
            node: node.name().to_string(),
            start,
        });
        Ok(self.move_to(Target {
            node,
            point: Some(start),
        }))
    }

    fn find(
        &self,
        pattern: &Pattern,
        direction: Direction,
        scope: SearchScope,
        origin: Origin,
        cancel: &CancelToken,
    ) -> NavResult<Option<(Arc<Node>, usize)>> {
        let current = Arc::clone(&self.node);
        let body = current.body();

        let here = match direction {
            Direction::Forward => {
                let from = if origin.strict {
                    origin.offset + 1
                } else {
                    origin.offset
                };
                pattern.find_from(body, from)
            }
            Direction::Backward => pattern.find_before(body, origin.offset),
        };
        if let Some(found) = here {
            return Ok(Some((current, found.start)));
        }
        if scope == SearchScope::CurrentNode {
            return Ok(None);
        }

        let order = self.document.traversal(self.options.order)?;
        let position = order
            .iter()
            .position(|n| *n == self.state.current)
            .ok_or_else(|| NavigationError::NodeNotFound(self.state.current.clone()))?;
        let (before, after) = (&order[..position], &order[position + 1..]);

        let mut names: Vec<&String> = match direction {
            Direction::Forward => after.iter().collect(),
            Direction::Backward => before.iter().rev().collect(),
        };
        if scope == SearchScope::WholeDocument {
            match direction {
                Direction::Forward => names.extend(before.iter()),
                Direction::Backward => names.extend(after.iter().rev()),
            }
        }

        for name in names {
            if cancel.is_cancelled() {
                return Err(NavigationError::Cancelled);
            }
            let node = self.document.node(name)?;
            let found = match direction {
                Direction::Forward => pattern.find_from(node.body(), 0),
                Direction::Backward => pattern.find_before(node.body(), usize::MAX),
            };
            if let Some(found) = found {
                return Ok(Some((node, found.start)));
            }
        }

        // Wrap back into the part of the starting node not yet searched.
        if scope == SearchScope::WholeDocument {
            if cancel.is_cancelled() {
                return Err(NavigationError::Cancelled);
            }
            let wrapped = match direction {
                Direction::Forward => pattern
                    .find_from(body, 0)
                    .filter(|m| m.start < origin.offset),
                Direction::Backward => pattern
                    .find_before(body, usize::MAX)
                    .filter(|m| {
                        m.start > origin.offset || (!origin.strict && m.start == origin.offset)
                    }),
            };
            if let Some(found) = wrapped {
                return Ok(Some((current, found.start)));
            }
        }

        Ok(None)
    }
}
