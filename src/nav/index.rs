//! Index lookups.
//!
//! Index nodes list topics as menu entries, usually with the line of the
//! target node where the topic is discussed:
//!
//! ```text
//! * Menu:
//!
//! * pebibyte, definition of:     cmp Options.         (line 97)
//! ```

use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::error::NavigationError;
use crate::model::{Node, NodeRef};

use super::{NavResult, Session};

/// One index entry matching a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexMatch {
    pub topic: String,
    /// Index node listing the entry.
    pub index_node: String,
    pub target: NodeRef,
    pub line: Option<u32>,
}

#[derive(Debug, Clone)]
pub(super) struct IndexCursor {
    topic: String,
    matches: Vec<IndexMatch>,
    next: usize,
}

impl Session {
    /// Every entry of every index node, in document order.
    pub fn index_entries(&self) -> NavResult<Vec<IndexMatch>> {
        let mut entries = Vec::new();
        for node in self.document.load_all()? {
            if !node.is_index() {
                continue;
            }
            entries.extend(node.menu().iter().map(|entry| IndexMatch {
                topic: entry.label.clone(),
                index_node: node.name().to_string(),
                target: entry.target.clone(),
                line: entry.line,
            }));
        }
        Ok(entries)
    }

    /// Look `topic` up in the indices and go to the best match.
    ///
    /// Matching is case-insensitive. Exact matches come first, then
    /// prefix matches, then other substring matches; later matches are
    /// reached with [`Session::next_index_match`].
    pub fn index_search(&mut self, topic: &str) -> NavResult<Arc<Node>> {
        let wanted = topic.trim().to_lowercase();
        let mut matches: Vec<(u8, IndexMatch)> = self
            .index_entries()?
            .into_iter()
            .filter_map(|m| {
                let label = m.topic.to_lowercase();
                let rank = if label == wanted {
                    0
                } else if label.starts_with(&wanted) {
                    1
                } else if label.contains(&wanted) {
                    2
                } else {
                    return None;
                };
                Some((rank, m))
            })
            .collect();
        matches.sort_by_key(|(rank, _)| *rank);
        let matches: Vec<IndexMatch> = matches.into_iter().map(|(_, m)| m).collect();

        let first = matches
            .first()
            .cloned()
            .ok_or_else(|| NavigationError::PatternNotFound(topic.to_string()))?;
        debug!("index lookup {topic:?}: {} matches", matches.len());

        let node = self.visit_index_match(&first)?;
        self.index = Some(IndexCursor {
            topic: topic.to_string(),
            matches,
            next: 1,
        });
        Ok(node)
    }

    /// Go to the next match of the last index lookup.
    pub fn next_index_match(&mut self) -> NavResult<Arc<Node>> {
        let cursor = self.index.as_ref().ok_or(NavigationError::NoPriorSearch)?;
        let next = cursor
            .matches
            .get(cursor.next)
            .cloned()
            .ok_or_else(|| NavigationError::PatternNotFound(cursor.topic.clone()))?;

        let node = self.visit_index_match(&next)?;
        if let Some(cursor) = self.index.as_mut() {
            cursor.next += 1;
        }
        Ok(node)
    }

    /// Matches of the last index lookup.
    pub fn index_matches(&self) -> &[IndexMatch] {
        self.index
            .as_ref()
            .map(|c| c.matches.as_slice())
            .unwrap_or_default()
    }

    fn visit_index_match(&mut self, entry: &IndexMatch) -> NavResult<Arc<Node>> {
        let node = self.goto_ref(&entry.target)?;
        if let Some(line) = entry.line {
            self.state.point = node.offset_of_line(body_line(line));
        }
        Ok(node)
    }
}

/// Index line numbers count the header as line 1; the body starts on
/// line 2.
fn body_line(line: u32) -> usize {
    (line as usize).saturating_sub(2)
}
