//! Parsed Info nodes.

use once_cell::sync::OnceCell;

use crate::error::ParseWarning;
use crate::info::links::{NodeLinks, extract_links};

use super::links::{CrossReference, MenuEntry, NodeRef, Relation};

/// Fields of a node header line.
///
/// `File: sample.info,  Node: Top,  Next: Intro,  Up: (dir)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeHeader {
    pub file: Option<String>,
    pub name: String,
    pub next: Option<NodeRef>,
    pub prev: Option<NodeRef>,
    pub up: Option<NodeRef>,
}

/// A named unit of documentation text.
///
/// Pointers are names, not ownership: resolving them goes through the
/// document's node store. Menu and cross references are extracted from the
/// body on first access and cached.
#[derive(Debug, Clone)]
pub struct Node {
    header: NodeHeader,
    body: String,
    links: OnceCell<NodeLinks>,
}

impl Node {
    pub fn new(header: NodeHeader, body: String) -> Self {
        Self {
            header,
            body,
            links: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// The `File:` field of the header, if present.
    pub fn file(&self) -> Option<&str> {
        self.header.file.as_deref()
    }

    pub fn header(&self) -> &NodeHeader {
        &self.header
    }

    pub fn next(&self) -> Option<&NodeRef> {
        self.header.next.as_ref()
    }

    pub fn prev(&self) -> Option<&NodeRef> {
        self.header.prev.as_ref()
    }

    pub fn up(&self) -> Option<&NodeRef> {
        self.header.up.as_ref()
    }

    pub fn pointer(&self, relation: Relation) -> Option<&NodeRef> {
        match relation {
            Relation::Next => self.next(),
            Relation::Prev => self.prev(),
            Relation::Up => self.up(),
        }
    }

    /// Node text without the header line and trailing separator.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn menu(&self) -> &[MenuEntry] {
        &self.links().menu
    }

    pub fn xrefs(&self) -> &[CrossReference] {
        &self.links().xrefs
    }

    /// True for nodes carrying the `[index]` marker before their menu.
    pub fn is_index(&self) -> bool {
        self.links().is_index
    }

    /// Problems found while extracting menu and cross references.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.links().warnings
    }

    /// Byte offset of the start of a line (0-based), clamped to the body.
    pub fn offset_of_line(&self, line: usize) -> usize {
        if line == 0 {
            return 0;
        }
        memchr::memchr_iter(b'\n', self.body.as_bytes())
            .nth(line - 1)
            .map(|pos| pos + 1)
            .unwrap_or(self.body.len())
    }

    fn links(&self) -> &NodeLinks {
        self.links
            .get_or_init(|| extract_links(&self.header.name, &self.body))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        // Links are derived from the body.
        self.header == other.header && self.body == other.body
    }
}

impl Eq for Node {}
