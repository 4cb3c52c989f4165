//! Navigation engine.
//!
//! A [`Session`] walks one [`Document`]: it holds the current node, the
//! history stack, and search state. Every operation either succeeds and
//! returns the new current node, or fails with a [`NavigationError`] and
//! leaves the session untouched.
//!
//! - Movement: `go_next`, `go_prev`, `go_up`, `select_menu_item`,
//!   `follow_xref`, `goto_node`, `back`, plus document-order movement
//! - [`search`]: pattern search over one node or the whole document
//! - [`index`]: index lookups

mod index;
mod search;
mod state;

use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::config::Config;
use crate::document::{Document, Target};
use crate::error::{Error, NavigationError};
use crate::model::{MenuEntry, Node, NodeRef, Relation};

pub use index::IndexMatch;
pub use search::{CancelToken, Direction, SearchOptions, SearchScope};
pub use state::{LastSearch, NavigationState, Visit};

/// Result of a navigation operation.
pub type NavResult<T> = std::result::Result<T, NavigationError>;

/// Menu entry selector: position (0-based) or label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Index(usize),
    Label(String),
}

impl From<usize> for MenuItem {
    fn from(index: usize) -> Self {
        MenuItem::Index(index)
    }
}

impl From<&str> for MenuItem {
    fn from(label: &str) -> Self {
        MenuItem::Label(label.to_string())
    }
}

impl From<String> for MenuItem {
    fn from(label: String) -> Self {
        MenuItem::Label(label)
    }
}

/// A navigation session over one document.
pub struct Session {
    document: Arc<Document>,
    state: NavigationState,
    node: Arc<Node>,
    options: SearchOptions,
    index: Option<index::IndexCursor>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("document", &self.document.file_name())
            .field("state", &self.state)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start at the document's top node.
    pub fn new(document: Arc<Document>) -> crate::Result<Session> {
        Self::with_options(document, SearchOptions::default())
    }

    pub fn with_options(document: Arc<Document>, options: SearchOptions) -> crate::Result<Session> {
        let top = document
            .top_name()
            .ok_or_else(|| Error::Unreadable("document has no nodes".into()))?;
        let node = document.node(&top)?;
        Ok(Session {
            state: NavigationState::new(node.name()),
            document,
            node,
            options,
            index: None,
        })
    }

    /// Open a file and start a session with search defaults from `config`.
    pub fn open(path: impl AsRef<Path>, config: &Config) -> crate::Result<Session> {
        let document = Arc::new(Document::open(path)?);
        Self::with_options(document, config.search_options())
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn current_node(&self) -> &Arc<Node> {
        &self.node
    }

    /// Byte offset into the current node's body.
    pub fn point(&self) -> usize {
        self.state.point
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn go_next(&mut self) -> NavResult<Arc<Node>> {
        self.follow_pointer(Relation::Next)
    }

    pub fn go_prev(&mut self) -> NavResult<Arc<Node>> {
        self.follow_pointer(Relation::Prev)
    }

    pub fn go_up(&mut self) -> NavResult<Arc<Node>> {
        self.follow_pointer(Relation::Up)
    }

    fn follow_pointer(&mut self, relation: Relation) -> NavResult<Arc<Node>> {
        let target = self
            .node
            .pointer(relation)
            .cloned()
            .ok_or(NavigationError::NoSuchDirection(relation))?;
        self.goto_ref(&target)
    }

    /// Follow a menu entry chosen by position or label.
    ///
    /// Labels match exactly first, then without regard to case, then as a
    /// case-insensitive prefix.
    pub fn select_menu_item(&mut self, item: impl Into<MenuItem>) -> NavResult<Arc<Node>> {
        let item = item.into();
        let entry = {
            let menu = self.node.menu();
            let found = match &item {
                MenuItem::Index(i) => menu.get(*i),
                MenuItem::Label(label) => find_menu_entry(menu, label),
            };
            found.cloned()
        };
        let entry = entry.ok_or_else(|| {
            NavigationError::NoSuchMenuEntry(match item {
                MenuItem::Index(i) => i.to_string(),
                MenuItem::Label(label) => label,
            })
        })?;
        self.goto_ref(&entry.target)
    }

    /// Follow a cross reference matched by label or target name.
    pub fn follow_xref(&mut self, label_or_target: &str) -> NavResult<Arc<Node>> {
        let wanted = crate::model::normalize_name(label_or_target);
        let xrefs = self.node.xrefs();
        let found = xrefs
            .iter()
            .find(|x| x.display_label() == wanted || x.target_node() == wanted)
            .or_else(|| {
                xrefs.iter().find(|x| {
                    x.display_label().eq_ignore_ascii_case(&wanted)
                        || x.target_node().eq_ignore_ascii_case(&wanted)
                })
            })
            .map(|x| x.target.clone())
            .ok_or(NavigationError::NoSuchCrossReference(wanted))?;
        self.goto_ref(&found)
    }

    /// Jump to a node or anchor by name. `(file)node` names another manual.
    pub fn goto_node(&mut self, name: &str) -> NavResult<Arc<Node>> {
        let target = NodeRef::parse(name);
        self.goto_ref(&target)
    }

    /// Return to the previous position in history.
    pub fn back(&mut self) -> NavResult<Arc<Node>> {
        let visit = self
            .state
            .history
            .last()
            .cloned()
            .ok_or(NavigationError::HistoryEmpty)?;
        let node = self.document.node(&visit.node)?;

        self.state.history.pop();
        self.state.current = visit.node;
        self.state.point = visit.point.min(node.body().len());
        self.node = Arc::clone(&node);
        Ok(node)
    }

    /// First node in file order.
    pub fn go_first(&mut self) -> NavResult<Arc<Node>> {
        let names = self.document.all_names();
        let first = names.first().ok_or(NavigationError::EndOfDocument)?;
        self.goto_local(first)
    }

    /// Last node in file order.
    pub fn go_last(&mut self) -> NavResult<Arc<Node>> {
        let names = self.document.all_names();
        let last = names.last().ok_or(NavigationError::EndOfDocument)?;
        self.goto_local(last)
    }

    /// The `Top` node, or the first node when there is none.
    pub fn go_top(&mut self) -> NavResult<Arc<Node>> {
        let top = self.document.top_name().ok_or(NavigationError::EndOfDocument)?;
        self.goto_local(&top)
    }

    /// Next node in file order, regardless of pointers.
    pub fn go_forward_global(&mut self) -> NavResult<Arc<Node>> {
        self.step_global(1)
    }

    /// Previous node in file order, regardless of pointers.
    pub fn go_backward_global(&mut self) -> NavResult<Arc<Node>> {
        self.step_global(-1)
    }

    fn step_global(&mut self, delta: isize) -> NavResult<Arc<Node>> {
        let names = self.document.all_names();
        let position = names
            .iter()
            .position(|n| *n == self.state.current)
            .ok_or_else(|| NavigationError::NodeNotFound(self.state.current.clone()))?;
        let name = position
            .checked_add_signed(delta)
            .and_then(|p| names.get(p))
            .ok_or(NavigationError::EndOfDocument)?
            .clone();
        self.goto_local(&name)
    }

    /// Nodes visited so far, oldest first, ending with the current node.
    pub fn visited(&self) -> Vec<String> {
        self.state
            .history_names()
            .map(str::to_string)
            .chain(std::iter::once(self.state.current.clone()))
            .collect()
    }

    /// End the session. Dropping it has the same effect.
    pub fn close(self) {
        debug!("closing session on {}", self.document.file_name());
    }

    fn goto_ref(&mut self, target: &NodeRef) -> NavResult<Arc<Node>> {
        if target.is_external_to(Some(self.document.file_name())) {
            return Err(NavigationError::ExternalNode {
                file: target.file.clone().unwrap_or_default(),
                node: target.node.clone(),
            });
        }
        self.goto_local(&target.node)
    }

    fn goto_local(&mut self, name: &str) -> NavResult<Arc<Node>> {
        let target = self.document.resolve(name)?;
        Ok(self.move_to(target))
    }

    fn move_to(&mut self, target: Target) -> Arc<Node> {
        let point = target.point.unwrap_or(0);
        debug!("moving to {:?} at {point}", target.node.name());
        self.state.move_to(target.node.name(), point);
        self.node = Arc::clone(&target.node);
        target.node
    }
}

fn find_menu_entry<'a>(menu: &'a [MenuEntry], label: &str) -> Option<&'a MenuEntry> {
    let label = crate::model::normalize_name(label);
    menu.iter()
        .find(|e| e.label == label)
        .or_else(|| menu.iter().find(|e| e.label.eq_ignore_ascii_case(&label)))
        .or_else(|| {
            let lower = label.to_lowercase();
            menu.iter()
                .find(|e| e.label.to_lowercase().starts_with(&lower))
        })
}
