//! The node store: every node of a document, loaded or not.
//!
//! Each slot is either `Unloaded` (known by name and offset from the tag
//! table) or `Loaded`. The slot's mutex is held across the load, so
//! concurrent first accesses to one node parse it exactly once while
//! accesses to other nodes proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, StructuralError};
use crate::model::Node;

/// Load state of one node.
#[derive(Debug, Clone)]
pub enum SlotState {
    /// Known from the tag table; `offset` is logical for split documents.
    Unloaded { offset: u64 },
    Loaded(Arc<Node>),
}

#[derive(Debug)]
struct Slot {
    name: String,
    state: Mutex<SlotState>,
}

/// Nodes of one document in file order.
#[derive(Debug, Default)]
pub struct NodeStore {
    slots: Vec<Slot>,
    by_name: HashMap<String, usize>,
    parses: AtomicUsize,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parsed node. Fails on a name collision; the first node keeps
    /// the name.
    pub fn insert(&mut self, node: Node) -> std::result::Result<(), StructuralError> {
        let name = node.name().to_string();
        self.push(name, SlotState::Loaded(Arc::new(node)))
    }

    /// Add a node known only by its tag table offset.
    pub fn insert_unloaded(
        &mut self,
        name: &str,
        offset: u64,
    ) -> std::result::Result<(), StructuralError> {
        self.push(name.to_string(), SlotState::Unloaded { offset })
    }

    fn push(&mut self, name: String, state: SlotState) -> std::result::Result<(), StructuralError> {
        if self.by_name.contains_key(&name) {
            return Err(StructuralError::DuplicateNode(name));
        }
        self.by_name.insert(name.clone(), self.slots.len());
        self.slots.push(Slot {
            name,
            state: Mutex::new(state),
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Node names in file order.
    pub fn all_names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name.clone()).collect()
    }

    /// Position of a node in file order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|s| s.name.as_str())
    }

    /// The stored name matching `name` without regard to case.
    pub fn find_ignore_case(&self, name: &str) -> Option<&str> {
        self.slots
            .iter()
            .map(|s| s.name.as_str())
            .find(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn state(&self, name: &str) -> Option<SlotState> {
        let index = self.position(name)?;
        Some(self.slots[index].state.lock().clone())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        matches!(self.state(name), Some(SlotState::Loaded(_)))
    }

    /// Fetch a node, running `load` with its offset if it is not loaded yet.
    ///
    /// Returns `Ok(None)` for unknown names. A failed load leaves the slot
    /// unloaded.
    pub fn get_or_load<F>(&self, name: &str, load: F) -> Result<Option<Arc<Node>>>
    where
        F: FnOnce(u64) -> Result<Node>,
    {
        let Some(index) = self.position(name) else {
            return Ok(None);
        };

        let mut state = self.slots[index].state.lock();
        match &*state {
            SlotState::Loaded(node) => Ok(Some(Arc::clone(node))),
            SlotState::Unloaded { offset } => {
                let node = Arc::new(load(*offset)?);
                self.parses.fetch_add(1, Ordering::Relaxed);
                *state = SlotState::Loaded(Arc::clone(&node));
                Ok(Some(node))
            }
        }
    }

    /// Number of lazy loads performed.
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::NodeHeader;
    use std::thread;

    fn node(name: &str) -> Node {
        Node::new(
            NodeHeader {
                name: name.into(),
                ..Default::default()
            },
            format!("body of {name}\n"),
        )
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut store = NodeStore::new();
        store.insert(node("Top")).unwrap();
        store.insert_unloaded("Intro", 120).unwrap();
        store.insert(node("Usage")).unwrap();
        assert_eq!(store.all_names(), ["Top", "Intro", "Usage"]);
        assert_eq!(store.position("Usage"), Some(2));
        assert_eq!(store.name_at(1), Some("Intro"));
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut store = NodeStore::new();
        store.insert(node("Top")).unwrap();
        assert_eq!(
            store.insert(node("Top")),
            Err(StructuralError::DuplicateNode("Top".into()))
        );
        assert_eq!(
            store.insert_unloaded("Top", 5),
            Err(StructuralError::DuplicateNode("Top".into()))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_or_load_loads_once() {
        let mut store = NodeStore::new();
        store.insert_unloaded("Intro", 42).unwrap();
        assert!(!store.is_loaded("Intro"));

        let first = store
            .get_or_load("Intro", |offset| {
                assert_eq!(offset, 42);
                Ok(node("Intro"))
            })
            .unwrap()
            .unwrap();
        let second = store
            .get_or_load("Intro", |_| panic!("loaded twice"))
            .unwrap()
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(store.is_loaded("Intro"));
        assert_eq!(store.parse_count(), 1);
    }

    #[test]
    fn test_failed_load_stays_unloaded() {
        let mut store = NodeStore::new();
        store.insert_unloaded("Intro", 7).unwrap();
        let err = store
            .get_or_load("Intro", |_| Err(Error::NodeNotFound("Intro".into())))
            .unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(_)));
        assert!(matches!(
            store.state("Intro"),
            Some(SlotState::Unloaded { offset: 7 })
        ));
    }

    #[test]
    fn test_unknown_name() {
        let store = NodeStore::new();
        assert!(store.get_or_load("Nope", |_| Ok(node("Nope"))).unwrap().is_none());
    }

    #[test]
    fn test_find_ignore_case() {
        let mut store = NodeStore::new();
        store.insert(node("Invoking Make")).unwrap();
        assert_eq!(store.find_ignore_case("invoking make"), Some("Invoking Make"));
        assert_eq!(store.find_ignore_case("invoking"), None);
    }

    #[test]
    fn test_concurrent_first_access_parses_once() {
        let mut store = NodeStore::new();
        store.insert_unloaded("Shared", 0).unwrap();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .get_or_load("Shared", |_| {
                            thread::sleep(std::time::Duration::from_millis(5));
                            Ok(node("Shared"))
                        })
                        .unwrap()
                        .unwrap()
                })
            })
            .collect();

        let nodes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(store.parse_count(), 1);
        assert!(nodes.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
