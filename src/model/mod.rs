//! Core data model for Info documents.
//!
//! This module contains:
//! - Node representation (header pointers, body, lazily extracted links)
//! - Link types: node references, menu entries, cross references

mod links;
mod node;

pub(crate) use links::normalize_name;
pub use links::{CrossReference, MenuEntry, NodeRef, Relation};
pub use node::{Node, NodeHeader};
