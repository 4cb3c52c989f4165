//! Info format parsing.
//!
//! An Info file is plain text divided by separator lines (a `^_` byte,
//! optionally followed by `^L`). Each segment after a separator is either a
//! node (header line beginning with `File:` or containing `Node:`) or one of
//! the bookkeeping sections written by the Texinfo compiler:
//!
//! ```text
//! ^_
//! File: sample.info,  Node: Top,  Next: Intro,  Up: (dir)
//! ...node body...
//! ^_
//! Tag Table:
//! Node: Top^?801
//! ^_
//! End Tag Table
//! ```
//!
//! - [`lexer`]: separator scanning and header parsing
//! - [`tag_table`]: tag table and indirect (split file) table
//! - [`links`]: menu, index, and cross reference extraction

pub mod lexer;
pub mod links;
pub mod tag_table;

/// Separator byte that opens every segment (`^_`).
pub const SEPARATOR: u8 = 0x1f;

/// Optional form feed after the separator (`^L`).
pub const FORM_FEED: u8 = 0x0c;

/// Delimiter between a tag table name and its offset, also used to quote
/// node names containing punctuation (`^?`).
pub const DEL: u8 = 0x7f;

/// Marker placed before the menu of index nodes.
pub const INDEX_MARKER: &str = "\0\x08[index\0\x08]";
