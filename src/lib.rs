//! # pinfo
//!
//! A reader and navigation engine for GNU Info documentation.
//!
//! ## Features
//!
//! - Single-file and split (indirect) documents, gzip or otherwise compressed
//! - Lazy node loading through the tag table, with a full-scan fallback when
//!   the table is missing or wrong
//! - Menus, cross references, index entries, and anchors
//! - A navigation [`Session`] with history, pattern search, and index lookup
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pinfo::{Direction, Document, SearchScope, Session};
//!
//! let doc = Arc::new(Document::open("/usr/share/info/make.info.gz").unwrap());
//! let mut session = Session::new(doc).unwrap();
//!
//! session.select_menu_item("Overview").unwrap();
//! session.go_next().unwrap();
//! session
//!     .search("makefile", Direction::Forward, SearchScope::WholeDocument)
//!     .unwrap();
//! println!("{}", session.current_node().body());
//! session.back().unwrap();
//! ```
//!
//! Navigation failures are [`NavigationError`]s: they leave the session as
//! it was and are meant to be shown to the user as a status message.

pub mod config;
pub mod document;
pub mod error;
pub mod info;
pub mod infopath;
pub mod io;
pub mod model;
pub mod nav;
pub mod pattern;
pub mod store;
pub(crate) mod util;

pub use config::Config;
pub use document::{Document, Target, TraversalOrder};
pub use error::{Diagnostic, Error, NavigationError, ParseWarning, Result, StructuralError};
pub use model::{CrossReference, MenuEntry, Node, NodeHeader, NodeRef, Relation};
pub use nav::{
    CancelToken, Direction, IndexMatch, MenuItem, NavigationState, SearchOptions, SearchScope,
    Session,
};
pub use pattern::Pattern;
