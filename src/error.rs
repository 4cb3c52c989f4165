//! Error types for pinfo operations.
//!
//! Errors come in four layers:
//! - [`ParseWarning`]: per-node problems that skip one construct and keep the rest.
//! - [`StructuralError`]: document-level problems; the document stays usable.
//! - [`NavigationError`]: failed movement requests, reported to the user as status.
//! - [`Error`]: everything that can fail an API call outright.

use thiserror::Error;

use crate::model::Relation;

/// Errors that can occur while opening or reading an Info document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unreadable document: {0}")]
    Unreadable(String),

    #[error("Corrupt tag table: {0}")]
    CorruptTagTable(String),

    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable, per-node parse problems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    #[error("node header at byte {offset} has no Node: field")]
    MissingNodeName { offset: u64 },

    #[error("unrecognized section at byte {offset}")]
    UnknownSection { offset: u64 },

    #[error("malformed menu entry in {node:?}: {line:?}")]
    MalformedMenuEntry { node: String, line: String },

    #[error("unterminated cross reference in {node:?} at byte {offset}")]
    MalformedCrossReference { node: String, offset: usize },
}

/// Document-level structural problems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("duplicate node name {0:?}")]
    DuplicateNode(String),

    #[error("tag table lists {expected:?} at byte {offset}, found {found:?}")]
    TagTableMismatch {
        expected: String,
        found: Option<String>,
        offset: u64,
    },

    #[error("subfile {0:?} could not be read")]
    MissingSubfile(String),
}

/// A failed navigation request. Never fatal to the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("No {0} pointer for this node")]
    NoSuchDirection(Relation),

    #[error("No menu item {0:?} in this node")]
    NoSuchMenuEntry(String),

    #[error("No cross reference {0:?} in this node")]
    NoSuchCrossReference(String),

    #[error("Cannot find node {0:?}")]
    NodeNotFound(String),

    #[error("No previously visited node")]
    HistoryEmpty,

    #[error("No more nodes within this document")]
    EndOfDocument,

    #[error("Search failed: {0:?}")]
    PatternNotFound(String),

    #[error("No previous search string")]
    NoPriorSearch,

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),

    #[error("Node ({file}){node} is in another manual")]
    ExternalNode { file: String, node: String },

    #[error("Search cancelled")]
    Cancelled,

    #[error("Cannot load node: {0}")]
    Load(String),
}

impl From<Error> for NavigationError {
    fn from(err: Error) -> Self {
        match err {
            Error::NodeNotFound(name) => NavigationError::NodeNotFound(name),
            Error::Pattern(e) => NavigationError::InvalidPattern(e.to_string()),
            other => NavigationError::Load(other.to_string()),
        }
    }
}

/// Something worth reporting about a document that did not stop it from opening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Warning(ParseWarning),
    Structural(StructuralError),
    /// The tag table could not be used; nodes are found by a full scan.
    Degraded(String),
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::Warning(w) => write!(f, "warning: {w}"),
            Diagnostic::Structural(e) => write!(f, "error: {e}"),
            Diagnostic::Degraded(reason) => write!(f, "index unavailable: {reason}"),
        }
    }
}
