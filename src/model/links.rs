//! Link representation for Info documents.
//!
//! Info addresses everything by node name:
//! - **Header pointers**: `Next:`, `Prev:`, `Up:` fields of a node header
//! - **Menus**: `* label: target.` / `* target::` lines after `* Menu:`
//! - **Cross references**: inline `*Note label: target.` / `*Note target::`
//!
//! Any of these may name a node in another manual with the `(file)node`
//! syntax. Links are plain names resolved on demand through the node store,
//! so a broken link is only an error when someone follows it.

use std::fmt;

use serde::Serialize;

/// The three header pointers of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Relation {
    Next,
    Prev,
    Up,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Relation::Next => "Next",
            Relation::Prev => "Prev",
            Relation::Up => "Up",
        };
        f.write_str(name)
    }
}

/// A reference to a node, possibly in another manual.
///
/// `(emacs)Dired` parses to `file: Some("emacs"), node: "Dired"`; a bare
/// `(emacs)` names the `Top` node of that manual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NodeRef {
    pub file: Option<String>,
    pub node: String,
}

impl NodeRef {
    /// A reference to a node of the same document.
    pub fn local(node: impl Into<String>) -> Self {
        Self {
            file: None,
            node: node.into(),
        }
    }

    /// Parse a raw reference as it appears in a header, menu, or xref.
    ///
    /// Handles `(file)node`, DEL-quoted names, and names broken across
    /// lines (runs of whitespace collapse to one space).
    pub fn parse(raw: &str) -> NodeRef {
        let raw = strip_quotes(raw.trim());

        if let Some(rest) = raw.strip_prefix('(')
            && let Some(close) = rest.find(')')
        {
            let file = normalize_name(&rest[..close]);
            let node = normalize_name(strip_quotes(&rest[close + 1..]));
            return NodeRef {
                file: (!file.is_empty()).then_some(file),
                node: if node.is_empty() { "Top".to_string() } else { node },
            };
        }

        NodeRef::local(normalize_name(raw))
    }

    /// True for the `(dir)` pseudo-reference used as "no parent".
    pub fn is_dir(&self) -> bool {
        self.file
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("dir"))
            && self.node == "Top"
    }

    /// True if this reference leaves the document named `document_file`.
    ///
    /// File names compare without directory, `.info` suffix, or compression
    /// suffix, so `(sample)Intro` stays inside `sample.info.gz`.
    pub fn is_external_to(&self, document_file: Option<&str>) -> bool {
        match (&self.file, document_file) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(target), Some(current)) => manual_stem(target) != manual_stem(current),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "({}){}", file, self.node),
            None => f.write_str(&self.node),
        }
    }
}

/// One entry of a node's menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    /// Text shown before the colon; equals the target for `* target::` entries.
    pub label: String,
    pub target: NodeRef,
    /// Line within the target node, given by index entries as `(line N)`.
    pub line: Option<u32>,
}

impl MenuEntry {
    pub fn target_node(&self) -> &str {
        &self.target.node
    }
}

/// An inline `*Note` cross reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossReference {
    pub target: NodeRef,
    /// Present for the `*Note label: target.` form.
    pub label: Option<String>,
    /// Byte offset of the `*Note` token within the node body.
    pub offset: usize,
}

impl CrossReference {
    pub fn target_node(&self) -> &str {
        &self.target.node
    }

    /// The text a reader sees for this reference.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.target.node)
    }
}

/// Remove a surrounding pair of DEL quotes (Texinfo 5 quoting).
fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('\x7f')
        .and_then(|s| s.strip_suffix('\x7f'))
        .unwrap_or(s)
}

/// Collapse internal whitespace runs (including newlines) to single spaces.
pub(crate) fn normalize_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Reduce a manual file name to the part other manuals use to refer to it.
fn manual_stem(name: &str) -> &str {
    let base = name.rsplit('/').next().unwrap_or(name);
    let base = crate::io::strip_compression_suffix(base);
    base.strip_suffix(".info").unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_local_ref() {
        let r = NodeRef::parse("Invoking sample");
        assert_eq!(r.file, None);
        assert_eq!(r.node, "Invoking sample");
    }

    #[test]
    fn test_parse_file_ref() {
        let r = NodeRef::parse("(emacs)Emerge");
        assert_eq!(r.file.as_deref(), Some("emacs"));
        assert_eq!(r.node, "Emerge");
        assert_eq!(r.to_string(), "(emacs)Emerge");
    }

    #[test]
    fn test_parse_file_only_ref_means_top() {
        let r = NodeRef::parse("(dir)");
        assert_eq!(r.node, "Top");
        assert!(r.is_dir());
    }

    #[test]
    fn test_parse_multiline_name() {
        let r = NodeRef::parse("Sample\n\tdiff3 input");
        assert_eq!(r.node, "Sample diff3 input");
    }

    #[test]
    fn test_parse_quoted_name() {
        let r = NodeRef::parse("\x7fFoo: bar, baz\x7f");
        assert_eq!(r.node, "Foo: bar, baz");
    }

    #[test]
    fn test_external_comparison_ignores_suffixes() {
        let r = NodeRef::parse("(sample)Intro");
        assert!(!r.is_external_to(Some("sample.info")));
        assert!(!r.is_external_to(Some("/usr/share/info/sample.info.gz")));
        assert!(r.is_external_to(Some("other.info")));
        assert!(!NodeRef::local("Intro").is_external_to(Some("other.info")));
    }

    #[test]
    fn test_relation_display() {
        assert_eq!(Relation::Up.to_string(), "Up");
    }

    proptest! {
        #[test]
        fn prop_parse_display_roundtrip(
            file in proptest::option::of("[a-z][a-z0-9-]{0,8}"),
            node in "[A-Za-z][A-Za-z0-9]{0,6}( [A-Za-z0-9]{1,6}){0,3}"
        ) {
            let r = NodeRef { file, node };
            prop_assert_eq!(NodeRef::parse(&r.to_string()), r);
        }

        #[test]
        fn prop_normalize_name_has_no_runs(s in "[a-z \t\n]{0,30}") {
            let n = normalize_name(&s);
            prop_assert!(!n.contains("  "));
            prop_assert!(!n.contains('\n'));
            prop_assert_eq!(n.trim(), n.as_str());
        }
    }
}
