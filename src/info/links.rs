//! Menu, index, and cross reference extraction.
//!
//! Extraction is a scan-and-skip pass, not a strict grammar: lines that do
//! not look like entries are prose and stay inert. Real Info files mix
//! explanatory text into menus and index pages, so nothing here fails a
//! node; a construct that starts like a link but cannot be completed is
//! skipped and recorded as a [`ParseWarning`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseWarning;
use crate::model::{CrossReference, MenuEntry, NodeRef, normalize_name};

use super::{DEL, INDEX_MARKER};

static MENU_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\* Menu:").expect("valid menu marker regex"));

static XREF_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\*note\s+").expect("valid cross reference regex"));

static INDEX_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(line\s+(\d+)\)").expect("valid index line regex"));

/// Everything extracted from one node body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeLinks {
    pub menu: Vec<MenuEntry>,
    pub xrefs: Vec<CrossReference>,
    pub is_index: bool,
    pub warnings: Vec<ParseWarning>,
}

/// Extract the menu and cross references of a node body.
///
/// Deterministic: the same body always yields the same lists in the same
/// order.
pub fn extract_links(node: &str, body: &str) -> NodeLinks {
    let mut links = NodeLinks {
        is_index: body.contains(INDEX_MARKER),
        ..Default::default()
    };

    if let Some(marker) = MENU_MARKER.find(body) {
        let menu_start = body[marker.end()..]
            .find('\n')
            .map_or(body.len(), |nl| marker.end() + nl + 1);
        extract_menu(node, &body[menu_start..], links.is_index, &mut links);
    }

    extract_xrefs(node, body, &mut links);
    links
}

fn extract_menu(node: &str, menu: &str, is_index: bool, links: &mut NodeLinks) {
    for block in entry_blocks(menu) {
        match parse_menu_entry(block, is_index) {
            Some(entry) => links.menu.push(entry),
            None => links.warnings.push(ParseWarning::MalformedMenuEntry {
                node: node.to_string(),
                line: block.lines().next().unwrap_or_default().to_string(),
            }),
        }
    }
}

/// Group menu text into entry blocks: a `* ` line plus its indented
/// continuation lines. Any other line is prose and ends the block.
fn entry_blocks(menu: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    let mut pos = 0;

    for line in menu.split_inclusive('\n') {
        let start = pos;
        pos += line.len();

        if line.starts_with("* ") {
            if let Some((s, e)) = current.take() {
                blocks.push(&menu[s..e]);
            }
            current = Some((start, pos));
        } else if line.starts_with([' ', '\t']) && !line.trim().is_empty() {
            if let Some((_, e)) = current.as_mut() {
                *e = pos;
            }
        } else if let Some((s, e)) = current.take() {
            blocks.push(&menu[s..e]);
        }
    }
    if let Some((s, e)) = current {
        blocks.push(&menu[s..e]);
    }
    blocks
}

/// Parse `* label: target.` or `* target::`, plus `(line N)` for index entries.
pub fn parse_menu_entry(block: &str, is_index: bool) -> Option<MenuEntry> {
    let text = block.strip_prefix("* ")?;
    let (label, after) = split_label(text)?;
    let label = normalize_name(label);

    let (target, rest) = if let Some(rest) = after.strip_prefix(':') {
        (NodeRef::parse(&label), rest)
    } else {
        let after = after.trim_start_matches([' ', '\t', '\n']);
        let (raw, _) = read_target(after, false);
        let target = NodeRef::parse(raw);
        (target, &after[raw.len()..])
    };
    if target.node.is_empty() || label.is_empty() {
        return None;
    }

    let line = if is_index {
        INDEX_LINE
            .captures(rest)
            .and_then(|c| c[1].parse().ok())
    } else {
        None
    };

    Some(MenuEntry {
        label,
        target,
        line,
    })
}

fn extract_xrefs(node: &str, body: &str, links: &mut NodeLinks) {
    let starts: Vec<_> = XREF_START.find_iter(body).collect();

    for (i, m) in starts.iter().enumerate() {
        let limit = starts.get(i + 1).map_or(body.len(), |next| next.start());
        let region = &body[m.end()..limit];
        let region = region.find("\n\n").map_or(region, |blank| &region[..blank]);

        match parse_xref(region) {
            Some((target, label)) => links.xrefs.push(CrossReference {
                target,
                label,
                offset: m.start(),
            }),
            None => links.warnings.push(ParseWarning::MalformedCrossReference {
                node: node.to_string(),
                offset: m.start(),
            }),
        }
    }
}

/// Parse the text after `*Note`: `target::` or `label: target` ended by
/// `.` or `,`. Names may wrap across lines.
fn parse_xref(text: &str) -> Option<(NodeRef, Option<String>)> {
    let (label, after) = split_label(text)?;
    let label = normalize_name(label);
    if label.is_empty() {
        return None;
    }

    if after.starts_with(':') {
        return Some((NodeRef::parse(&label), None));
    }

    let after = after.trim_start();
    let (raw, terminated) = read_target(after, true);
    let target = NodeRef::parse(raw);
    if !terminated || target.node.is_empty() {
        return None;
    }
    Some((target, Some(label)))
}

/// Split at the colon that ends a label.
///
/// The colon must be followed by whitespace, another colon, or the end of
/// text, so labels like `C-x C-f` or `a:b` survive. A DEL-quoted label runs
/// to its closing quote.
fn split_label(text: &str) -> Option<(&str, &str)> {
    if let Some(quoted) = text.strip_prefix(DEL as char) {
        let close = quoted.find(DEL as char)?;
        let after = quoted[close + 1..].strip_prefix(':')?;
        return Some((&quoted[..close], after));
    }

    let bytes = text.as_bytes();
    let colon = bytes.iter().enumerate().position(|(i, &b)| {
        b == b':' && matches!(bytes.get(i + 1), None | Some(b' ' | b'\t' | b'\n' | b':'))
    })?;
    Some((&text[..colon], &text[colon + 1..]))
}

/// Read a target node name; returns the raw text and whether an explicit
/// terminator (`.`, `,`, tab, or newline for menus) ended it.
fn read_target(s: &str, wrap: bool) -> (&str, bool) {
    let bytes = s.as_bytes();
    let mut i = 0;

    if bytes.first() == Some(&b'(')
        && let Some(close) = s.find(')')
    {
        i = close + 1;
    }
    if bytes.get(i) == Some(&DEL)
        && let Some(close) = s[i + 1..].find(DEL as char)
    {
        let end = i + close + 2;
        return (&s[..end], true);
    }

    while i < bytes.len() {
        match bytes[i] {
            b',' | b'\t' => return (&s[..i], true),
            b'\n' if !wrap => return (&s[..i], true),
            b'.' if matches!(
                bytes.get(i + 1),
                None | Some(b' ' | b'\n' | b'\t' | b')' | b'\'' | b'"')
            ) =>
            {
                return (&s[..i], true);
            }
            _ => {}
        }
        i += 1;
    }
    (s, !wrap)
}
